use super::{
    create_default_allocator, AddressSpace, DepthMode, Device, DeviceConfig, DeviceInner,
    OriginMode,
};
use crate::errors::{DriverError, DriverResult};
use crate::limits::{align_up_u64, GpuAddr, GPU_ADDR_INVALID, MEMBLOCK_ALIGNMENT};

use ::std::{
    alloc::Layout,
    ptr::NonNull,
    sync::{Arc, Mutex},
};

/// First address handed out by the GPU virtual address space. The low
/// region is left unmapped so that small bogus addresses fault instead of
/// aliasing a live allocation.
const GPU_VA_BASE: GpuAddr = 0x0400_0000;

/// One past the highest usable GPU virtual address (40-bit space).
const GPU_VA_END: GpuAddr = 1 << 40;

impl DeviceConfig {
    /// Configuration with the platform-heap allocator, the fatal error
    /// handler, depth range [0, 1], and upper-left origin.
    pub fn new() -> Self {
        Self {
            allocator: create_default_allocator(),
            error_callback: None,
            depth_mode: DepthMode::ZeroToOne,
            origin_mode: OriginMode::UpperLeft,
        }
    }
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl Device {
    /// Create the process-wide GPU context.
    pub fn new(config: DeviceConfig) -> Self {
        log::debug!(
            "create device: depth={:?} origin={:?}",
            config.depth_mode,
            config.origin_mode
        );
        Self {
            inner: Arc::new(DeviceInner {
                allocator: config.allocator,
                error_callback: config.error_callback,
                depth_mode: config.depth_mode,
                origin_mode: config.origin_mode,
                address_space: Mutex::new(AddressSpace { next: GPU_VA_BASE }),
            }),
        }
    }

    /// The clip-space depth range convention this device was created with.
    pub fn depth_mode(&self) -> DepthMode {
        self.inner.depth_mode
    }

    /// The window-space origin convention this device was created with.
    pub fn origin_mode(&self) -> OriginMode {
        self.inner.origin_mode
    }

    /// Report an unrecoverable misuse condition.
    ///
    /// Routes to the caller-installed callback when present; the default
    /// handler logs and aborts, because continuing past this point means
    /// executing a corrupt command stream.
    pub(crate) fn raise_error(&self, context: &str, error: DriverError) {
        if let Some(ref callback) = self.inner.error_callback {
            callback(context, error);
        } else {
            log::error!("fatal driver error in {}: {}", context, error);
            std::process::abort();
        }
    }

    /// Allocate host memory through the injected allocator.
    pub(crate) fn alloc_host(&self, layout: Layout) -> DriverResult<NonNull<u8>> {
        unsafe { self.inner.allocator.allocate(layout) }
    }

    /// Free host memory previously obtained from [`Device::alloc_host`].
    pub(crate) fn free_host(&self, ptr: NonNull<u8>, layout: Layout) {
        unsafe { self.inner.allocator.free(ptr, layout) };
    }

    /// Reserve a GPU virtual address range for a memory block.
    ///
    /// The returned address is 0x1000-aligned, stable for the lifetime of
    /// the reservation, and never [`GPU_ADDR_INVALID`].
    pub(crate) fn reserve_gpu_va(&self, size: u32) -> DriverResult<GpuAddr> {
        let mut space = self
            .inner
            .address_space
            .lock()
            .expect("gpu address space lock poisoned");
        let addr = space.next;
        let end = addr
            .checked_add(align_up_u64(u64::from(size), u64::from(MEMBLOCK_ALIGNMENT)))
            .ok_or(DriverError::OutOfMemory)?;
        if end > GPU_VA_END {
            return Err(DriverError::OutOfMemory);
        }
        space.next = end;
        debug_assert_ne!(addr, GPU_ADDR_INVALID);
        Ok(addr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gpu_addresses_are_aligned_and_monotonic() {
        let device = Device::new(DeviceConfig::new());
        let a = device.reserve_gpu_va(0x1000).unwrap();
        let b = device.reserve_gpu_va(0x123).unwrap();
        assert_eq!(a % u64::from(MEMBLOCK_ALIGNMENT), 0);
        assert_eq!(b % u64::from(MEMBLOCK_ALIGNMENT), 0);
        assert!(b >= a + 0x1000);
        assert_ne!(a, GPU_ADDR_INVALID);
        assert_ne!(b, GPU_ADDR_INVALID);
    }

    #[test]
    fn clones_share_the_address_space() {
        let device = Device::new(DeviceConfig::new());
        let clone = device.clone();
        let a = device.reserve_gpu_va(0x1000).unwrap();
        let b = clone.reserve_gpu_va(0x1000).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn conventions_are_recorded() {
        let mut config = DeviceConfig::new();
        config.depth_mode = DepthMode::NegativeOneToOne;
        config.origin_mode = OriginMode::LowerLeft;
        let device = Device::new(config);
        assert_eq!(device.depth_mode(), DepthMode::NegativeOneToOne);
        assert_eq!(device.origin_mode(), OriginMode::LowerLeft);
    }
}
