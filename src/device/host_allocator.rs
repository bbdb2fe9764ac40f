use crate::errors::{DriverError, DriverResult};

use ::std::{
    alloc::{alloc, dealloc, Layout},
    ptr::NonNull,
    sync::Arc,
};

/// The host memory allocation interface injected into a device.
///
/// Every CPU-side backing allocation made by this crate goes through the
/// device's instance of this trait, so an application can interpose its own
/// heap, pool, or tracking layer.
pub trait HostAllocator: Send + Sync {
    /// Allocate host memory with the given layout.
    ///
    /// # unsafe because
    ///
    /// - the caller is responsible for releasing the returned memory with
    ///   [`HostAllocator::free`] using the same layout
    unsafe fn allocate(&self, layout: Layout) -> DriverResult<NonNull<u8>>;

    /// Free memory previously returned by [`HostAllocator::allocate`].
    ///
    /// # unsafe because
    ///
    /// - `ptr` must have been returned by `allocate` on this same instance
    ///   with this same `layout`, and must not be used afterwards
    unsafe fn free(&self, ptr: NonNull<u8>, layout: Layout);
}

/// Host allocator backed by the platform heap (`std::alloc`).
pub struct SystemAllocator;

impl HostAllocator for SystemAllocator {
    unsafe fn allocate(&self, layout: Layout) -> DriverResult<NonNull<u8>> {
        NonNull::new(alloc(layout)).ok_or(DriverError::OutOfMemory)
    }

    unsafe fn free(&self, ptr: NonNull<u8>, layout: Layout) {
        dealloc(ptr.as_ptr(), layout);
    }
}

/// Create the default host allocator.
pub fn create_default_allocator() -> Arc<dyn HostAllocator> {
    Arc::new(SystemAllocator)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_allocator_round_trip() {
        let allocator = SystemAllocator;
        let layout = Layout::from_size_align(0x1000, 0x1000).unwrap();
        let ptr = unsafe { allocator.allocate(layout) }.unwrap();
        assert_eq!(ptr.as_ptr() as usize % 0x1000, 0);
        unsafe { allocator.free(ptr, layout) };
    }
}
