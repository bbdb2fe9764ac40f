use super::{MemBlockInner, MemoryBlock, MemoryBlockConfig, MemoryFlags};
use crate::device::Device;
use crate::errors::{DriverError, DriverResult};
use crate::limits::{
    align_up_u32, is_aligned_u32, GpuAddr, CPU_CACHE_LINE_SIZE, MEMBLOCK_ALIGNMENT,
};

use ::std::{
    alloc::Layout,
    fmt,
    ptr::NonNull,
    sync::{atomic, Arc},
};

impl MemoryBlock {
    /// Create a memory block on the given device.
    ///
    /// The size is rounded up to the 0x1000 boundary. Caller-supplied
    /// storage must already satisfy that alignment in both size and base
    /// address.
    pub fn new(device: &Device, config: &MemoryBlockConfig) -> DriverResult<Self> {
        validate_flags(config.flags)?;
        if config.size == 0 {
            return Err(DriverError::BadInput);
        }

        let (storage, size, layout, owned) = match config.storage {
            Some(ptr) => {
                if !is_aligned_u32(config.size, MEMBLOCK_ALIGNMENT) {
                    return Err(DriverError::MisalignedSize);
                }
                if (ptr.as_ptr() as usize) & (MEMBLOCK_ALIGNMENT as usize - 1) != 0 {
                    return Err(DriverError::MisalignedData);
                }
                let layout = block_layout(config.size)?;
                (ptr, config.size, layout, false)
            }
            None => {
                let size = align_up_u32(config.size, MEMBLOCK_ALIGNMENT);
                let layout = block_layout(size)?;
                let ptr = device.alloc_host(layout)?;
                (ptr, size, layout, true)
            }
        };

        if config.flags.contains(MemoryFlags::ZERO_FILL_INIT) {
            unsafe { storage.as_ptr().write_bytes(0, size as usize) };
        }

        let gpu_addr = match device.reserve_gpu_va(size) {
            Ok(addr) => addr,
            Err(e) => {
                if owned {
                    device.free_host(storage, layout);
                }
                return Err(e);
            }
        };

        log::debug!(
            "create memory block: size=0x{:x} flags={:?} gpu_addr=0x{:x}",
            size,
            config.flags,
            gpu_addr
        );

        Ok(Self {
            inner: Arc::new(MemBlockInner {
                device: device.clone(),
                storage,
                layout,
                owned,
                size,
                flags: config.flags,
                gpu_addr,
            }),
        })
    }

    /// The block size in bytes, always a multiple of 0x1000.
    pub fn size(&self) -> u32 {
        self.inner.size
    }

    /// The access flags the block was created with.
    pub fn flags(&self) -> MemoryFlags {
        self.inner.flags
    }

    /// The block's stable GPU virtual address.
    pub fn gpu_addr(&self) -> GpuAddr {
        self.inner.gpu_addr
    }

    /// The CPU mapping of the block, or `None` when the block was created
    /// without CPU access.
    pub fn cpu_addr(&self) -> Option<NonNull<u8>> {
        if self.inner.flags.cpu_visible() {
            Some(self.inner.storage)
        } else {
            None
        }
    }

    /// Read-only view of the CPU mapping.
    ///
    /// # unsafe because
    ///
    /// - the caller must guarantee no GPU write to this block is in flight,
    ///   using fences and barriers; the crate performs no hazard tracking
    pub unsafe fn cpu_slice(&self) -> Option<&[u8]> {
        self.cpu_addr()
            .map(|ptr| std::slice::from_raw_parts(ptr.as_ptr(), self.inner.size as usize))
    }

    /// Mutable view of the CPU mapping.
    ///
    /// # unsafe because
    ///
    /// - the caller must guarantee exclusive access for the duration of the
    ///   borrow: no GPU access, no overlapping CPU borrow
    #[allow(clippy::mut_from_ref)]
    pub unsafe fn cpu_slice_mut(&self) -> Option<&mut [u8]> {
        self.cpu_addr()
            .map(|ptr| std::slice::from_raw_parts_mut(ptr.as_ptr(), self.inner.size as usize))
    }

    /// Flush the CPU cache over a byte range so GPU reads observe prior
    /// CPU writes.
    ///
    /// The range must be cache-line aligned: `MisalignedData` for the
    /// offset, `MisalignedSize` for the size.
    pub fn flush_cpu_cache(&self, offset: u32, size: u32) -> DriverResult<()> {
        self.validate_cache_range(offset, size)?;
        // On this platform the mapping is coherent; what remains is to
        // order the compiler and CPU store queue before GPU observation.
        atomic::fence(atomic::Ordering::SeqCst);
        Ok(())
    }

    /// Invalidate the CPU cache over a byte range so CPU reads observe
    /// prior GPU writes.
    ///
    /// Same alignment contract as [`MemoryBlock::flush_cpu_cache`].
    pub fn invalidate_cpu_cache(&self, offset: u32, size: u32) -> DriverResult<()> {
        self.validate_cache_range(offset, size)?;
        atomic::fence(atomic::Ordering::SeqCst);
        Ok(())
    }

    fn validate_cache_range(&self, offset: u32, size: u32) -> DriverResult<()> {
        if !self.inner.flags.cpu_visible() {
            return Err(DriverError::BadState);
        }
        if !is_aligned_u32(offset, CPU_CACHE_LINE_SIZE) {
            return Err(DriverError::MisalignedData);
        }
        if size == 0 || !is_aligned_u32(size, CPU_CACHE_LINE_SIZE) {
            return Err(DriverError::MisalignedSize);
        }
        if offset.checked_add(size).map_or(true, |end| end > self.inner.size) {
            return Err(DriverError::BadInput);
        }
        Ok(())
    }

    /// Read one command word from the block.
    ///
    /// # unsafe because
    ///
    /// - `byte_offset` must be 4-aligned and in bounds
    pub(crate) unsafe fn read_u32(&self, byte_offset: u32) -> u32 {
        debug_assert!(byte_offset + 4 <= self.inner.size);
        debug_assert!(is_aligned_u32(byte_offset, 4));
        self.inner
            .storage
            .as_ptr()
            .add(byte_offset as usize)
            .cast::<u32>()
            .read_volatile()
    }

    /// Write one command word into the block.
    ///
    /// # unsafe because
    ///
    /// - `byte_offset` must be 4-aligned and in bounds
    /// - the caller must guarantee no concurrent access to the same word
    pub(crate) unsafe fn write_u32(&self, byte_offset: u32, value: u32) {
        debug_assert!(byte_offset + 4 <= self.inner.size);
        debug_assert!(is_aligned_u32(byte_offset, 4));
        self.inner
            .storage
            .as_ptr()
            .add(byte_offset as usize)
            .cast::<u32>()
            .write_volatile(value);
    }

    /// True when both handles refer to the same underlying block.
    pub fn is_same(&self, other: &MemoryBlock) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for MemoryBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryBlock")
            .field("size", &self.inner.size)
            .field("flags", &self.inner.flags)
            .field("gpu_addr", &format_args!("0x{:x}", self.inner.gpu_addr))
            .finish()
    }
}

impl Drop for MemBlockInner {
    fn drop(&mut self) {
        if self.owned {
            self.device.free_host(self.storage, self.layout);
        }
    }
}

fn validate_flags(flags: MemoryFlags) -> DriverResult<()> {
    if flags.contains(MemoryFlags::CPU_ACCESS_MASK)
        || flags.contains(MemoryFlags::GPU_ACCESS_MASK)
    {
        // Requesting both cached and uncached access in one field.
        return Err(DriverError::BadMemFlags);
    }
    if flags.contains(MemoryFlags::CODE) && !flags.gpu_visible() {
        return Err(DriverError::BadMemFlags);
    }
    Ok(())
}

fn block_layout(size: u32) -> DriverResult<Layout> {
    Layout::from_size_align(size as usize, MEMBLOCK_ALIGNMENT as usize)
        .map_err(|_| DriverError::BadInput)
}
