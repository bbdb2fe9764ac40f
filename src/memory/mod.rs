//! GPU-visible memory blocks.
//!
//! A [`MemoryBlock`] is the leaf resource everything else is placed inside:
//! command segments, shader code, image pixels, and descriptor sets all
//! live at some offset within a block. Blocks are GPU-addressable for their
//! whole lifetime and optionally CPU-visible depending on the access flags.
//!
//! The crate performs no hazard tracking: concurrent CPU and GPU access to
//! overlapping ranges must be ordered by the caller with fences, barriers,
//! and the cache maintenance operations on this type.

mod memory_block;

use crate::device::Device;
use crate::limits::GpuAddr;

use ::{
    bitflags::bitflags,
    std::{alloc::Layout, ptr::NonNull, sync::Arc},
};

bitflags! {
    /// Cache-access and usage flags of a memory block.
    ///
    /// CPU and GPU access are each a two-bit field: no access, uncached,
    /// or cached. Setting both access bits of one field is invalid and
    /// reported as `BadMemFlags`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct MemoryFlags: u32 {
        /// CPU maps the block with caching disabled.
        const CPU_UNCACHED = 1 << 0;
        /// CPU maps the block write-back cached; explicit flush/invalidate
        /// calls are required around GPU access.
        const CPU_CACHED = 1 << 1;
        /// GPU maps the block with caching disabled.
        const GPU_UNCACHED = 1 << 2;
        /// GPU maps the block through the L2 cache.
        const GPU_CACHED = 1 << 3;
        /// Block may hold shader code.
        const CODE = 1 << 4;
        /// Block may hold image data.
        const IMAGE = 1 << 5;
        /// Zero the block contents at creation.
        const ZERO_FILL_INIT = 1 << 8;
    }
}

impl MemoryFlags {
    /// Both CPU access bits.
    pub const CPU_ACCESS_MASK: MemoryFlags =
        MemoryFlags::CPU_UNCACHED.union(MemoryFlags::CPU_CACHED);

    /// Both GPU access bits.
    pub const GPU_ACCESS_MASK: MemoryFlags =
        MemoryFlags::GPU_UNCACHED.union(MemoryFlags::GPU_CACHED);

    /// True when any CPU access is requested.
    pub fn cpu_visible(self) -> bool {
        self.intersects(Self::CPU_ACCESS_MASK)
    }

    /// True when any GPU access is requested.
    pub fn gpu_visible(self) -> bool {
        self.intersects(Self::GPU_ACCESS_MASK)
    }
}

impl Default for MemoryFlags {
    /// Uncached CPU access and cached GPU access — the right choice for
    /// memory the CPU writes once and the GPU reads many times.
    fn default() -> Self {
        MemoryFlags::CPU_UNCACHED | MemoryFlags::GPU_CACHED
    }
}

/// Configuration for creating a [`MemoryBlock`].
pub struct MemoryBlockConfig {
    /// Requested size in bytes; rounded up to the 0x1000 boundary unless
    /// backing storage is caller-supplied, in which case it must already
    /// be aligned.
    pub size: u32,

    /// Cache-access and usage flags.
    pub flags: MemoryFlags,

    /// Caller-supplied backing storage, or `None` to allocate through the
    /// device's host allocator.
    pub storage: Option<NonNull<u8>>,
}

impl MemoryBlockConfig {
    /// Configuration for a device-allocated block with default flags.
    pub fn new(size: u32) -> Self {
        Self {
            size,
            flags: MemoryFlags::default(),
            storage: None,
        }
    }

    /// Use caller-supplied backing storage instead of allocating.
    ///
    /// # unsafe because
    ///
    /// - `storage` must point to at least `size` bytes, 0x1000-aligned,
    ///   valid and unmoved for the whole lifetime of the block
    /// - the caller keeps ownership and must not free the memory while the
    ///   block (or any command list reading it) is alive
    pub unsafe fn with_storage(mut self, storage: NonNull<u8>) -> Self {
        self.storage = Some(storage);
        self
    }
}

/// A GPU-addressable memory allocation. Cheap to clone; all clones refer
/// to the same block.
#[derive(Clone)]
pub struct MemoryBlock {
    pub(crate) inner: Arc<MemBlockInner>,
}

pub(crate) struct MemBlockInner {
    pub(crate) device: Device,
    pub(crate) storage: NonNull<u8>,
    pub(crate) layout: Layout,
    pub(crate) owned: bool,
    pub(crate) size: u32,
    pub(crate) flags: MemoryFlags,
    pub(crate) gpu_addr: GpuAddr,
}

// The storage pointer is either owned by the block or contractually pinned
// by the caller (`MemoryBlockConfig::with_storage`); cross-thread access is
// ordered by fences and barriers per the crate's concurrency model.
unsafe impl Send for MemBlockInner {}
unsafe impl Sync for MemBlockInner {}
