//! Command stream encoding.
//!
//! A [`CommandBuffer`] serializes GPU operations into caller-supplied
//! memory segments and seals them into immutable, relocation-free
//! [`CmdList`] handles for queue submission. Recording is strictly
//! single-threaded and synchronous; nothing executes until a queue's worker
//! reaches the encoded words.
//!
//! Memory comes from the caller: up front through
//! [`CommandBuffer::add_memory`], or on demand through the
//! [`MemoryProvider`] capability when the current segment runs out
//! mid-recording. If neither yields memory the buffer enters a degraded
//! state, the device error callback fires, and `finish_list` reports
//! `BadState` until the buffer is cleared.

mod command_buffer;
mod command_list;
mod encoder;
pub(crate) mod opcode;

pub use command_list::CmdList;
pub(crate) use command_list::CmdSpan;
pub(crate) use opcode::Opcode;

use crate::device::Device;
use crate::memory::MemoryBlock;
use crate::swapchain::SwapchainState;
use crate::sync::Fence;

use ::{
    bitflags::bitflags,
    std::{collections::VecDeque, sync::Arc},
};

/// GPU-side ordering point strength, from cheapest to strongest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u32)]
pub enum BarrierMode {
    /// No ordering is performed.
    None = 0,
    /// Orders the processing of rasterizer tiles within a pass.
    Tiles = 1,
    /// Orders whole-renderpass fragment output.
    Fragments = 2,
    /// Completes all previous primitive and compute work.
    Primitives = 3,
    /// Completes everything and disables command prefetch.
    Full = 4,
}

bitflags! {
    /// Caches invalidated at a barrier point, independent of the barrier
    /// mode. Callers pick the cheapest set that satisfies their hazard.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct InvalidateFlags: u32 {
        /// The image (texture) cache.
        const IMAGE = 1 << 0;
        /// The shader code/data/uniform cache.
        const CODE = 1 << 1;
        /// The image/sampler descriptor pool cache.
        const POOL = 1 << 2;
        /// Zcull state.
        const ZCULL = 1 << 3;
        /// The L2 cache.
        const L2_CACHE = 1 << 4;
    }
}

bitflags! {
    /// Hardware capabilities a command list requires of its queue.
    ///
    /// Bit values match the queue capability flags so submission checks
    /// are a mask test.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ListUsage: u32 {
        const GRAPHICS = 1 << 0;
        const COMPUTE = 1 << 1;
        const TRANSFER = 1 << 2;
    }
}

bitflags! {
    /// Color channels affected by a clear.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ClearMask: u32 {
        const RED = 1 << 0;
        const GREEN = 1 << 1;
        const BLUE = 1 << 2;
        const ALPHA = 1 << 3;
    }
}

impl ClearMask {
    /// All four channels.
    pub const RGBA: ClearMask = ClearMask::RED
        .union(ClearMask::GREEN)
        .union(ClearMask::BLUE)
        .union(ClearMask::ALPHA);
}

/// Clear color typed to the render target's format class.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClearColorValue {
    Float([f32; 4]),
    Int([i32; 4]),
    Uint([u32; 4]),
}

impl ClearColorValue {
    pub(crate) fn raw_words(&self) -> [u32; 4] {
        match *self {
            ClearColorValue::Float(v) => {
                [v[0].to_bits(), v[1].to_bits(), v[2].to_bits(), v[3].to_bits()]
            }
            ClearColorValue::Int(v) => [v[0] as u32, v[1] as u32, v[2] as u32, v[3] as u32],
            ClearColorValue::Uint(v) => v,
        }
    }
}

/// One segment of command backing memory inside a CPU-visible block.
#[derive(Clone)]
pub struct CmdMemSegment {
    pub block: MemoryBlock,
    pub offset: u32,
    pub size: u32,
}

/// Capability interface supplying more command memory on demand.
///
/// `request_more` is invoked synchronously mid-recording when the current
/// segment cannot hold the next command; the returned segment must be at
/// least `min_size` bytes.
pub trait MemoryProvider: Send {
    fn request_more(&mut self, min_size: u32) -> Option<CmdMemSegment>;
}

/// An append-only encoder of GPU command streams.
///
/// Recording is single-threaded by construction (`&mut self` throughout);
/// the caller must not reuse or clear backing memory while any produced
/// list may still execute.
pub struct CommandBuffer {
    pub(crate) device: Device,
    provider: Option<Box<dyn MemoryProvider>>,
    pending: VecDeque<CmdMemSegment>,
    active: Option<ActiveSegment>,
    spans: Vec<CmdSpan>,
    fences: Vec<Fence>,
    swapchains: Vec<Arc<SwapchainState>>,
    usage: ListUsage,
    degraded: bool,
}

/// The segment currently being written.
struct ActiveSegment {
    block: MemoryBlock,
    /// Byte offset of the segment within the block.
    base: u32,
    /// Segment size in bytes.
    size: u32,
    /// Start of the open span, relative to `base`.
    span_start: u32,
    /// Write cursor, relative to `base`.
    cursor: u32,
}
