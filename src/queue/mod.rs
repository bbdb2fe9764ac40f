//! Hardware submission queues.
//!
//! A [`Queue`] owns one hardware execution channel: command lists submitted
//! to it execute asynchronously, strictly in submission order, with no
//! reordering and no dependency inference between lists. The channel is
//! driven by a dedicated worker thread that walks the encoded streams —
//! delivering fence signals, blocking on encoded waits, completing
//! presents — and that latches the queue error state the moment it meets a
//! malformed stream. A latched queue only drains; destroy and recreate it
//! to recover.
//!
//! Queue-level operations (fence signal/wait, present) are themselves
//! encoded commands: they go through a private command pool and are
//! batched until a flush, the flush threshold, or an operation that forces
//! ordering.

mod executor;
mod queue;

use crate::command::{CmdList, CommandBuffer};
use crate::device::Device;
use crate::limits::{
    DEFAULT_MAX_COMPUTE_CONCURRENT_JOBS, PER_WARP_SCRATCH_MEM_ALIGNMENT, QUEUE_MIN_CMDMEM_SIZE,
};
use crate::memory::MemoryBlock;

use ::{
    bitflags::bitflags,
    std::{
        sync::{atomic::AtomicBool, mpsc, Arc},
        thread,
    },
};

bitflags! {
    /// Capabilities and options of a queue.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct QueueFlags: u32 {
        /// Channel can execute draw commands.
        const GRAPHICS = 1 << 0;
        /// Channel can execute compute dispatches.
        const COMPUTE = 1 << 1;
        /// Channel can execute transfer operations.
        const TRANSFER = 1 << 2;
        /// Disable Zcull processing for this queue.
        const DISABLE_ZCULL = 1 << 4;
    }
}

impl Default for QueueFlags {
    fn default() -> Self {
        QueueFlags::GRAPHICS | QueueFlags::COMPUTE | QueueFlags::TRANSFER
    }
}

/// Configuration for creating a [`Queue`].
#[derive(Debug, Clone, Copy)]
pub struct QueueConfig {
    /// Capability selection.
    pub flags: QueueFlags,

    /// Size of the private command pool; at least
    /// [`QUEUE_MIN_CMDMEM_SIZE`].
    pub command_memory_size: u32,

    /// Batched internal commands are flushed once they exceed this many
    /// bytes.
    pub flush_threshold: u32,

    /// Per-warp scratch memory reserved for compute shaders; a multiple of
    /// [`PER_WARP_SCRATCH_MEM_ALIGNMENT`].
    pub per_warp_scratch_memory_size: u32,

    /// Upper bound on compute jobs in flight.
    pub max_concurrent_compute_jobs: u32,
}

impl QueueConfig {
    /// A graphics+compute+transfer queue with default pool sizing.
    pub fn new() -> Self {
        Self {
            flags: QueueFlags::default(),
            command_memory_size: QUEUE_MIN_CMDMEM_SIZE,
            flush_threshold: QUEUE_MIN_CMDMEM_SIZE / 8,
            per_warp_scratch_memory_size: 4 * PER_WARP_SCRATCH_MEM_ALIGNMENT,
            max_concurrent_compute_jobs: DEFAULT_MAX_COMPUTE_CONCURRENT_JOBS,
        }
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// A hardware submission channel.
pub struct Queue {
    /// The device this queue was created from.
    #[allow(unused)]
    pub(crate) device: Device,
    pub(crate) flags: QueueFlags,
    pub(crate) flush_threshold: u32,
    pub(crate) shared: Arc<QueueShared>,
    pub(crate) sender: mpsc::Sender<Job>,
    pub(crate) worker: Option<thread::JoinHandle<()>>,
    /// Private pool for queue-generated commands.
    pub(crate) internal: CommandBuffer,
    /// Compute scratch backing; reserved at creation, referenced by the
    /// hardware for spilling, never touched CPU-side.
    #[allow(dead_code)]
    pub(crate) scratch_mem: Option<MemoryBlock>,
}

/// State shared between a queue handle and its worker.
pub(crate) struct QueueShared {
    pub(crate) error: AtomicBool,
}

/// Work items delivered to the queue worker.
pub(crate) enum Job {
    Execute(CmdList),
    Shutdown,
}
