use super::ListUsage;
use crate::memory::MemoryBlock;
use crate::swapchain::SwapchainState;
use crate::sync::Fence;

use ::std::{fmt, sync::Arc};

/// One contiguous run of encoded command words inside a memory block.
#[derive(Clone)]
pub(crate) struct CmdSpan {
    pub(crate) block: MemoryBlock,
    /// Absolute byte offset of the first word within the block.
    pub(crate) offset: u32,
    /// Span length in bytes; always a multiple of 4.
    pub(crate) len: u32,
}

pub(crate) struct CmdListData {
    pub(crate) spans: Vec<CmdSpan>,
    /// Fences referenced by encoded wait/signal commands, indexed by the
    /// payload's fence slot.
    pub(crate) fences: Vec<Fence>,
    /// Swapchains referenced by encoded present commands.
    pub(crate) swapchains: Vec<Arc<SwapchainState>>,
    /// Queue capabilities the list requires.
    pub(crate) usage: ListUsage,
}

/// An immutable, finished sequence of encoded GPU operations.
///
/// Relocation-free: the handle pins the backing memory blocks (and any
/// referenced fences and swapchains) but never copies or patches the
/// encoded words. Cheap to clone and to submit to any number of queues.
#[derive(Clone)]
pub struct CmdList {
    pub(crate) data: Arc<CmdListData>,
}

impl CmdList {
    /// The empty list produced by finishing a buffer with nothing
    /// recorded. Submitting it is a no-op.
    pub(crate) fn empty() -> Self {
        Self {
            data: Arc::new(CmdListData {
                spans: Vec::new(),
                fences: Vec::new(),
                swapchains: Vec::new(),
                usage: ListUsage::empty(),
            }),
        }
    }

    pub(crate) fn from_parts(
        spans: Vec<CmdSpan>,
        fences: Vec<Fence>,
        swapchains: Vec<Arc<SwapchainState>>,
        usage: ListUsage,
    ) -> Self {
        Self {
            data: Arc::new(CmdListData {
                spans,
                fences,
                swapchains,
                usage,
            }),
        }
    }

    /// True when the list contains no commands.
    pub fn is_empty(&self) -> bool {
        self.data.spans.is_empty()
    }

    /// Total encoded size in bytes.
    pub fn size_bytes(&self) -> u32 {
        self.data.spans.iter().map(|span| span.len).sum()
    }

    /// Queue capabilities this list requires.
    pub(crate) fn usage(&self) -> ListUsage {
        self.data.usage
    }

    /// Poison every fence the list would have signaled. Used by queues
    /// that drop work after latching the error state.
    pub(crate) fn poison_fences(&self) {
        for fence in &self.data.fences {
            fence.poison();
        }
    }

    /// Release every slot the list would have presented. Used together
    /// with [`CmdList::poison_fences`] on the error path so acquire does
    /// not deadlock on slots that will never be presented.
    pub(crate) fn abandon_presents(&self) {
        // Encoded present commands are located by walking the stream; on
        // the error path precision no longer matters, so free every slot
        // in the pending-present state instead.
        for swapchain in &self.data.swapchains {
            let mut slots = swapchain
                .slots
                .lock()
                .expect("swapchain state lock poisoned");
            for slot in slots.iter_mut() {
                if *slot == crate::swapchain::SlotState::PendingPresent {
                    *slot = crate::swapchain::SlotState::Free;
                }
            }
            swapchain.available.notify_all();
        }
    }
}

impl fmt::Debug for CmdList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CmdList")
            .field("spans", &self.data.spans.len())
            .field("bytes", &self.size_bytes())
            .field("usage", &self.data.usage)
            .finish()
    }
}
