use super::{
    ActiveSegment, CmdList, CmdMemSegment, CmdSpan, CommandBuffer, ListUsage, MemoryProvider,
    Opcode,
};
use crate::device::Device;
use crate::errors::{DriverError, DriverResult};
use crate::limits::{is_aligned_u32, CMDMEM_ALIGNMENT};
use crate::memory::MemoryBlock;
use crate::sync::Fence;

use ::std::{collections::VecDeque, mem};

impl CommandBuffer {
    /// Create an encoder with no backing memory and no growth provider.
    ///
    /// Add at least one segment with [`CommandBuffer::add_memory`] or
    /// install a [`MemoryProvider`] before recording.
    pub fn new(device: &Device) -> Self {
        Self {
            device: device.clone(),
            provider: None,
            pending: VecDeque::new(),
            active: None,
            spans: Vec::new(),
            fences: Vec::new(),
            swapchains: Vec::new(),
            usage: ListUsage::empty(),
            degraded: false,
        }
    }

    /// Install the growth callback invoked when recording runs out of
    /// segment space.
    pub fn set_memory_provider(&mut self, provider: Box<dyn MemoryProvider>) {
        self.provider = Some(provider);
    }

    /// Append a backing segment.
    ///
    /// `offset` must be 4-aligned (`MisalignedData`), `size` a positive
    /// multiple of 4 (`MisalignedSize`); the range must lie inside a
    /// CPU-visible block (`BadInput`).
    pub fn add_memory(&mut self, block: &MemoryBlock, offset: u32, size: u32) -> DriverResult<()> {
        if !is_aligned_u32(offset, CMDMEM_ALIGNMENT) {
            return Err(DriverError::MisalignedData);
        }
        if size == 0 || !is_aligned_u32(size, CMDMEM_ALIGNMENT) {
            return Err(DriverError::MisalignedSize);
        }
        let end = offset.checked_add(size).ok_or(DriverError::BadInput)?;
        if end > block.size() || block.cpu_addr().is_none() {
            return Err(DriverError::BadInput);
        }

        let segment = CmdMemSegment {
            block: block.clone(),
            offset,
            size,
        };
        if self.active.is_none() {
            self.activate(segment);
        } else {
            self.pending.push_back(segment);
        }
        Ok(())
    }

    /// Seal everything recorded since the last finish into an immutable
    /// list and continue recording in the unused remainder.
    ///
    /// Returns an empty list when nothing was recorded, and `BadState`
    /// once the buffer has degraded from a failed memory request.
    pub fn finish_list(&mut self) -> DriverResult<CmdList> {
        if self.degraded {
            return Err(DriverError::BadState);
        }

        let mut spans = mem::replace(&mut self.spans, Vec::new());
        if let Some(ref mut segment) = self.active {
            if segment.cursor > segment.span_start {
                spans.push(CmdSpan {
                    block: segment.block.clone(),
                    offset: segment.base + segment.span_start,
                    len: segment.cursor - segment.span_start,
                });
                segment.span_start = segment.cursor;
            }
        }

        let fences = mem::replace(&mut self.fences, Vec::new());
        let swapchains = mem::replace(&mut self.swapchains, Vec::new());
        let usage = mem::replace(&mut self.usage, ListUsage::empty());

        if spans.is_empty() {
            return Ok(CmdList::empty());
        }
        let list = CmdList::from_parts(spans, fences, swapchains, usage);
        log::trace!("finish list: {:?}", list);
        Ok(list)
    }

    /// Discard all segments and recorded state and rewind to empty.
    ///
    /// The caller must guarantee that no queue is still executing lists
    /// built from this buffer's prior memory; the encoded words live in
    /// that memory and are not copied anywhere.
    pub fn clear(&mut self) {
        self.pending.clear();
        self.active = None;
        self.spans.clear();
        self.fences.clear();
        self.swapchains.clear();
        self.usage = ListUsage::empty();
        self.degraded = false;
    }

    /// Bytes recorded into the list currently being built.
    pub fn recorded_bytes(&self) -> u32 {
        let open = self
            .active
            .as_ref()
            .map(|segment| segment.cursor - segment.span_start)
            .unwrap_or(0);
        self.spans.iter().map(|span| span.len).sum::<u32>() + open
    }

    /// True once a memory request has failed; cleared by
    /// [`CommandBuffer::clear`].
    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    /// Poison every fence armed by commands recorded into the unfinished
    /// list. Used by queues that latch the error state with commands
    /// still batched; the signals will never be delivered.
    pub(crate) fn poison_recorded_fences(&self) {
        for fence in &self.fences {
            fence.poison();
        }
    }

    /// The device this buffer encodes for.
    pub fn device(&self) -> &Device {
        &self.device
    }

    /// Encode one command. Infallible by contract: misuse and overflow
    /// route through the device error callback and the degraded latch,
    /// mirroring the queue's fail-fast policy.
    pub(super) fn emit(&mut self, op: Opcode, payload: &[u32]) {
        debug_assert!(payload.len() <= super::opcode::MAX_PAYLOAD_WORDS);
        let bytes = 4 * (1 + payload.len() as u32);
        let target = match self.reserve(bytes) {
            Some(target) => target,
            None => return,
        };
        let (block, base) = target;
        unsafe {
            block.write_u32(base, super::opcode::header(op, payload.len()));
            for (index, word) in payload.iter().enumerate() {
                block.write_u32(base + 4 + 4 * index as u32, *word);
            }
        }
    }

    /// Record that the current list requires a queue capability.
    pub(super) fn require(&mut self, usage: ListUsage) {
        self.usage |= usage;
    }

    /// Report an encoding misuse through the device error callback.
    pub(super) fn raise(&mut self, context: &str, error: DriverError) {
        self.device.raise_error(context, error);
    }

    /// Slot of `fence` in the list's fence table, interning it on first
    /// reference.
    pub(super) fn fence_index(&mut self, fence: &Fence) -> u32 {
        if let Some(index) = self.fences.iter().position(|f| f.is_same(fence)) {
            return index as u32;
        }
        self.fences.push(fence.clone());
        (self.fences.len() - 1) as u32
    }

    /// Slot of `swapchain` in the list's swapchain table.
    pub(super) fn swapchain_index(
        &mut self,
        swapchain: &std::sync::Arc<crate::swapchain::SwapchainState>,
    ) -> u32 {
        if let Some(index) = self
            .swapchains
            .iter()
            .position(|s| std::sync::Arc::ptr_eq(s, swapchain))
        {
            return index as u32;
        }
        self.swapchains.push(swapchain.clone());
        (self.swapchains.len() - 1) as u32
    }

    /// Ensure `bytes` of contiguous space and advance the cursor over it.
    fn reserve(&mut self, bytes: u32) -> Option<(MemoryBlock, u32)> {
        if self.degraded {
            return None;
        }
        loop {
            if let Some(ref mut segment) = self.active {
                if segment.size - segment.cursor >= bytes {
                    let absolute = segment.base + segment.cursor;
                    segment.cursor += bytes;
                    return Some((segment.block.clone(), absolute));
                }
            }
            if !self.advance_segment(bytes) {
                return None;
            }
        }
    }

    /// Close the open span and move to the next segment able to hold
    /// `min_bytes`, asking the provider when the queue of pending segments
    /// runs dry.
    fn advance_segment(&mut self, min_bytes: u32) -> bool {
        self.close_active();

        while let Some(segment) = self.pending.pop_front() {
            if segment.size >= min_bytes {
                self.activate(segment);
                return true;
            }
            // Too small for the command at hand; skipped segments are
            // abandoned, same as the tail of an exhausted segment.
        }

        let request = match self.provider {
            Some(ref mut provider) => provider.request_more(min_bytes),
            None => None,
        };
        match request {
            Some(segment)
                if segment.size >= min_bytes
                    && is_aligned_u32(segment.offset, CMDMEM_ALIGNMENT)
                    && is_aligned_u32(segment.size, CMDMEM_ALIGNMENT)
                    && segment.offset.checked_add(segment.size).map_or(false, |end| {
                        end <= segment.block.size()
                    })
                    && segment.block.cpu_addr().is_some() =>
            {
                self.activate(segment);
                true
            }
            Some(_) => {
                self.degraded = true;
                self.device
                    .raise_error("command buffer growth returned an unusable segment", DriverError::BadInput);
                false
            }
            None => {
                self.degraded = true;
                self.device.raise_error(
                    "command buffer overflow with no growth memory",
                    DriverError::OutOfMemory,
                );
                false
            }
        }
    }

    fn close_active(&mut self) {
        if let Some(segment) = self.active.take() {
            if segment.cursor > segment.span_start {
                self.spans.push(CmdSpan {
                    block: segment.block,
                    offset: segment.base + segment.span_start,
                    len: segment.cursor - segment.span_start,
                });
            }
        }
    }

    fn activate(&mut self, segment: CmdMemSegment) {
        self.active = Some(ActiveSegment {
            block: segment.block,
            base: segment.offset,
            size: segment.size,
            span_start: 0,
            cursor: 0,
        });
    }
}
