use super::{executor, Job, Queue, QueueConfig, QueueFlags, QueueShared};
use crate::command::{CmdList, CmdMemSegment, CommandBuffer, ListUsage, MemoryProvider};
use crate::device::Device;
use crate::errors::{DriverError, DriverResult};
use crate::limits::{
    align_up_u32, is_aligned_u32, MEMBLOCK_ALIGNMENT, PER_WARP_SCRATCH_MEM_ALIGNMENT,
    QUEUE_MIN_CMDMEM_SIZE,
};
use crate::memory::{MemoryBlock, MemoryBlockConfig, MemoryFlags};
use crate::swapchain::Swapchain;
use crate::sync::Fence;

use ::std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        mpsc, Arc,
    },
    thread,
};

/// Growth provider of the queue's private pool: allocates fresh device
/// memory in pool-sized chunks. Exhausted chunks are released once every
/// list recorded in them has executed, via the list handles themselves.
struct QueuePoolProvider {
    device: Device,
    chunk_size: u32,
}

impl MemoryProvider for QueuePoolProvider {
    fn request_more(&mut self, min_size: u32) -> Option<CmdMemSegment> {
        let size = align_up_u32(min_size.max(self.chunk_size), MEMBLOCK_ALIGNMENT);
        let block = MemoryBlock::new(&self.device, &MemoryBlockConfig::new(size)).ok()?;
        let size = block.size();
        Some(CmdMemSegment {
            block,
            offset: 0,
            size,
        })
    }
}

impl Queue {
    /// Create a hardware submission channel.
    pub fn new(device: &Device, config: &QueueConfig) -> DriverResult<Self> {
        let capabilities =
            config.flags & (QueueFlags::GRAPHICS | QueueFlags::COMPUTE | QueueFlags::TRANSFER);
        if capabilities.is_empty() {
            return Err(DriverError::BadInput);
        }
        if config.command_memory_size < QUEUE_MIN_CMDMEM_SIZE {
            return Err(DriverError::BadInput);
        }
        if config.flush_threshold == 0 || config.flush_threshold > config.command_memory_size {
            return Err(DriverError::BadInput);
        }
        if !is_aligned_u32(
            config.per_warp_scratch_memory_size,
            PER_WARP_SCRATCH_MEM_ALIGNMENT,
        ) {
            return Err(DriverError::MisalignedSize);
        }

        let scratch_mem = if config.flags.contains(QueueFlags::COMPUTE)
            && config.per_warp_scratch_memory_size > 0
        {
            let scratch_size = config
                .per_warp_scratch_memory_size
                .checked_mul(config.max_concurrent_compute_jobs)
                .ok_or(DriverError::BadInput)?;
            let mut block_config = MemoryBlockConfig::new(scratch_size.max(MEMBLOCK_ALIGNMENT));
            block_config.flags = MemoryFlags::GPU_CACHED | MemoryFlags::ZERO_FILL_INIT;
            Some(MemoryBlock::new(device, &block_config)?)
        } else {
            None
        };

        let mut internal = CommandBuffer::new(device);
        internal.set_memory_provider(Box::new(QueuePoolProvider {
            device: device.clone(),
            chunk_size: config.command_memory_size,
        }));

        let shared = Arc::new(QueueShared {
            error: AtomicBool::new(false),
        });
        let (sender, receiver) = mpsc::channel();
        let worker_shared = shared.clone();
        let worker = thread::Builder::new()
            .name("tegra3d-queue".into())
            .spawn(move || executor::run(worker_shared, receiver))
            .map_err(|_| DriverError::Fail)?;

        log::debug!(
            "create queue: flags={:?} cmdmem=0x{:x} flush=0x{:x}",
            config.flags,
            config.command_memory_size,
            config.flush_threshold
        );

        Ok(Self {
            device: device.clone(),
            flags: config.flags,
            flush_threshold: config.flush_threshold,
            shared,
            sender,
            worker: Some(worker),
            internal,
            scratch_mem,
        })
    }

    /// True once a submission has failed at the hardware level. A latched
    /// queue refuses further work until destroyed and recreated.
    pub fn is_in_error_state(&self) -> bool {
        self.shared.error.load(Ordering::SeqCst)
    }

    /// Append a finished list to the queue's execution order.
    ///
    /// Execution order equals submission order. A list requiring a
    /// capability this queue lacks is rejected with `NotImplemented`; an
    /// empty list is a no-op; a latched queue reports `BadState`.
    pub fn submit_commands(&mut self, list: &CmdList) -> DriverResult<()> {
        if self.is_in_error_state() {
            return Err(DriverError::BadState);
        }
        if list.is_empty() {
            return Ok(());
        }
        let capabilities = ListUsage::from_bits_truncate(self.flags.bits());
        if !capabilities.contains(list.usage()) {
            return Err(DriverError::NotImplemented);
        }
        // Queue-level commands recorded so far must execute first.
        self.flush_internal()?;
        self.send(list.clone())
    }

    /// Force any batched queue-level commands out to the hardware.
    pub fn flush(&mut self) {
        let _ = self.flush_internal();
    }

    /// Enqueue a GPU-side signal of `fence` on this queue's timeline.
    ///
    /// The fence re-arms immediately; it signals when the channel executes
    /// this point. `flush=true` forces immediate hardware notification
    /// instead of batching.
    pub fn signal_fence(&mut self, fence: &Fence, flush: bool) {
        if self.is_in_error_state() {
            // The signal will never be delivered.
            fence.arm();
            fence.poison();
            return;
        }
        self.internal.signal_fence(fence, flush);
        self.maybe_flush(flush);
    }

    /// Enqueue a GPU-side wait for `fence` on this queue's timeline.
    pub fn wait_fence(&mut self, fence: &Fence) {
        if self.is_in_error_state() {
            return;
        }
        self.internal.wait_fence(fence);
        self.maybe_flush(false);
    }

    /// Block the calling thread until all submitted work has completed.
    ///
    /// Implemented as signal-then-wait on an internal fence; reports
    /// `Fail` when the queue is (or ends up) in the error state.
    pub fn wait_idle(&mut self) -> DriverResult<()> {
        let fence = Fence::new();
        self.signal_fence(&fence, true);
        fence.wait(-1)
    }

    /// Block until a swapchain slot is free and acquire it.
    pub fn acquire_image(&mut self, swapchain: &Swapchain) -> DriverResult<usize> {
        if self.is_in_error_state() {
            return Err(DriverError::BadState);
        }
        // Pending presents must reach the worker or no slot ever frees.
        self.flush_internal()?;
        Ok(swapchain.state.acquire_blocking())
    }

    /// Hand an acquired slot back to the display system once the channel
    /// reaches this point.
    pub fn present_image(&mut self, swapchain: &Swapchain, slot: usize) -> DriverResult<()> {
        if self.is_in_error_state() {
            return Err(DriverError::BadState);
        }
        swapchain.state.begin_present(slot)?;
        self.internal.encode_present(&swapchain.state, slot as u32);
        self.flush_internal()
    }

    fn maybe_flush(&mut self, force: bool) {
        if force || self.internal.recorded_bytes() >= self.flush_threshold {
            let _ = self.flush_internal();
        }
    }

    fn flush_internal(&mut self) -> DriverResult<()> {
        match self.internal.finish_list() {
            Ok(list) => {
                if list.is_empty() {
                    Ok(())
                } else {
                    self.send(list)
                }
            }
            Err(error) => {
                // The private pool could not grow; the channel can no
                // longer express queue-level ordering. Fail fast and
                // resolve any signal that will now never be delivered.
                self.latch_error("private command pool exhausted");
                self.internal.poison_recorded_fences();
                Err(error)
            }
        }
    }

    fn send(&mut self, list: CmdList) -> DriverResult<()> {
        self.sender.send(Job::Execute(list)).map_err(|_| {
            self.latch_error("worker channel closed");
            DriverError::Fail
        })
    }

    fn latch_error(&self, context: &str) {
        log::error!("queue entered the error state: {}", context);
        self.shared.error.store(true, Ordering::SeqCst);
    }
}

impl Drop for Queue {
    /// Drains already-submitted work, then shuts the channel down.
    fn drop(&mut self) {
        let _ = self.flush_internal();
        let _ = self.sender.send(Job::Shutdown);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::CmdSpan;
    use crate::device::DeviceConfig;
    use crate::image::{
        Image, ImageFlags, ImageFormat, ImageLayout, ImageLayoutConfig, ImageType,
    };
    use crate::state::Primitive;
    use crate::swapchain::SwapchainConfig;
    use ::raw_window_handle::{RawWindowHandle, XlibWindowHandle};

    fn device() -> Device {
        Device::new(DeviceConfig::new())
    }

    fn recorder(device: &Device) -> (MemoryBlock, CommandBuffer) {
        let block = MemoryBlock::new(device, &MemoryBlockConfig::new(0x4000)).unwrap();
        let mut cmdbuf = CommandBuffer::new(device);
        cmdbuf.add_memory(&block, 0, 0x4000).unwrap();
        (block, cmdbuf)
    }

    #[test]
    fn config_validation_rejects_bad_sizing() {
        let device = device();

        let mut config = QueueConfig::new();
        config.flags = QueueFlags::DISABLE_ZCULL;
        assert_eq!(
            Queue::new(&device, &config).err(),
            Some(DriverError::BadInput)
        );

        let mut config = QueueConfig::new();
        config.command_memory_size = 0x1000;
        assert_eq!(
            Queue::new(&device, &config).err(),
            Some(DriverError::BadInput)
        );

        let mut config = QueueConfig::new();
        config.flush_threshold = config.command_memory_size + 1;
        assert_eq!(
            Queue::new(&device, &config).err(),
            Some(DriverError::BadInput)
        );

        let mut config = QueueConfig::new();
        config.per_warp_scratch_memory_size = 0x100;
        assert_eq!(
            Queue::new(&device, &config).err(),
            Some(DriverError::MisalignedSize)
        );
    }

    #[test]
    fn submission_order_implies_completion_order() {
        let device = device();
        let (_block, mut cmdbuf) = recorder(&device);
        let mut queue = Queue::new(&device, &QueueConfig::new()).unwrap();

        let fence_a = Fence::new();
        let fence_b = Fence::new();

        cmdbuf.draw(Primitive::Triangles, 3, 1, 0, 0);
        cmdbuf.signal_fence(&fence_a, false);
        let list_a = cmdbuf.finish_list().unwrap();

        cmdbuf.draw(Primitive::Triangles, 3, 1, 0, 0);
        cmdbuf.signal_fence(&fence_b, false);
        let list_b = cmdbuf.finish_list().unwrap();

        queue.submit_commands(&list_a).unwrap();
        queue.submit_commands(&list_b).unwrap();

        // Waiting on B first must still find A already signaled.
        assert_eq!(fence_b.wait(-1), Ok(()));
        assert_eq!(fence_a.wait(0), Ok(()));
        assert!(!queue.is_in_error_state());
    }

    #[test]
    fn queues_without_graphics_reject_draw_lists() {
        let device = device();
        let (_block, mut cmdbuf) = recorder(&device);
        let mut config = QueueConfig::new();
        config.flags = QueueFlags::COMPUTE | QueueFlags::TRANSFER;
        let mut queue = Queue::new(&device, &config).unwrap();

        cmdbuf.draw(Primitive::Triangles, 3, 1, 0, 0);
        let draw_list = cmdbuf.finish_list().unwrap();
        assert_eq!(
            queue.submit_commands(&draw_list).unwrap_err(),
            DriverError::NotImplemented
        );
        assert!(!queue.is_in_error_state());

        cmdbuf.dispatch_compute(1, 1, 1);
        let compute_list = cmdbuf.finish_list().unwrap();
        queue.submit_commands(&compute_list).unwrap();
        queue.wait_idle().unwrap();
    }

    #[test]
    fn empty_lists_are_a_no_op() {
        let device = device();
        let (_block, mut cmdbuf) = recorder(&device);
        let mut queue = Queue::new(&device, &QueueConfig::new()).unwrap();
        let empty = cmdbuf.finish_list().unwrap();
        assert!(empty.is_empty());
        queue.submit_commands(&empty).unwrap();
        queue.wait_idle().unwrap();
    }

    #[test]
    fn queue_level_fences_signal_through_the_channel() {
        let device = device();
        let mut queue = Queue::new(&device, &QueueConfig::new()).unwrap();
        let fence = Fence::new();
        queue.signal_fence(&fence, true);
        assert_eq!(fence.wait(-1), Ok(()));
        queue.wait_idle().unwrap();
    }

    #[test]
    fn cross_queue_ordering_via_fences() {
        let device = device();
        let (_block, mut cmdbuf) = recorder(&device);
        let mut queue_a = Queue::new(&device, &QueueConfig::new()).unwrap();
        let mut queue_b = Queue::new(&device, &QueueConfig::new()).unwrap();

        let handoff = Fence::new();
        let done = Fence::new();

        // Arm the handoff on A's timeline but keep it batched, so B's
        // encoded wait genuinely blocks.
        queue_a.signal_fence(&handoff, false);

        // B blocks on the handoff fence, then signals completion.
        cmdbuf.wait_fence(&handoff);
        cmdbuf.signal_fence(&done, true);
        let list = cmdbuf.finish_list().unwrap();
        queue_b.submit_commands(&list).unwrap();
        assert_eq!(done.wait(50_000_000), Err(DriverError::Timeout));

        // A delivers the handoff; B must then complete.
        queue_a.flush();
        assert_eq!(done.wait(-1), Ok(()));
    }

    #[test]
    fn malformed_streams_latch_the_error_state() {
        let device = device();
        let block = MemoryBlock::new(&device, &MemoryBlockConfig::new(0x1000)).unwrap();
        let mut queue = Queue::new(&device, &QueueConfig::new()).unwrap();

        // A header with an opcode outside the contract.
        unsafe { block.write_u32(0, 0xFF00_0000) };
        let corrupt = CmdList::from_parts(
            vec![CmdSpan {
                block: block.clone(),
                offset: 0,
                len: 4,
            }],
            Vec::new(),
            Vec::new(),
            ListUsage::empty(),
        );

        queue.submit_commands(&corrupt).unwrap();
        assert_eq!(queue.wait_idle().unwrap_err(), DriverError::Fail);
        assert!(queue.is_in_error_state());

        // Subsequent submissions are refused and pending fences poisoned.
        let (_b2, mut cmdbuf) = recorder(&device);
        cmdbuf.barrier(
            crate::command::BarrierMode::Full,
            crate::command::InvalidateFlags::empty(),
        );
        let list = cmdbuf.finish_list().unwrap();
        assert_eq!(
            queue.submit_commands(&list).unwrap_err(),
            DriverError::BadState
        );

        let fence = Fence::new();
        queue.signal_fence(&fence, true);
        assert_eq!(fence.wait(0), Err(DriverError::Fail));
    }

    #[test]
    fn truncated_payloads_latch_the_error_state() {
        let device = device();
        let block = MemoryBlock::new(&device, &MemoryBlockConfig::new(0x1000)).unwrap();
        let mut queue = Queue::new(&device, &QueueConfig::new()).unwrap();

        // Draw header claiming five payload words with only one present.
        unsafe { block.write_u32(0, (0x40 << 24) | 5) };
        unsafe { block.write_u32(4, 0) };
        let corrupt = CmdList::from_parts(
            vec![CmdSpan {
                block: block.clone(),
                offset: 0,
                len: 8,
            }],
            Vec::new(),
            Vec::new(),
            ListUsage::empty(),
        );
        queue.submit_commands(&corrupt).unwrap();
        assert_eq!(queue.wait_idle().unwrap_err(), DriverError::Fail);
        assert!(queue.is_in_error_state());
    }

    #[test]
    fn acquire_and_present_cycle_slots_through_the_queue() {
        let device = device();
        let mut queue = Queue::new(&device, &QueueConfig::new()).unwrap();

        let mut layout_config = ImageLayoutConfig::new(ImageType::D2, ImageFormat::Rgba8Unorm);
        layout_config.dimensions = [64, 64, 0];
        layout_config.flags = ImageFlags::USAGE_RENDER | ImageFlags::USAGE_PRESENT;
        let layout = ImageLayout::new(&layout_config).unwrap();
        let images: Vec<Image> = (0..2)
            .map(|_| {
                let block = MemoryBlock::new(
                    &device,
                    &MemoryBlockConfig::new(layout.size() as u32 + 0x1000),
                )
                .unwrap();
                Image::new(&layout, &block, 0).unwrap()
            })
            .collect();

        let mut window = XlibWindowHandle::empty();
        window.window = 0x42;
        let swapchain = Swapchain::new(
            &device,
            &SwapchainConfig {
                native_window: RawWindowHandle::Xlib(window),
                images: &images,
            },
        )
        .unwrap();

        // Cycle through more frames than there are slots; presents must
        // recycle them.
        for _frame in 0..6 {
            let slot = queue.acquire_image(&swapchain).unwrap();
            assert!(slot < swapchain.num_images());
            queue.present_image(&swapchain, slot).unwrap();
        }
        queue.wait_idle().unwrap();

        // Presenting a slot that was never acquired is a state error.
        assert_eq!(
            queue.present_image(&swapchain, 0).unwrap_err(),
            DriverError::BadState
        );
    }

    #[test]
    fn flush_threshold_drains_batched_internal_commands() {
        let device = device();
        let mut config = QueueConfig::new();
        config.flush_threshold = 0x40;
        let mut queue = Queue::new(&device, &config).unwrap();

        // Unflushed signals batch until the threshold trips. Encoding 16
        // signals (12 bytes each) crosses the 0x40 threshold repeatedly,
        // so the early fences complete without any explicit flush.
        let fences: Vec<Fence> = (0..16).map(|_| Fence::new()).collect();
        for fence in &fences {
            queue.signal_fence(fence, false);
        }
        assert_eq!(fences[0].wait(5_000_000_000), Ok(()));

        // The tail below the threshold drains on an explicit flush.
        queue.flush();
        for fence in &fences {
            assert_eq!(fence.wait(5_000_000_000), Ok(()));
        }
    }
}
