//! Presentable image rings bound to a native surface.
//!
//! A [`Swapchain`] owns a fixed set of presentable images. Slots cycle
//! through Free → Acquired → PendingPresent and back: acquisition happens
//! CPU-side through `Queue::acquire_image`, and a presented slot returns to
//! the free pool when the queue's worker executes the encoded present.

mod swapchain;

use crate::device::Device;
use crate::image::Image;

use ::{
    raw_window_handle::RawWindowHandle,
    std::sync::{
        atomic::AtomicU32,
        Arc, Condvar, Mutex,
    },
};

/// Configuration for creating a [`Swapchain`].
pub struct SwapchainConfig<'a> {
    /// Opaque handle of the native window the images are presented to.
    pub native_window: RawWindowHandle,

    /// The fixed set of presentable images. Every image must carry the
    /// `USAGE_PRESENT` flag.
    pub images: &'a [Image],
}

/// An ordered set of presentable images bound to a native surface.
pub struct Swapchain {
    /// The device this swapchain was created from.
    #[allow(unused)]
    pub(crate) device: Device,
    pub(crate) state: Arc<SwapchainState>,
    pub(crate) images: Vec<Image>,
    pub(crate) window: RawWindowHandle,
}

/// Lifecycle of one swapchain slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SlotState {
    /// Owned by the display system; available for acquisition.
    Free,
    /// Owned by the application between acquire and present.
    Acquired,
    /// Present encoded but not yet executed by the queue.
    PendingPresent,
}

/// Slot bookkeeping shared with queue workers.
pub(crate) struct SwapchainState {
    pub(crate) slots: Mutex<Vec<SlotState>>,
    pub(crate) available: Condvar,
    pub(crate) swap_interval: AtomicU32,
    pub(crate) crop: Mutex<Crop>,
}

/// Presentation crop rectangle metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) struct Crop {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}
