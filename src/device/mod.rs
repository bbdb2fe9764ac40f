//! The process-wide GPU context.
//!
//! A [`Device`] bundles the caller-injected host allocator and error
//! callback with the global rendering conventions (depth range, viewport
//! origin) and the GPU virtual address space. Every other object in this
//! crate is created *from* a device but is not owned by it; children keep
//! the device alive by holding a clone of the handle.

mod device;
mod host_allocator;

pub use host_allocator::{create_default_allocator, HostAllocator, SystemAllocator};

use crate::errors::DriverError;
use crate::limits::GpuAddr;

use ::std::sync::{Arc, Mutex};

/// Convention for the clip-space depth range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DepthMode {
    /// Depth values in [0, 1]. The default.
    ZeroToOne,
    /// Depth values in [-1, 1].
    NegativeOneToOne,
}

/// Convention for the window-space origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OriginMode {
    /// Origin at the upper-left corner. The default.
    UpperLeft,
    /// Origin at the lower-left corner.
    LowerLeft,
}

/// Callback invoked for conditions the caller cannot locally recover from.
///
/// Receives a short context string naming the failing operation and the
/// failure code. The default behavior (no callback installed) logs the
/// condition and aborts the process.
pub type ErrorCallback = Arc<dyn Fn(&str, DriverError) + Send + Sync>;

/// Configuration for creating a [`Device`].
///
/// All fields have usable defaults; construct with [`DeviceConfig::new`]
/// and overwrite what you need.
pub struct DeviceConfig {
    /// Host memory allocator used for every CPU-side backing allocation.
    pub allocator: Arc<dyn HostAllocator>,

    /// Error callback for unrecoverable misuse. `None` selects the fatal
    /// default handler.
    pub error_callback: Option<ErrorCallback>,

    /// Clip-space depth range convention.
    pub depth_mode: DepthMode,

    /// Window-space origin convention.
    pub origin_mode: OriginMode,
}

/// The process-wide GPU context. Cheap to clone; all clones refer to the
/// same underlying device.
#[derive(Clone)]
pub struct Device {
    pub(crate) inner: Arc<DeviceInner>,
}

pub(crate) struct DeviceInner {
    pub(crate) allocator: Arc<dyn HostAllocator>,
    pub(crate) error_callback: Option<ErrorCallback>,
    pub(crate) depth_mode: DepthMode,
    pub(crate) origin_mode: OriginMode,
    pub(crate) address_space: Mutex<AddressSpace>,
}

/// Bump allocator for GPU virtual address ranges.
///
/// Addresses are handed out once and never reused; blocks are small in
/// number and the 40-bit address space gives headroom measured in years of
/// allocation churn.
pub(crate) struct AddressSpace {
    next: GpuAddr,
}
