//! A low-level graphics/compute command API sitting directly above a GPU
//! kernel channel: record binary command streams on a single CPU thread,
//! submit them to hardware queues, and synchronize CPU/GPU progress with
//! fences — no driver-side scheduler, no hazard tracking, no hidden
//! allocations.

mod errors;

pub mod command;
pub mod descriptor;
pub mod device;
pub mod image;
pub mod limits;
pub mod logging;
pub mod memory;
pub mod queue;
pub mod shader;
pub mod state;
pub mod swapchain;
pub mod sync;

pub use errors::{DriverError, DriverResult};
pub use limits::{GpuAddr, GPU_ADDR_INVALID};
