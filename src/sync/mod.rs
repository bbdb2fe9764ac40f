//! CPU/GPU synchronization primitives.
//!
//! The only CPU-visible blocking point in this crate is [`Fence::wait`]
//! (and `Queue::wait_idle`, which is built on it). Everything else —
//! encoded fence commands, barriers — takes effect on the GPU timeline.

mod fence;

pub use fence::Fence;
