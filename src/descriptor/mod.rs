//! The bindless resource descriptor model.
//!
//! Descriptors are fixed 32-byte binary records written into descriptor-set
//! memory (an array inside a [`MemoryBlock`](crate::memory::MemoryBlock))
//! and referenced from shader code purely by integer index through a packed
//! [`ResHandle`]. The hardware binds one set base address and indexes into
//! it, which decouples the number of usable resources from any per-stage
//! binding-unit limit.
//!
//! By convention index 0 of each set is left unused so that a zero handle
//! means "no binding".

mod handle;
mod image_descriptor;
mod sampler;
mod sampler_descriptor;

pub use handle::{make_image_handle, make_sampler_handle, make_texture_handle, ResHandle};
pub use sampler::{BorderColor, Filter, MipFilter, Sampler, SamplerReduction, WrapMode};

use ::{
    bytemuck::{Pod, Zeroable},
    static_assertions::const_assert_eq,
};

/// A 32-byte image descriptor record.
///
/// The bit layout is an internal versioned contract between
/// [`ImageDescriptor::new`] and the sampling hardware; size, alignment, and
/// indexing semantics are the public contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(C, align(32))]
pub struct ImageDescriptor {
    pub(crate) words: [u32; 8],
}

/// A 32-byte sampler descriptor record.
///
/// Same contract split as [`ImageDescriptor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(C, align(32))]
pub struct SamplerDescriptor {
    pub(crate) words: [u32; 8],
}

// Descriptors are raw words with no padding; the GPU reads them verbatim
// from descriptor-set memory.
unsafe impl Zeroable for ImageDescriptor {}
unsafe impl Pod for ImageDescriptor {}
unsafe impl Zeroable for SamplerDescriptor {}
unsafe impl Pod for SamplerDescriptor {}

const_assert_eq!(::std::mem::size_of::<ImageDescriptor>(), 32);
const_assert_eq!(::std::mem::align_of::<ImageDescriptor>(), 32);
const_assert_eq!(::std::mem::size_of::<SamplerDescriptor>(), 32);
const_assert_eq!(::std::mem::align_of::<SamplerDescriptor>(), 32);
