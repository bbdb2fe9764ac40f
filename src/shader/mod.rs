//! Opaque pre-compiled shader references.
//!
//! Shader compilation is out of scope for this crate: a [`Shader`] is a
//! validated reference to pre-compiled machine code that the caller has
//! already placed inside a code memory block. It exists so that
//! `CommandBuffer::bind_shaders` has something typed to bind.

mod shader;

use crate::memory::MemoryBlock;

use ::bitflags::bitflags;

/// A programmable pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum Stage {
    Vertex = 0,
    TessCtrl = 1,
    TessEval = 2,
    Geometry = 3,
    Fragment = 4,
    Compute = 5,
}

bitflags! {
    /// A set of pipeline stages.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct StageFlags: u32 {
        const VERTEX = 1 << 0;
        const TESS_CTRL = 1 << 1;
        const TESS_EVAL = 1 << 2;
        const GEOMETRY = 1 << 3;
        const FRAGMENT = 1 << 4;
        const COMPUTE = 1 << 5;
    }
}

impl StageFlags {
    /// All graphics stages (everything except compute).
    pub const GRAPHICS_MASK: StageFlags = StageFlags::VERTEX
        .union(StageFlags::TESS_CTRL)
        .union(StageFlags::TESS_EVAL)
        .union(StageFlags::GEOMETRY)
        .union(StageFlags::FRAGMENT);
}

impl Stage {
    /// The single-stage flag for this stage.
    pub fn flag(self) -> StageFlags {
        StageFlags::from_bits_truncate(1 << self as u32)
    }
}

/// Configuration for creating a [`Shader`].
pub struct ShaderConfig {
    /// Code memory block holding the pre-compiled machine code.
    pub code_mem: MemoryBlock,

    /// Byte offset of the code within the block; must be 0x100-aligned.
    pub code_offset: u32,

    /// Size of the machine code in bytes.
    pub code_size: u32,

    /// The stage this shader executes at.
    pub stage: Stage,

    /// Hardware program slot, for callers managing several programs in one
    /// code block.
    pub program_id: u32,
}

/// A validated reference to pre-compiled shader code.
#[derive(Clone)]
pub struct Shader {
    pub(crate) code_mem: MemoryBlock,
    pub(crate) code_offset: u32,
    pub(crate) stage: Stage,
    pub(crate) program_id: u32,
}
