//! Pipeline state and transfer-operation value objects.
//!
//! These are plain immutable configuration values with explicit defaults.
//! Their hardware bit packing is an encoder-internal detail; nothing here
//! exposes a wire layout except the `#[repr(C)]` indirect-argument structs,
//! which the GPU reads directly from buffer memory.

mod depth_stencil;
mod rasterizer;
mod vertex;

pub use depth_stencil::{DepthStencilState, StencilOp};
pub use rasterizer::{DepthBias, Face, FrontFace, PolygonMode, RasterizerState};
pub use vertex::{VtxAttribSize, VtxAttribState, VtxAttribType, VtxBufferState};

use crate::limits::GpuAddr;

use ::{bytemuck::{Pod, Zeroable}, static_assertions::const_assert_eq};

/// Comparison function shared by depth, stencil, and sampler compare ops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum CompareOp {
    Never = 1,
    Less = 2,
    Equal = 3,
    Lequal = 4,
    Greater = 5,
    NotEqual = 6,
    Gequal = 7,
    Always = 8,
}

/// Primitive topology for draw commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum Primitive {
    Points = 0,
    Lines = 1,
    LineLoop = 2,
    LineStrip = 3,
    Triangles = 4,
    TriangleStrip = 5,
    TriangleFan = 6,
    Quads = 7,
    QuadStrip = 8,
    Polygon = 9,
    LinesAdjacency = 10,
    LineStripAdjacency = 11,
    TrianglesAdjacency = 12,
    TriangleStripAdjacency = 13,
    Patches = 14,
}

/// Element width of an index buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum IdxFormat {
    Uint8 = 0,
    Uint16 = 1,
    Uint32 = 2,
}

/// Tiled-cache control operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum TiledCacheOp {
    Disable = 0,
    Enable = 1,
    Flush = 2,
    FlushAlt = 3,
    UnkDisable = 4,
    UnkEnable = 5,
}

/// A GPU buffer address range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufExtents {
    pub addr: GpuAddr,
    pub size: u32,
}

impl BufExtents {
    pub fn new(addr: GpuAddr, size: u32) -> Self {
        Self { addr, size }
    }
}

/// A viewport rectangle with depth range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width: 0.0,
            height: 0.0,
            near: 0.0,
            far: 1.0,
        }
    }
}

/// A scissor rectangle in integer window coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Scissor {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// A 3D region of an image used by copy and blit commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BlitRect {
    pub x: u32,
    pub y: u32,
    pub z: u32,
    pub width: u32,
    pub height: u32,
    pub depth: u32,
}

/// Addressing of linear buffer data in buffer↔image copies.
///
/// `row_length` and `image_height` of zero mean tightly packed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CopyBufLayout {
    pub addr: GpuAddr,
    pub row_length: u32,
    pub image_height: u32,
}

impl CopyBufLayout {
    pub fn new(addr: GpuAddr) -> Self {
        Self {
            addr,
            row_length: 0,
            image_height: 0,
        }
    }
}

/// Arguments of an indirect (GPU-sourced) draw, as laid out in memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Pod, Zeroable)]
#[repr(C)]
pub struct DrawIndirectData {
    pub vertex_count: u32,
    pub instance_count: u32,
    pub first_vertex: u32,
    pub first_instance: u32,
}

/// Arguments of an indirect indexed draw, as laid out in memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Pod, Zeroable)]
#[repr(C)]
pub struct DrawIndexedIndirectData {
    pub index_count: u32,
    pub instance_count: u32,
    pub first_index: u32,
    pub vertex_offset: i32,
    pub first_instance: u32,
}

/// Arguments of an indirect compute dispatch, as laid out in memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Pod, Zeroable)]
#[repr(C)]
pub struct DispatchIndirectData {
    pub num_groups_x: u32,
    pub num_groups_y: u32,
    pub num_groups_z: u32,
}

const_assert_eq!(::std::mem::size_of::<DrawIndirectData>(), 16);
const_assert_eq!(::std::mem::size_of::<DrawIndexedIndirectData>(), 20);
const_assert_eq!(::std::mem::size_of::<DispatchIndirectData>(), 12);

bitflags::bitflags! {
    /// Flags controlling image copy and blit commands.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct BlitFlags: u32 {
        /// Mirror the X axis (image sources only).
        const FLIP_X = 1 << 0;
        /// Mirror the Y axis.
        const FLIP_Y = 1 << 1;
        /// Mirror the Z axis.
        const FLIP_Z = 1 << 2;
        /// Sample with linear filtering instead of nearest.
        const FILTER_LINEAR = 1 << 4;
        /// Alpha-mask blit mode.
        const MODE_ALPHA_MASK = 1 << 5;
        /// Alpha-blend blit mode.
        const MODE_ALPHA_BLEND = 2 << 5;
        /// Premultiplied blit mode.
        const MODE_PREMULT_BLIT = 3 << 5;
        /// Premultiplied blend mode.
        const MODE_PREMULT_BLEND = 4 << 5;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn viewport_default_covers_full_depth_range() {
        let viewport = Viewport::default();
        assert_eq!(viewport.near, 0.0);
        assert_eq!(viewport.far, 1.0);
    }

    #[test]
    fn indirect_argument_structs_have_no_padding() {
        // The GPU reads these verbatim from buffer memory.
        assert_eq!(std::mem::size_of::<DrawIndirectData>(), 4 * 4);
        assert_eq!(std::mem::size_of::<DrawIndexedIndirectData>(), 5 * 4);
        assert_eq!(std::mem::size_of::<DispatchIndirectData>(), 3 * 4);
    }
}
