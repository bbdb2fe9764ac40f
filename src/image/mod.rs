//! Image layouts, placed images, and reinterpreting views.
//!
//! [`ImageLayout`] computes the physical arrangement of pixel data — sizes,
//! alignment, per-mip offsets — as a pure function of its configuration.
//! [`Image`] places a layout at an offset inside a [`MemoryBlock`], and
//! [`ImageView`] reinterprets an image without touching pixel data.
//!
//! The tiling math in [`layout`](self) is the one place in this crate where
//! bit-exact agreement with the hardware is mandatory; the constants are
//! documented there as the versioned tiling contract.

mod format;
mod image;
mod image_view;
mod layout;

pub use format::{FormatInfo, ImageFormat};

use crate::memory::MemoryBlock;

use ::bitflags::bitflags;

/// Dimensionality and arrangement of an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ImageType {
    D1 = 1,
    D2 = 2,
    D3 = 3,
    D1Array = 4,
    D2Array = 5,
    D2Ms = 6,
    D2MsArray = 7,
    Rectangle = 8,
    Cubemap = 9,
    CubemapArray = 10,
    Buffer = 11,
}

impl ImageType {
    /// True when layers come from the configuration.
    pub fn is_array(self) -> bool {
        matches!(
            self,
            ImageType::D1Array
                | ImageType::D2Array
                | ImageType::D2MsArray
                | ImageType::CubemapArray
        )
    }

    /// True for multisampled types.
    pub fn is_multisampled(self) -> bool {
        matches!(self, ImageType::D2Ms | ImageType::D2MsArray)
    }
}

/// Multisample mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum MsMode {
    X1 = 0,
    X2 = 1,
    X4 = 2,
    X8 = 3,
}

impl MsMode {
    /// Sample footprint in (x, y) pixels.
    pub(crate) fn sample_dims(self) -> (u32, u32) {
        match self {
            MsMode::X1 => (1, 1),
            MsMode::X2 => (2, 1),
            MsMode::X4 => (2, 2),
            MsMode::X8 => (4, 2),
        }
    }
}

/// Tile height of a block-linear image, in GOBs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum TileSize {
    OneGob = 0,
    TwoGobs = 1,
    FourGobs = 2,
    EightGobs = 3,
    SixteenGobs = 4,
    ThirtyTwoGobs = 5,
}

impl TileSize {
    /// The tile height in GOBs.
    pub fn gobs(self) -> u32 {
        1 << self as u32
    }
}

/// Source channel selector for view swizzling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum Swizzle {
    Zero = 0,
    One = 1,
    Red = 2,
    Green = 3,
    Blue = 4,
    Alpha = 5,
}

/// Which aspect a view of a combined depth/stencil image reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum DsSource {
    Depth = 0,
    Stencil = 1,
}

bitflags! {
    /// Image layout and usage flags.
    ///
    /// Block-linear tiling is the default; `PITCH_LINEAR` opts into
    /// row-major storage with an explicit stride.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ImageFlags: u32 {
        /// Store in pitch-linear (row-major) layout.
        const PITCH_LINEAR = 1 << 0;
        /// Use the tile size from the configuration instead of deriving it.
        const CUSTOM_TILE_SIZE = 1 << 1;
        /// Hardware framebuffer compression may be enabled.
        const HW_COMPRESSION = 1 << 2;
        /// Prefer zero-bandwidth clears for Z16 images.
        const D16_ENABLE_ZBC = 1 << 3;
        /// Image will be bound as a render target.
        const USAGE_RENDER = 1 << 8;
        /// Image will be used with shader image load/store.
        const USAGE_LOAD_STORE = 1 << 9;
        /// Image will be presented through a swapchain.
        const USAGE_PRESENT = 1 << 10;
        /// Image will be used with the 2D transfer engine.
        const USAGE_2D_ENGINE = 1 << 11;
        /// Image will be used by video encode/decode engines.
        const USAGE_VIDEO = 1 << 12;
    }
}

/// Configuration for computing an [`ImageLayout`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageLayoutConfig {
    pub ty: ImageType,
    pub flags: ImageFlags,
    pub format: ImageFormat,
    pub ms_mode: MsMode,
    /// Width, height, and depth-or-layer-count depending on the type.
    pub dimensions: [u32; 3],
    pub mip_levels: u32,
    /// Row stride in bytes; read only with `PITCH_LINEAR`.
    pub pitch_stride: u32,
    /// Tile height; read only with `CUSTOM_TILE_SIZE`.
    pub tile_size: TileSize,
}

impl ImageLayoutConfig {
    /// A single-mip 2D configuration of the given format.
    pub fn new(ty: ImageType, format: ImageFormat) -> Self {
        Self {
            ty,
            flags: ImageFlags::empty(),
            format,
            ms_mode: MsMode::X1,
            dimensions: [0, 0, 0],
            mip_levels: 1,
            pitch_stride: 0,
            tile_size: TileSize::SixteenGobs,
        }
    }
}

/// Physical storage arrangement of an image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tiling {
    /// GPU-native tiled layout; tile height in GOBs.
    BlockLinear { tile_height_gobs: u32 },
    /// Row-major layout with an explicit byte stride.
    PitchLinear { stride: u32 },
}

/// The computed physical layout of pixel data.
///
/// A pure function of its configuration: two layouts computed from
/// identical configurations are layout-compatible and compare equal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageLayout {
    pub(crate) ty: ImageType,
    pub(crate) format: ImageFormat,
    pub(crate) flags: ImageFlags,
    pub(crate) ms_mode: MsMode,
    pub(crate) dimensions: [u32; 3],
    pub(crate) mip_levels: u32,
    pub(crate) tiling: Tiling,
    pub(crate) layers: u32,
    pub(crate) mip_offsets: Vec<u64>,
    pub(crate) layer_size: u64,
    pub(crate) size: u64,
    pub(crate) alignment: u32,
}

/// An [`ImageLayout`] placed at a byte offset inside a memory block.
///
/// The block handle is a non-owning back-reference in spirit: the image
/// never frees the block, it only keeps it alive.
#[derive(Debug, Clone)]
pub struct Image {
    pub(crate) layout: ImageLayout,
    pub(crate) block: MemoryBlock,
    pub(crate) offset: u32,
}

/// A reinterpretation window over an [`Image`].
///
/// Views never copy pixel data; they override how existing data is read:
/// type, format, per-channel swizzle, depth/stencil aspect, and mip/layer
/// subranges (a count of zero means "the full remaining range").
#[derive(Debug, Clone, Copy)]
pub struct ImageView<'a> {
    pub image: &'a Image,
    pub type_override: Option<ImageType>,
    pub format_override: Option<ImageFormat>,
    pub swizzle: [Swizzle; 4],
    pub ds_source: DsSource,
    pub layer_offset: u16,
    /// Zero selects all layers from `layer_offset` on.
    pub layer_count: u16,
    pub mip_level_offset: u8,
    /// Zero selects all levels from `mip_level_offset` on.
    pub mip_level_count: u8,
}
