use super::{
    ImageFlags, ImageFormat, ImageLayout, ImageLayoutConfig, ImageType, MsMode, Tiling,
};
use crate::errors::{DriverError, DriverResult};
use crate::limits::{align_up_u64, is_aligned_u32, IMAGE_LINEAR_STRIDE_ALIGNMENT};

// Tiling contract, version 1.
//
// A GOB is 64 bytes wide and 8 rows tall. Block-linear images pack GOBs
// into blocks one GOB wide and `tile_height_gobs` GOBs tall; blocks walk
// the image row-major. The tile height is reduced per mip level while half
// the tile still covers the level. These constants and rules are the
// wire-level layout agreement with the memory scanout and sampling units;
// any change is a format break.
const GOB_WIDTH_BYTES: u32 = 64;
const GOB_HEIGHT_ROWS: u32 = 8;
const GOB_SIZE_BYTES: u32 = 512;

/// Largest tile height (in GOBs) the layout picker chooses on its own;
/// `CUSTOM_TILE_SIZE` may go up to 32.
const MAX_AUTO_TILE_GOBS: u32 = 16;

/// Largest dimension accepted on any axis.
const MAX_IMAGE_DIMENSION: u32 = 0x10000;

fn div_ceil_u32(a: u32, b: u32) -> u32 {
    (a + b - 1) / b
}

impl ImageLayout {
    /// Compute the physical layout described by `config`.
    ///
    /// Pure: the result depends only on the configuration fields.
    pub fn new(config: &ImageLayoutConfig) -> DriverResult<Self> {
        let extent = Extent::resolve(config)?;

        if config.mip_levels == 0 {
            return Err(DriverError::BadInput);
        }
        let max_extent = extent.width.max(extent.height).max(extent.depth);
        let max_mips = 32 - max_extent.leading_zeros();
        if config.mip_levels > max_mips {
            return Err(DriverError::BadInput);
        }

        if config.flags.contains(ImageFlags::PITCH_LINEAR) {
            Self::new_pitch_linear(config, &extent)
        } else if config.ty == ImageType::Buffer {
            Self::new_buffer(config, &extent)
        } else {
            Self::new_block_linear(config, &extent)
        }
    }

    fn new_pitch_linear(config: &ImageLayoutConfig, extent: &Extent) -> DriverResult<Self> {
        match config.ty {
            ImageType::D1 | ImageType::D2 | ImageType::Rectangle => {}
            _ => return Err(DriverError::BadInput),
        }
        if config.mip_levels != 1 {
            return Err(DriverError::BadInput);
        }

        let info = config.format.info();
        let row_bytes = div_ceil_u32(extent.width, info.block_width) * info.bytes_per_block;
        let rows = div_ceil_u32(extent.height, info.block_height);

        let stride = config.pitch_stride;
        if !is_aligned_u32(stride, IMAGE_LINEAR_STRIDE_ALIGNMENT) {
            return Err(DriverError::MisalignedSize);
        }
        if stride < row_bytes {
            return Err(DriverError::BadInput);
        }

        let size = u64::from(stride) * u64::from(rows);
        Ok(Self {
            ty: config.ty,
            format: config.format,
            flags: config.flags,
            ms_mode: config.ms_mode,
            dimensions: config.dimensions,
            mip_levels: 1,
            tiling: Tiling::PitchLinear { stride },
            layers: 1,
            mip_offsets: vec![0],
            layer_size: size,
            size,
            alignment: IMAGE_LINEAR_STRIDE_ALIGNMENT,
        })
    }

    fn new_buffer(config: &ImageLayoutConfig, extent: &Extent) -> DriverResult<Self> {
        if config.mip_levels != 1 {
            return Err(DriverError::BadInput);
        }
        let info = config.format.info();
        let size = u64::from(extent.width) * u64::from(info.bytes_per_block);
        Ok(Self {
            ty: config.ty,
            format: config.format,
            flags: config.flags,
            ms_mode: config.ms_mode,
            dimensions: config.dimensions,
            mip_levels: 1,
            tiling: Tiling::PitchLinear {
                stride: extent.width * info.bytes_per_block,
            },
            layers: 1,
            mip_offsets: vec![0],
            layer_size: size,
            size,
            alignment: IMAGE_LINEAR_STRIDE_ALIGNMENT,
        })
    }

    fn new_block_linear(config: &ImageLayoutConfig, extent: &Extent) -> DriverResult<Self> {
        let info = config.format.info();

        let base_rows = div_ceil_u32(extent.height, info.block_height);
        let tile_height_gobs = if config.flags.contains(ImageFlags::CUSTOM_TILE_SIZE) {
            config.tile_size.gobs()
        } else {
            auto_tile_height(base_rows)
        };

        let mut mip_offsets = Vec::with_capacity(config.mip_levels as usize);
        let mut cursor: u64 = 0;
        for level in 0..config.mip_levels {
            let width = (extent.width >> level).max(1);
            let height = (extent.height >> level).max(1);
            let depth = (extent.depth >> level).max(1);

            let row_bytes = div_ceil_u32(width, info.block_width) * info.bytes_per_block;
            let rows = div_ceil_u32(height, info.block_height);
            let level_tile = reduce_tile_height(tile_height_gobs, rows);

            let gobs_x = div_ceil_u32(row_bytes, GOB_WIDTH_BYTES);
            let gobs_y = div_ceil_u32(rows, GOB_HEIGHT_ROWS);
            let blocks_y = div_ceil_u32(gobs_y, level_tile);

            let slice_size = u64::from(gobs_x)
                * u64::from(blocks_y)
                * u64::from(level_tile)
                * u64::from(GOB_SIZE_BYTES);

            mip_offsets.push(cursor);
            cursor += slice_size * u64::from(depth);
        }

        let block_size = u64::from(GOB_SIZE_BYTES) * u64::from(tile_height_gobs);
        let layer_size = align_up_u64(cursor, block_size);
        let size = layer_size * u64::from(extent.layers);

        let mut alignment = GOB_SIZE_BYTES * tile_height_gobs;
        if config
            .flags
            .intersects(ImageFlags::USAGE_RENDER | ImageFlags::USAGE_PRESENT)
        {
            alignment = alignment.max(0x1000);
        }

        Ok(Self {
            ty: config.ty,
            format: config.format,
            flags: config.flags,
            ms_mode: config.ms_mode,
            dimensions: config.dimensions,
            mip_levels: config.mip_levels,
            tiling: Tiling::BlockLinear { tile_height_gobs },
            layers: extent.layers,
            mip_offsets,
            layer_size,
            size,
            alignment,
        })
    }

    /// Total storage size in bytes.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Required base address alignment.
    pub fn alignment(&self) -> u32 {
        self.alignment
    }

    /// Number of mip levels.
    pub fn mip_levels(&self) -> u32 {
        self.mip_levels
    }

    /// Number of array layers (1 for non-array types; 6 per cubemap).
    pub fn layers(&self) -> u32 {
        self.layers
    }

    /// Byte offset of a mip level within one layer.
    pub fn mip_offset(&self, level: u32) -> Option<u64> {
        self.mip_offsets.get(level as usize).copied()
    }

    /// Byte size of one array layer including all its mip levels.
    pub fn layer_size(&self) -> u64 {
        self.layer_size
    }

    /// The physical tiling arrangement.
    pub fn tiling(&self) -> &Tiling {
        &self.tiling
    }

    /// Row stride for pitch-linear layouts.
    pub fn row_stride(&self) -> Option<u32> {
        match self.tiling {
            Tiling::PitchLinear { stride } => Some(stride),
            Tiling::BlockLinear { .. } => None,
        }
    }

    /// The pixel format.
    pub fn format(&self) -> ImageFormat {
        self.format
    }

    /// The image type.
    pub fn image_type(&self) -> ImageType {
        self.ty
    }

    /// The configured dimensions.
    pub fn dimensions(&self) -> [u32; 3] {
        self.dimensions
    }
}

/// Resolved extent of mip level zero plus the layer count.
struct Extent {
    width: u32,
    height: u32,
    depth: u32,
    layers: u32,
}

impl Extent {
    fn resolve(config: &ImageLayoutConfig) -> DriverResult<Self> {
        let [d0, d1, d2] = config.dimensions;
        let ty = config.ty;

        let (mut width, mut height, depth, layers) = match ty {
            ImageType::D1 | ImageType::Buffer => (d0, 1, 1, 1),
            ImageType::D1Array => (d0, 1, 1, d1),
            ImageType::D2 | ImageType::Rectangle | ImageType::D2Ms => (d0, d1, 1, 1),
            ImageType::D2Array | ImageType::D2MsArray => (d0, d1, 1, d2),
            ImageType::D3 => (d0, d1, d2, 1),
            ImageType::Cubemap => (d0, d1, 1, 6),
            ImageType::CubemapArray => (d0, d1, 1, d2.checked_mul(6).unwrap_or(0)),
        };

        if width == 0 || height == 0 || depth == 0 || layers == 0 {
            return Err(DriverError::BadInput);
        }
        if width > MAX_IMAGE_DIMENSION
            || height > MAX_IMAGE_DIMENSION
            || depth > MAX_IMAGE_DIMENSION
            || layers > MAX_IMAGE_DIMENSION
        {
            return Err(DriverError::BadInput);
        }
        if matches!(ty, ImageType::Cubemap | ImageType::CubemapArray) && width != height {
            return Err(DriverError::BadInput);
        }

        if config.ms_mode != MsMode::X1 && !ty.is_multisampled() {
            return Err(DriverError::BadInput);
        }
        if ty.is_multisampled() {
            if config.mip_levels != 1 {
                return Err(DriverError::BadInput);
            }
            let (sx, sy) = config.ms_mode.sample_dims();
            width *= sx;
            height *= sy;
        }

        Ok(Self {
            width,
            height,
            depth,
            layers,
        })
    }
}

/// Pick the tile height for mip level zero: the smallest power of two of
/// GOB rows that covers the image height, clamped to the auto maximum.
fn auto_tile_height(rows: u32) -> u32 {
    let ideal = div_ceil_u32(rows, GOB_HEIGHT_ROWS);
    ideal.next_power_of_two().min(MAX_AUTO_TILE_GOBS)
}

/// Shrink the tile height for small mip levels: halve while half the tile
/// still covers the level.
fn reduce_tile_height(mut tile_gobs: u32, rows: u32) -> u32 {
    while tile_gobs > 1 && (tile_gobs / 2) * GOB_HEIGHT_ROWS >= rows {
        tile_gobs /= 2;
    }
    tile_gobs
}
