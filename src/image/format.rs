/// Pixel storage formats.
///
/// Compressed families (DXT/DXN/BC/ASTC) are carried as opaque enumerated
/// layouts: this crate only needs their block geometry for size math, not
/// their compression semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum ImageFormat {
    R8Unorm,
    R8Snorm,
    R8Uint,
    R8Sint,
    R16Float,
    R16Unorm,
    R16Snorm,
    R16Uint,
    R16Sint,
    R32Float,
    R32Uint,
    R32Sint,
    Rg8Unorm,
    Rg8Snorm,
    Rg8Uint,
    Rg8Sint,
    Rg16Float,
    Rg16Unorm,
    Rg16Snorm,
    Rg16Uint,
    Rg16Sint,
    Rg32Float,
    Rg32Uint,
    Rg32Sint,
    Rgb32Float,
    Rgb32Uint,
    Rgb32Sint,
    Rgba8Unorm,
    Rgba8Snorm,
    Rgba8Uint,
    Rgba8Sint,
    Rgba8UnormSrgb,
    Rgbx8Unorm,
    Rgbx8UnormSrgb,
    Bgra8Unorm,
    Bgra8UnormSrgb,
    Bgrx8Unorm,
    Rgba16Float,
    Rgba16Unorm,
    Rgba16Snorm,
    Rgba16Uint,
    Rgba16Sint,
    Rgba32Float,
    Rgba32Uint,
    Rgba32Sint,
    Rgba4Unorm,
    Rgb5Unorm,
    Rgb5A1Unorm,
    Rgb565Unorm,
    Rgb10A2Unorm,
    Rgb10A2Uint,
    Rg11B10Float,
    E5Bgr9Float,

    // Depth/stencil
    S8,
    Z16,
    Z24X8,
    Zf32,
    Z24S8,
    Zf32X24S8,

    // Block-compressed families (opaque layouts)
    RgbDxt1,
    RgbaDxt1,
    RgbaDxt23,
    RgbaDxt45,
    RgbDxt1Srgb,
    RgbaDxt1Srgb,
    RgbaDxt23Srgb,
    RgbaDxt45Srgb,
    RDxn1Unorm,
    RDxn1Snorm,
    RgDxn2Unorm,
    RgDxn2Snorm,
    RgbaBc7Unorm,
    RgbaBc7UnormSrgb,
    RgbaBc6hSf16Float,
    RgbaBc6hUf16Float,
    RgbaAstc4x4,
    RgbaAstc5x5,
    RgbaAstc6x6,
    RgbaAstc8x8,
    RgbaAstc10x10,
    RgbaAstc12x12,
    RgbaAstc4x4Srgb,
    RgbaAstc5x5Srgb,
    RgbaAstc6x6Srgb,
    RgbaAstc8x8Srgb,
    RgbaAstc10x10Srgb,
    RgbaAstc12x12Srgb,
}

/// Storage geometry of a format: bytes per block and block dimensions in
/// pixels. Uncompressed formats are 1x1 blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatInfo {
    pub bytes_per_block: u32,
    pub block_width: u32,
    pub block_height: u32,
    pub has_depth: bool,
    pub has_stencil: bool,
}

impl FormatInfo {
    const fn color(bytes_per_block: u32) -> Self {
        Self {
            bytes_per_block,
            block_width: 1,
            block_height: 1,
            has_depth: false,
            has_stencil: false,
        }
    }

    const fn compressed(bytes_per_block: u32, block_width: u32, block_height: u32) -> Self {
        Self {
            bytes_per_block,
            block_width,
            block_height,
            has_depth: false,
            has_stencil: false,
        }
    }

    const fn depth_stencil(bytes_per_block: u32, has_depth: bool, has_stencil: bool) -> Self {
        Self {
            bytes_per_block,
            block_width: 1,
            block_height: 1,
            has_depth,
            has_stencil,
        }
    }
}

impl ImageFormat {
    /// Storage geometry of this format.
    pub fn info(self) -> FormatInfo {
        use ImageFormat::*;
        match self {
            R8Unorm | R8Snorm | R8Uint | R8Sint => FormatInfo::color(1),
            R16Float | R16Unorm | R16Snorm | R16Uint | R16Sint => FormatInfo::color(2),
            Rg8Unorm | Rg8Snorm | Rg8Uint | Rg8Sint => FormatInfo::color(2),
            Rgba4Unorm | Rgb5Unorm | Rgb5A1Unorm | Rgb565Unorm => FormatInfo::color(2),
            R32Float | R32Uint | R32Sint => FormatInfo::color(4),
            Rg16Float | Rg16Unorm | Rg16Snorm | Rg16Uint | Rg16Sint => FormatInfo::color(4),
            Rgba8Unorm | Rgba8Snorm | Rgba8Uint | Rgba8Sint | Rgba8UnormSrgb => {
                FormatInfo::color(4)
            }
            Rgbx8Unorm | Rgbx8UnormSrgb | Bgra8Unorm | Bgra8UnormSrgb | Bgrx8Unorm => {
                FormatInfo::color(4)
            }
            Rgb10A2Unorm | Rgb10A2Uint | Rg11B10Float | E5Bgr9Float => FormatInfo::color(4),
            Rg32Float | Rg32Uint | Rg32Sint => FormatInfo::color(8),
            Rgba16Float | Rgba16Unorm | Rgba16Snorm | Rgba16Uint | Rgba16Sint => {
                FormatInfo::color(8)
            }
            Rgb32Float | Rgb32Uint | Rgb32Sint => FormatInfo::color(12),
            Rgba32Float | Rgba32Uint | Rgba32Sint => FormatInfo::color(16),

            S8 => FormatInfo::depth_stencil(1, false, true),
            Z16 => FormatInfo::depth_stencil(2, true, false),
            Z24X8 | Zf32 => FormatInfo::depth_stencil(4, true, false),
            Z24S8 => FormatInfo::depth_stencil(4, true, true),
            Zf32X24S8 => FormatInfo::depth_stencil(8, true, true),

            RgbDxt1 | RgbaDxt1 | RgbDxt1Srgb | RgbaDxt1Srgb | RDxn1Unorm | RDxn1Snorm => {
                FormatInfo::compressed(8, 4, 4)
            }
            RgbaDxt23 | RgbaDxt45 | RgbaDxt23Srgb | RgbaDxt45Srgb | RgDxn2Unorm
            | RgDxn2Snorm => FormatInfo::compressed(16, 4, 4),
            RgbaBc7Unorm | RgbaBc7UnormSrgb | RgbaBc6hSf16Float | RgbaBc6hUf16Float => {
                FormatInfo::compressed(16, 4, 4)
            }
            RgbaAstc4x4 | RgbaAstc4x4Srgb => FormatInfo::compressed(16, 4, 4),
            RgbaAstc5x5 | RgbaAstc5x5Srgb => FormatInfo::compressed(16, 5, 5),
            RgbaAstc6x6 | RgbaAstc6x6Srgb => FormatInfo::compressed(16, 6, 6),
            RgbaAstc8x8 | RgbaAstc8x8Srgb => FormatInfo::compressed(16, 8, 8),
            RgbaAstc10x10 | RgbaAstc10x10Srgb => FormatInfo::compressed(16, 10, 10),
            RgbaAstc12x12 | RgbaAstc12x12Srgb => FormatInfo::compressed(16, 12, 12),
        }
    }

    /// True for depth and depth/stencil formats.
    pub fn is_depth_stencil(self) -> bool {
        let info = self.info();
        info.has_depth || info.has_stencil
    }

    /// True for block-compressed formats.
    pub fn is_compressed(self) -> bool {
        self.info().block_width > 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uncompressed_formats_are_single_pixel_blocks() {
        let info = ImageFormat::Rgba8Unorm.info();
        assert_eq!(info.bytes_per_block, 4);
        assert_eq!((info.block_width, info.block_height), (1, 1));
        assert!(!ImageFormat::Rgba8Unorm.is_compressed());
    }

    #[test]
    fn compressed_formats_report_block_geometry() {
        let info = ImageFormat::RgbaDxt1.info();
        assert_eq!(info.bytes_per_block, 8);
        assert_eq!((info.block_width, info.block_height), (4, 4));
        assert!(ImageFormat::RgbaAstc12x12.is_compressed());
        assert_eq!(ImageFormat::RgbaAstc12x12.info().block_width, 12);
    }

    #[test]
    fn depth_stencil_classification() {
        assert!(ImageFormat::Z24S8.is_depth_stencil());
        assert!(ImageFormat::S8.is_depth_stencil());
        assert!(!ImageFormat::R32Float.is_depth_stencil());
        let info = ImageFormat::Zf32X24S8.info();
        assert!(info.has_depth && info.has_stencil);
        assert_eq!(info.bytes_per_block, 8);
    }
}
