use crate::state::CompareOp;

/// Texel filter for minification and magnification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum Filter {
    Nearest = 1,
    Linear = 2,
}

/// Filter applied between mip levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum MipFilter {
    None = 1,
    Nearest = 2,
    Linear = 3,
}

/// Coordinate wrapping outside [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum WrapMode {
    Repeat = 0,
    MirroredRepeat = 1,
    ClampToEdge = 2,
    ClampToBorder = 3,
    Clamp = 4,
    MirrorClampToEdge = 5,
    MirrorClampToBorder = 6,
    MirrorClamp = 7,
}

/// How multiple samples combine in one fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum SamplerReduction {
    WeightedAverage = 0,
    Min = 1,
    Max = 2,
}

/// Border color used by the clamp-to-border wrap modes, typed to match the
/// sampled format class.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BorderColor {
    Float([f32; 4]),
    Int([i32; 4]),
    Uint([u32; 4]),
}

impl BorderColor {
    /// The raw component words as stored in the descriptor.
    pub(crate) fn raw_words(&self) -> [u32; 4] {
        match *self {
            BorderColor::Float(values) => [
                values[0].to_bits(),
                values[1].to_bits(),
                values[2].to_bits(),
                values[3].to_bits(),
            ],
            BorderColor::Int(values) => [
                values[0] as u32,
                values[1] as u32,
                values[2] as u32,
                values[3] as u32,
            ],
            BorderColor::Uint(values) => values,
        }
    }
}

/// Sampler configuration value object.
///
/// Immutable by convention: build one, tweak fields, encode it into a
/// [`SamplerDescriptor`](crate::descriptor::SamplerDescriptor).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sampler {
    pub min_filter: Filter,
    pub mag_filter: Filter,
    pub mip_filter: MipFilter,
    pub wrap_mode: [WrapMode; 3],
    pub lod_clamp_min: f32,
    pub lod_clamp_max: f32,
    pub lod_bias: f32,
    pub lod_snap: f32,
    pub compare_enable: bool,
    pub compare_op: CompareOp,
    pub border_color: BorderColor,
    pub max_anisotropy: f32,
    pub reduction_mode: SamplerReduction,
}

impl Default for Sampler {
    fn default() -> Self {
        Self {
            min_filter: Filter::Nearest,
            mag_filter: Filter::Nearest,
            mip_filter: MipFilter::None,
            wrap_mode: [WrapMode::Repeat; 3],
            lod_clamp_min: 0.0,
            lod_clamp_max: 1000.0,
            lod_bias: 0.0,
            lod_snap: 0.0,
            compare_enable: false,
            compare_op: CompareOp::Less,
            border_color: BorderColor::Uint([0; 4]),
            max_anisotropy: 1.0,
            reduction_mode: SamplerReduction::WeightedAverage,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_sampler_is_nearest_repeat() {
        let sampler = Sampler::default();
        assert_eq!(sampler.min_filter, Filter::Nearest);
        assert_eq!(sampler.mip_filter, MipFilter::None);
        assert_eq!(sampler.wrap_mode, [WrapMode::Repeat; 3]);
        assert_eq!(sampler.lod_clamp_max, 1000.0);
        assert!(!sampler.compare_enable);
        assert_eq!(sampler.max_anisotropy, 1.0);
    }

    #[test]
    fn border_color_words_preserve_the_bit_patterns() {
        assert_eq!(
            BorderColor::Float([1.0, 0.0, 0.0, 1.0]).raw_words(),
            [1.0f32.to_bits(), 0, 0, 1.0f32.to_bits()]
        );
        assert_eq!(
            BorderColor::Int([-1, 0, 1, 2]).raw_words(),
            [0xFFFF_FFFF, 0, 1, 2]
        );
    }
}
