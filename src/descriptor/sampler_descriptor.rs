use super::{Sampler, SamplerDescriptor};

/// Convert an LOD value to the hardware's signed 8.8 fixed-point field.
fn lod_fixed_8_8(value: f32) -> u32 {
    let clamped = value.max(-128.0).min(127.996);
    ((clamped * 256.0) as i32 as u32) & 0xFFFF
}

impl SamplerDescriptor {
    /// Encode a sampler configuration into its 32-byte descriptor record.
    ///
    /// Record layout, version 1: word 0 packs filters, wraps, compare, and
    /// reduction; word 1 the LOD clamp range in 8.8 fixed point; word 2 the
    /// LOD bias and snap; word 3 the anisotropy; words 4-7 the border
    /// color.
    pub fn new(sampler: &Sampler) -> Self {
        let mut word0 = 0u32;
        word0 |= sampler.min_filter as u32;
        word0 |= (sampler.mag_filter as u32) << 2;
        word0 |= (sampler.mip_filter as u32) << 4;
        word0 |= (sampler.wrap_mode[0] as u32) << 6;
        word0 |= (sampler.wrap_mode[1] as u32) << 9;
        word0 |= (sampler.wrap_mode[2] as u32) << 12;
        word0 |= (sampler.compare_enable as u32) << 15;
        word0 |= (sampler.compare_op as u32) << 16;
        word0 |= (sampler.reduction_mode as u32) << 20;

        let word1 = lod_fixed_8_8(sampler.lod_clamp_min) | lod_fixed_8_8(sampler.lod_clamp_max) << 16;
        let word2 = lod_fixed_8_8(sampler.lod_bias) | lod_fixed_8_8(sampler.lod_snap) << 16;
        let word3 = sampler.max_anisotropy.to_bits();
        let border = sampler.border_color.raw_words();

        Self {
            words: [
                word0, word1, word2, word3, border[0], border[1], border[2], border[3],
            ],
        }
    }

    /// The record as bytes, ready to copy into descriptor-set memory.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{BorderColor, Filter, MipFilter, WrapMode};

    #[test]
    fn encoding_is_deterministic_and_32_bytes() {
        let a = SamplerDescriptor::new(&Sampler::default());
        let b = SamplerDescriptor::new(&Sampler::default());
        assert_eq!(a, b);
        assert_eq!(a.as_bytes().len(), 32);
    }

    #[test]
    fn filters_and_wraps_land_in_word_zero() {
        let mut sampler = Sampler::default();
        sampler.min_filter = Filter::Linear;
        sampler.mag_filter = Filter::Linear;
        sampler.mip_filter = MipFilter::Linear;
        sampler.wrap_mode = [WrapMode::ClampToEdge; 3];
        let descriptor = SamplerDescriptor::new(&sampler);
        let word0 = descriptor.words[0];
        assert_eq!(word0 & 0x3, Filter::Linear as u32);
        assert_eq!(word0 >> 2 & 0x3, Filter::Linear as u32);
        assert_eq!(word0 >> 4 & 0x3, MipFilter::Linear as u32);
        assert_eq!(word0 >> 6 & 0x7, WrapMode::ClampToEdge as u32);
    }

    #[test]
    fn lod_range_uses_fixed_point() {
        let mut sampler = Sampler::default();
        sampler.lod_clamp_min = 1.0;
        sampler.lod_clamp_max = 4.5;
        let descriptor = SamplerDescriptor::new(&sampler);
        assert_eq!(descriptor.words[1] & 0xFFFF, 256);
        assert_eq!(descriptor.words[1] >> 16, (4.5 * 256.0) as u32);
    }

    #[test]
    fn border_color_fills_the_tail_words() {
        let mut sampler = Sampler::default();
        sampler.border_color = BorderColor::Float([1.0, 0.5, 0.25, 1.0]);
        let descriptor = SamplerDescriptor::new(&sampler);
        assert_eq!(descriptor.words[4], 1.0f32.to_bits());
        assert_eq!(descriptor.words[5], 0.5f32.to_bits());
        assert_eq!(descriptor.words[6], 0.25f32.to_bits());
        assert_eq!(descriptor.words[7], 1.0f32.to_bits());
    }
}
