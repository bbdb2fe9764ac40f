/// Component arrangement of a vertex attribute.
///
/// The discriminants are the hardware's native size selectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum VtxAttribSize {
    // One to four 32-bit components
    Size1x32 = 0x12,
    Size2x32 = 0x04,
    Size3x32 = 0x02,
    Size4x32 = 0x01,

    // One to four 16-bit components
    Size1x16 = 0x1b,
    Size2x16 = 0x0f,
    Size3x16 = 0x05,
    Size4x16 = 0x03,

    // One to four 8-bit components
    Size1x8 = 0x1d,
    Size2x8 = 0x18,
    Size3x8 = 0x13,
    Size4x8 = 0x0a,

    // Misc arrangements
    Size10_10_10_2 = 0x30,
    Size11_11_10 = 0x31,
}

/// Numeric interpretation of a vertex attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum VtxAttribType {
    None = 0,
    Snorm = 1,
    Unorm = 2,
    Sint = 3,
    Uint = 4,
    Sscaled = 5,
    Uscaled = 6,
    Float = 7,
}

/// One vertex attribute slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VtxAttribState {
    /// Index of the vertex buffer the attribute reads from.
    pub buffer_id: u32,
    /// True when the attribute is a constant rather than fetched per
    /// vertex.
    pub is_fixed: bool,
    /// Byte offset of the attribute within one element.
    pub offset: u32,
    pub size: VtxAttribSize,
    pub ty: VtxAttribType,
    /// Swap the R and B channels on fetch.
    pub is_bgra: bool,
}

impl VtxAttribState {
    /// Pack into the hardware attribute word.
    pub(crate) fn pack(&self) -> u32 {
        let mut word = 0u32;
        word |= self.buffer_id & 0x1F;
        word |= (self.is_fixed as u32) << 6;
        word |= (self.offset & 0x3FFF) << 7;
        word |= (self.size as u32 & 0x3F) << 21;
        word |= (self.ty as u32 & 0x7) << 27;
        word |= (self.is_bgra as u32) << 31;
        word
    }
}

/// Fetch configuration of one vertex buffer binding slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VtxBufferState {
    /// Byte distance between consecutive elements.
    pub stride: u32,
    /// Instance divisor; zero fetches per vertex.
    pub divisor: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attribute_packing_round_trips_the_fields() {
        let attrib = VtxAttribState {
            buffer_id: 3,
            is_fixed: false,
            offset: 12,
            size: VtxAttribSize::Size3x32,
            ty: VtxAttribType::Float,
            is_bgra: false,
        };
        let word = attrib.pack();
        assert_eq!(word & 0x1F, 3);
        assert_eq!(word >> 7 & 0x3FFF, 12);
        assert_eq!(word >> 21 & 0x3F, VtxAttribSize::Size3x32 as u32);
        assert_eq!(word >> 27 & 0x7, VtxAttribType::Float as u32);
        assert_eq!(word >> 31, 0);
    }
}
