use super::ImageDescriptor;
use crate::errors::DriverResult;
use crate::image::ImageView;

impl ImageDescriptor {
    /// Encode a view into its 32-byte descriptor record.
    ///
    /// `uses_load_store` marks the descriptor for shader image load/store
    /// access; `decay_ms` makes a multisampled image readable as a plain
    /// 2D array of samples.
    ///
    /// Record layout, version 1: words 0-5 are the view record (address,
    /// format/type/aspect, extent, subranges, swizzles), word 6 carries the
    /// access bits, word 7 is reserved zero.
    pub fn new(view: &ImageView<'_>, uses_load_store: bool, decay_ms: bool) -> DriverResult<Self> {
        view.validate()?;
        let record = view.encode_record();
        let mut words = [0u32; 8];
        words[..6].copy_from_slice(&record);
        words[6] = uses_load_store as u32 | (decay_ms as u32) << 1;
        Ok(Self { words })
    }

    /// The record as bytes, ready to copy into descriptor-set memory.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{Device, DeviceConfig};
    use crate::errors::DriverError;
    use crate::image::{
        Image, ImageFormat, ImageLayout, ImageLayoutConfig, ImageType, Swizzle,
    };
    use crate::memory::{MemoryBlock, MemoryBlockConfig};

    fn image() -> Image {
        let device = Device::new(DeviceConfig::new());
        let mut config = ImageLayoutConfig::new(ImageType::D2, ImageFormat::Rgba8Unorm);
        config.dimensions = [128, 128, 0];
        let layout = ImageLayout::new(&config).unwrap();
        let block = MemoryBlock::new(
            &device,
            &MemoryBlockConfig::new(layout.size() as u32 + 0x1000),
        )
        .unwrap();
        Image::new(&layout, &block, 0).unwrap()
    }

    #[test]
    fn encoding_is_deterministic() {
        let image = image();
        let view = ImageView::new(&image);
        let a = ImageDescriptor::new(&view, false, false).unwrap();
        let b = ImageDescriptor::new(&view, false, false).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.as_bytes().len(), 32);
    }

    #[test]
    fn access_bits_and_swizzles_change_the_record() {
        let image = image();
        let view = ImageView::new(&image);
        let plain = ImageDescriptor::new(&view, false, false).unwrap();
        let load_store = ImageDescriptor::new(&view, true, false).unwrap();
        assert_ne!(plain, load_store);
        assert_eq!(load_store.words[6] & 1, 1);

        let mut swizzled = ImageView::new(&image);
        swizzled.swizzle = [Swizzle::Blue, Swizzle::Green, Swizzle::Red, Swizzle::One];
        let remapped = ImageDescriptor::new(&swizzled, false, false).unwrap();
        assert_ne!(plain, remapped);
    }

    #[test]
    fn invalid_views_are_rejected() {
        let image = image();
        let mut view = ImageView::new(&image);
        view.mip_level_offset = 9;
        assert_eq!(
            ImageDescriptor::new(&view, false, false).unwrap_err(),
            DriverError::BadInput
        );
    }

    #[test]
    fn record_embeds_the_view_address() {
        let image = image();
        let view = ImageView::new(&image);
        let descriptor = ImageDescriptor::new(&view, false, false).unwrap();
        let addr = image.gpu_addr();
        assert_eq!(descriptor.words[0], addr as u32);
        assert_eq!(descriptor.words[1], (addr >> 32) as u32);
        assert_eq!(descriptor.words[7], 0);
    }
}
