use super::{DsSource, Image, ImageFormat, ImageType, ImageView, Swizzle};
use crate::errors::{DriverError, DriverResult};
use crate::limits::GpuAddr;

impl<'a> ImageView<'a> {
    /// A view covering the full resource with identity swizzle.
    pub fn new(image: &'a Image) -> Self {
        Self {
            image,
            type_override: None,
            format_override: None,
            swizzle: [Swizzle::Red, Swizzle::Green, Swizzle::Blue, Swizzle::Alpha],
            ds_source: DsSource::Depth,
            layer_offset: 0,
            layer_count: 0,
            mip_level_offset: 0,
            mip_level_count: 0,
        }
    }

    /// The type the view presents: the override, or the image's own type.
    pub fn effective_type(&self) -> ImageType {
        self.type_override
            .unwrap_or_else(|| self.image.layout().image_type())
    }

    /// The format the view presents: the override, or the image's own
    /// format.
    pub fn effective_format(&self) -> ImageFormat {
        self.format_override
            .unwrap_or_else(|| self.image.layout().format())
    }

    /// Resolved (offset, count) mip range; a zero count selects the
    /// remainder of the underlying image.
    pub fn mip_range(&self) -> (u32, u32) {
        let total = self.image.layout().mip_levels();
        let offset = u32::from(self.mip_level_offset).min(total);
        let count = match self.mip_level_count {
            0 => total - offset,
            n => u32::from(n),
        };
        (offset, count)
    }

    /// Resolved (offset, count) layer range; a zero count selects the
    /// remainder of the underlying image.
    pub fn layer_range(&self) -> (u32, u32) {
        let total = self.image.layout().layers();
        let offset = u32::from(self.layer_offset).min(total);
        let count = match self.layer_count {
            0 => total - offset,
            n => u32::from(n),
        };
        (offset, count)
    }

    /// Check that the explicit subranges stay inside the image.
    pub fn validate(&self) -> DriverResult<()> {
        let layout = self.image.layout();
        let mip_end = u32::from(self.mip_level_offset) + u32::from(self.mip_level_count);
        if u32::from(self.mip_level_offset) >= layout.mip_levels()
            || mip_end > layout.mip_levels()
        {
            return Err(DriverError::BadInput);
        }
        let layer_end = u32::from(self.layer_offset) + u32::from(self.layer_count);
        if u32::from(self.layer_offset) >= layout.layers() || layer_end > layout.layers() {
            return Err(DriverError::BadInput);
        }
        Ok(())
    }

    /// GPU address of the first byte the view selects.
    pub(crate) fn gpu_addr(&self) -> GpuAddr {
        let layout = self.image.layout();
        let (mip, _) = self.mip_range();
        let (layer, _) = self.layer_range();
        self.image.gpu_addr()
            + u64::from(layer) * layout.layer_size()
            + layout.mip_offset(mip).unwrap_or(0)
    }

    /// Pack the view into its six-word command stream record.
    ///
    /// Record layout (versioned with the wire format): address split over
    /// words 0-1, format/type/aspect in word 2, mip0 extent in word 3,
    /// subranges in word 4, swizzle selectors in word 5.
    pub(crate) fn encode_record(&self) -> [u32; 6] {
        let addr = self.gpu_addr();
        let [width, height, _] = self.image.layout().dimensions();
        let (mip_offset, mip_count) = self.mip_range();
        let (layer_offset, layer_count) = self.layer_range();

        let word2 = self.effective_format() as u32
            | (self.effective_type() as u32) << 16
            | (self.ds_source as u32) << 24;
        let word3 = (width.saturating_sub(1) & 0xFFFF) | (height.saturating_sub(1) & 0xFFFF) << 16;
        let word4 = (layer_offset & 0xFFF)
            | (layer_count & 0xFFF) << 12
            | (mip_offset & 0xF) << 24
            | (mip_count & 0xF) << 28;
        let word5 = self.swizzle[0] as u32
            | (self.swizzle[1] as u32) << 3
            | (self.swizzle[2] as u32) << 6
            | (self.swizzle[3] as u32) << 9;

        [addr as u32, (addr >> 32) as u32, word2, word3, word4, word5]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{Device, DeviceConfig};
    use crate::image::{ImageLayout, ImageLayoutConfig};
    use crate::memory::{MemoryBlock, MemoryBlockConfig};

    fn image() -> Image {
        let device = Device::new(DeviceConfig::new());
        let mut config = ImageLayoutConfig::new(ImageType::D2Array, ImageFormat::Rgba8Unorm);
        config.dimensions = [64, 64, 4];
        config.mip_levels = 3;
        let layout = ImageLayout::new(&config).unwrap();
        let block = MemoryBlock::new(
            &device,
            &MemoryBlockConfig::new(layout.size() as u32 + 0x1000),
        )
        .unwrap();
        Image::new(&layout, &block, 0).unwrap()
    }

    #[test]
    fn default_view_covers_the_full_resource() {
        let image = image();
        let view = ImageView::new(&image);
        assert_eq!(view.mip_range(), (0, 3));
        assert_eq!(view.layer_range(), (0, 4));
        assert_eq!(view.effective_format(), ImageFormat::Rgba8Unorm);
        assert_eq!(view.effective_type(), ImageType::D2Array);
        assert_eq!(
            view.swizzle,
            [Swizzle::Red, Swizzle::Green, Swizzle::Blue, Swizzle::Alpha]
        );
        assert!(view.validate().is_ok());
        assert_eq!(view.gpu_addr(), image.gpu_addr());
    }

    #[test]
    fn zero_count_means_remainder() {
        let image = image();
        let mut view = ImageView::new(&image);
        view.mip_level_offset = 1;
        view.layer_offset = 2;
        assert_eq!(view.mip_range(), (1, 2));
        assert_eq!(view.layer_range(), (2, 2));
        assert!(view.validate().is_ok());
    }

    #[test]
    fn out_of_range_subranges_fail_validation() {
        let image = image();
        let mut view = ImageView::new(&image);
        view.mip_level_offset = 3;
        assert_eq!(view.validate().unwrap_err(), DriverError::BadInput);

        let mut view = ImageView::new(&image);
        view.layer_offset = 1;
        view.layer_count = 4;
        assert_eq!(view.validate().unwrap_err(), DriverError::BadInput);
    }

    #[test]
    fn subrange_views_address_into_the_image() {
        let image = image();
        let layout = image.layout().clone();
        let mut view = ImageView::new(&image);
        view.layer_offset = 1;
        view.mip_level_offset = 2;
        let expected =
            image.gpu_addr() + layout.layer_size() + layout.mip_offset(2).unwrap();
        assert_eq!(view.gpu_addr(), expected);
    }

    #[test]
    fn overrides_replace_format_and_type() {
        let image = image();
        let mut view = ImageView::new(&image);
        view.format_override = Some(ImageFormat::Rgba8Uint);
        view.type_override = Some(ImageType::D2);
        assert_eq!(view.effective_format(), ImageFormat::Rgba8Uint);
        assert_eq!(view.effective_type(), ImageType::D2);
    }
}
