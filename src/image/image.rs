use super::{Image, ImageLayout};
use crate::errors::{DriverError, DriverResult};
use crate::limits::GpuAddr;
use crate::memory::MemoryBlock;

impl Image {
    /// Place a layout at `offset` bytes into `block`.
    ///
    /// Fails with `MisalignedData` when the offset violates the layout's
    /// base alignment, and `BadInput` when the layout does not fit in the
    /// remainder of the block.
    pub fn new(layout: &ImageLayout, block: &MemoryBlock, offset: u32) -> DriverResult<Self> {
        if u64::from(offset) % u64::from(layout.alignment()) != 0 {
            return Err(DriverError::MisalignedData);
        }
        let end = u64::from(offset)
            .checked_add(layout.size())
            .ok_or(DriverError::BadInput)?;
        if end > u64::from(block.size()) {
            return Err(DriverError::BadInput);
        }
        Ok(Self {
            layout: layout.clone(),
            block: block.clone(),
            offset,
        })
    }

    /// The layout this image was placed with.
    pub fn layout(&self) -> &ImageLayout {
        &self.layout
    }

    /// The backing memory block.
    pub fn memory(&self) -> &MemoryBlock {
        &self.block
    }

    /// Byte offset of the image within its block.
    pub fn offset(&self) -> u32 {
        self.offset
    }

    /// GPU address of the first pixel byte.
    pub fn gpu_addr(&self) -> GpuAddr {
        self.block.gpu_addr() + u64::from(self.offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{Device, DeviceConfig};
    use crate::image::{ImageFormat, ImageLayoutConfig, ImageType};
    use crate::memory::MemoryBlockConfig;

    fn fixture() -> (Device, ImageLayout, MemoryBlock) {
        let device = Device::new(DeviceConfig::new());
        let mut config = ImageLayoutConfig::new(ImageType::D2, ImageFormat::Rgba8Unorm);
        config.dimensions = [64, 64, 0];
        let layout = ImageLayout::new(&config).unwrap();
        let block = MemoryBlock::new(&device, &MemoryBlockConfig::new(0x10000)).unwrap();
        (device, layout, block)
    }

    #[test]
    fn placement_respects_the_block_bounds() {
        let (_device, layout, block) = fixture();
        let image = Image::new(&layout, &block, 0).unwrap();
        assert_eq!(image.gpu_addr(), block.gpu_addr());
        assert_eq!(image.offset(), 0);

        let end = block.size() - layout.size() as u32;
        let aligned_end = end - end % layout.alignment();
        assert!(Image::new(&layout, &block, aligned_end).is_ok());

        let too_far = aligned_end + layout.alignment();
        assert_eq!(
            Image::new(&layout, &block, too_far).unwrap_err(),
            DriverError::BadInput
        );
    }

    #[test]
    fn placement_respects_the_layout_alignment() {
        let (_device, layout, block) = fixture();
        assert!(layout.alignment() > 4);
        assert_eq!(
            Image::new(&layout, &block, 4).unwrap_err(),
            DriverError::MisalignedData
        );
    }
}
