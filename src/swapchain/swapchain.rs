use super::{Crop, SlotState, Swapchain, SwapchainConfig, SwapchainState};
use crate::device::Device;
use crate::errors::{DriverError, DriverResult};
use crate::image::{Image, ImageFlags};

use ::std::sync::{
    atomic::{AtomicU32, Ordering},
    Arc, Condvar, Mutex,
};

impl Swapchain {
    /// Bind a fixed set of presentable images to a native surface.
    pub fn new(device: &Device, config: &SwapchainConfig<'_>) -> DriverResult<Self> {
        if config.images.is_empty() {
            return Err(DriverError::BadInput);
        }
        for image in config.images {
            if !image.layout().flags.contains(ImageFlags::USAGE_PRESENT) {
                return Err(DriverError::BadInput);
            }
        }
        log::debug!("create swapchain with {} images", config.images.len());
        Ok(Self {
            device: device.clone(),
            state: Arc::new(SwapchainState {
                slots: Mutex::new(vec![SlotState::Free; config.images.len()]),
                available: Condvar::new(),
                swap_interval: AtomicU32::new(1),
                crop: Mutex::new(Crop::default()),
            }),
            images: config.images.to_vec(),
            window: config.native_window,
        })
    }

    /// Number of images in the ring.
    pub fn num_images(&self) -> usize {
        self.images.len()
    }

    /// One of the ring's images by slot index.
    pub fn image(&self, slot: usize) -> Option<&Image> {
        self.images.get(slot)
    }

    /// The native window handle the ring is bound to.
    pub fn native_window(&self) -> raw_window_handle::RawWindowHandle {
        self.window
    }

    /// Set how many display refresh intervals each presented image stays
    /// on screen.
    pub fn set_swap_interval(&self, interval: u32) {
        self.state.swap_interval.store(interval, Ordering::Relaxed);
    }

    /// Set the presentation crop rectangle.
    pub fn set_crop(&self, left: i32, top: i32, right: i32, bottom: i32) {
        let mut crop = self.state.crop.lock().expect("swapchain state lock poisoned");
        *crop = Crop {
            left,
            top,
            right,
            bottom,
        };
    }
}

impl SwapchainState {
    /// Block until a slot is free, take ownership of it, and return its
    /// index. Called from `Queue::acquire_image`.
    pub(crate) fn acquire_blocking(&self) -> usize {
        let mut slots = self.slots.lock().expect("swapchain state lock poisoned");
        loop {
            if let Some(index) = slots.iter().position(|&s| s == SlotState::Free) {
                slots[index] = SlotState::Acquired;
                return index;
            }
            slots = self
                .available
                .wait(slots)
                .expect("swapchain state lock poisoned");
        }
    }

    /// Move an acquired slot to the pending-present state. Called when the
    /// present command is encoded.
    pub(crate) fn begin_present(&self, slot: usize) -> DriverResult<()> {
        let mut slots = self.slots.lock().expect("swapchain state lock poisoned");
        match slots.get(slot) {
            Some(SlotState::Acquired) => {
                slots[slot] = SlotState::PendingPresent;
                Ok(())
            }
            Some(_) => Err(DriverError::BadState),
            None => Err(DriverError::BadInput),
        }
    }

    /// Hand a presented slot back to the display system. Called by the
    /// queue worker when the encoded present executes.
    pub(crate) fn complete_present(&self, slot: usize) {
        let mut slots = self.slots.lock().expect("swapchain state lock poisoned");
        if let Some(state) = slots.get_mut(slot) {
            *state = SlotState::Free;
            self.available.notify_all();
        }
    }

}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::DeviceConfig;
    use crate::image::{ImageFormat, ImageLayout, ImageLayoutConfig, ImageType};
    use crate::memory::{MemoryBlock, MemoryBlockConfig};
    use ::raw_window_handle::{RawWindowHandle, XlibWindowHandle};

    fn window() -> RawWindowHandle {
        let mut handle = XlibWindowHandle::empty();
        handle.window = 0x100;
        RawWindowHandle::Xlib(handle)
    }

    fn presentable_image(device: &Device) -> Image {
        let mut config = ImageLayoutConfig::new(ImageType::D2, ImageFormat::Rgba8Unorm);
        config.dimensions = [64, 64, 0];
        config.flags = ImageFlags::USAGE_RENDER | ImageFlags::USAGE_PRESENT;
        let layout = ImageLayout::new(&config).unwrap();
        let block = MemoryBlock::new(
            device,
            &MemoryBlockConfig::new(layout.size() as u32 + 0x1000),
        )
        .unwrap();
        Image::new(&layout, &block, 0).unwrap()
    }

    #[test]
    fn swapchain_requires_presentable_images() {
        let device = Device::new(DeviceConfig::new());

        let empty = SwapchainConfig {
            native_window: window(),
            images: &[],
        };
        assert_eq!(
            Swapchain::new(&device, &empty).err(),
            Some(DriverError::BadInput)
        );

        let mut config = ImageLayoutConfig::new(ImageType::D2, ImageFormat::Rgba8Unorm);
        config.dimensions = [64, 64, 0];
        let layout = ImageLayout::new(&config).unwrap();
        let block = MemoryBlock::new(
            &device,
            &MemoryBlockConfig::new(layout.size() as u32 + 0x1000),
        )
        .unwrap();
        let plain = Image::new(&layout, &block, 0).unwrap();
        let not_presentable = SwapchainConfig {
            native_window: window(),
            images: &[plain],
        };
        assert_eq!(
            Swapchain::new(&device, &not_presentable).err(),
            Some(DriverError::BadInput)
        );
    }

    #[test]
    fn slots_cycle_through_the_three_states() {
        let device = Device::new(DeviceConfig::new());
        let images = [presentable_image(&device), presentable_image(&device)];
        let swapchain = Swapchain::new(
            &device,
            &SwapchainConfig {
                native_window: window(),
                images: &images,
            },
        )
        .unwrap();
        assert_eq!(swapchain.num_images(), 2);

        let a = swapchain.state.acquire_blocking();
        let b = swapchain.state.acquire_blocking();
        assert_ne!(a, b);

        // Presenting an unacquired slot is a state error; bogus indices
        // are input errors.
        assert_eq!(swapchain.state.begin_present(9), Err(DriverError::BadInput));
        assert_eq!(swapchain.state.begin_present(a), Ok(()));
        assert_eq!(
            swapchain.state.begin_present(a),
            Err(DriverError::BadState)
        );

        // Once the present completes the slot can be acquired again.
        swapchain.state.complete_present(a);
        assert_eq!(swapchain.state.acquire_blocking(), a);
        let _ = b;
    }
}
