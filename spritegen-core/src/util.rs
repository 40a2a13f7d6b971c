use anyhow::Result;
use candle_core::{Device, Tensor};
use image::DynamicImage;
use tracing::info;

use crate::{DeviceChoice, DeviceMap};

pub fn select_best_device(device_map: DeviceMap) -> Result<Device> {
    let choice = DeviceChoice::detect(device_map);
    let device = match choice {
        DeviceChoice::Cuda(ordinal) => Device::new_cuda(ordinal)?,
        DeviceChoice::Metal(ordinal) => Device::new_metal(ordinal)?,
        DeviceChoice::Cpu => Device::Cpu,
    };
    if choice.is_accelerated() {
        info!("Using GPU acceleration ({choice})");
    } else {
        if device_map != DeviceMap::ForceCpu {
            #[cfg(all(target_os = "macos", target_arch = "aarch64"))]
            {
                info!("No accelerator found, build with `--features metal` to run on GPU(metal)");
            }
            #[cfg(not(all(target_os = "macos", target_arch = "aarch64")))]
            {
                info!("No accelerator found, build with `--features cuda` to run on GPU");
            }
        }
        info!("Using CPU, generation may take several minutes");
    }
    Ok(device)
}

/// Converts a u8 tensor with shape (3, height, width) into an RGB image.
pub fn tensor_to_image(img: &Tensor) -> Result<DynamicImage> {
    let (channels, height, width) = img.dims3()?;
    if channels != 3 {
        anyhow::bail!("tensor_to_image expects an image with 3 channels, got {channels}");
    }
    let img = img.permute((1, 2, 0))?.flatten_all()?;
    let pixels = img.to_vec1::<u8>()?;
    let buffer = image::ImageBuffer::from_raw(width as u32, height as u32, pixels)
        .ok_or_else(|| candle_core::Error::msg("error converting tensor to image buffer"))?;
    Ok(DynamicImage::ImageRgb8(buffer))
}
