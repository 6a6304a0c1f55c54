use burn::tensor::{Tensor, TensorData, backend::Backend};
use image::{RgbImage, imageops::FilterType};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::types::InputSize;

/// Channel order the model was trained with
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq,
    Serialize, Deserialize, JsonSchema,
    Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ChannelOrder {
    #[default]
    Rgb,
    /// OpenCV's native order
    Bgr,
}

/// Leaf classifier preprocessing configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct PreprocessConfig {
    /// Channel order expected by the model
    pub channel_order: ChannelOrder,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            channel_order: ChannelOrder::Rgb,
        }
    }
}

/// Dense `f32` tensor in NHWC layout, shape `[1, height, width, 3]`.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageTensor {
    data: Vec<f32>,
    shape: [usize; 4],
}

impl ImageTensor {
    pub fn dims(&self) -> [usize; 4] {
        self.shape
    }

    pub fn input_size(&self) -> InputSize {
        InputSize::new(self.shape[1] as u32, self.shape[2] as u32)
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// Copy into a burn tensor on `device`
    pub fn to_burn<B: Backend>(&self, device: &B::Device) -> Tensor<B, 4> {
        let data = TensorData::new(self.data.clone(), self.shape);
        Tensor::from_data(data, device)
    }
}

/// Preprocess an image for the leaf classifier
///
/// This function:
/// 1. Resizes to exactly `size` with bilinear filtering (aspect ratio is not kept)
/// 2. Reorders channels to what the model was trained on
/// 3. Scales every value from `0..=255` to `0.0..=1.0`
/// 4. Adds a leading batch dimension: `[1, H, W, 3]`
pub fn preprocess_image(image: &RgbImage, size: InputSize, config: &PreprocessConfig) -> ImageTensor {
    let resized = image::imageops::resize(image, size.width, size.height, FilterType::Triangle);

    let (width, height) = resized.dimensions();
    let mut data = Vec::with_capacity((width * height * 3) as usize);

    // Row-major pixels give HWC order directly
    for pixel in resized.pixels() {
        let [r, g, b] = pixel.0;
        let channels = match config.channel_order {
            ChannelOrder::Rgb => [r, g, b],
            ChannelOrder::Bgr => [b, g, r],
        };
        data.extend(channels.iter().map(|&c| c as f32 / 255.0));
    }

    ImageTensor {
        data,
        shape: [1, height as usize, width as usize, 3],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;
    use image::Rgb;

    type TestBackend = NdArray;

    fn create_test_image(width: u32, height: u32) -> RgbImage {
        RgbImage::from_fn(width, height, |x, y| {
            let intensity = ((x + y) * 255 / (width + height)) as u8;
            Rgb([intensity, 255 - intensity, 0])
        })
    }

    #[test]
    fn test_output_shape_for_any_input_size() {
        let size = InputSize::new(64, 48);
        for (w, h) in [(1, 1), (300, 300), (640, 480), (17, 911), (64, 48)] {
            let tensor = preprocess_image(&create_test_image(w, h), size, &PreprocessConfig::default());
            assert_eq!(tensor.dims(), [1, 64, 48, 3]);
            assert_eq!(tensor.as_slice().len(), 64 * 48 * 3);
            assert!(tensor.as_slice().iter().all(|v| (0.0..=1.0).contains(v)));
        }
    }

    #[test]
    fn test_values_are_scaled_by_255() {
        let image = RgbImage::from_pixel(4, 4, Rgb([255, 51, 0]));
        let tensor = preprocess_image(&image, InputSize::new(4, 4), &PreprocessConfig::default());
        assert_eq!(&tensor.as_slice()[..3], &[1.0, 0.2, 0.0]);
    }

    #[test]
    fn test_bgr_channel_order() {
        let image = RgbImage::from_pixel(4, 4, Rgb([255, 0, 0]));
        let config = PreprocessConfig { channel_order: ChannelOrder::Bgr };
        let tensor = preprocess_image(&image, InputSize::new(4, 4), &config);
        assert_eq!(&tensor.as_slice()[..3], &[0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_channel_order_parsing() {
        assert_eq!("bgr".parse::<ChannelOrder>().unwrap(), ChannelOrder::Bgr);
        assert_eq!(ChannelOrder::Rgb.to_string(), "rgb");
    }

    #[test]
    fn test_to_burn_keeps_shape() {
        let device = Default::default();
        let tensor = preprocess_image(&create_test_image(30, 20), InputSize::new(16, 16), &PreprocessConfig::default());
        let burn_tensor = tensor.to_burn::<TestBackend>(&device);
        assert_eq!(burn_tensor.dims(), [1, 16, 16, 3]);
    }
}
