use std::io::Cursor;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use image::RgbImage;
use image::codecs::jpeg::JpegEncoder;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::{LeafError, Result};

/// Preview re-encoding configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct PreviewConfig {
    /// JPEG quality, 1-100
    #[schemars(range(min = 1, max = 100))]
    pub quality: u8,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        // Same default as OpenCV's imencode
        Self { quality: 95 }
    }
}

impl PreviewConfig {
    pub fn validate(&self) -> Result<()> {
        if !(1..=100).contains(&self.quality) {
            return Err(LeafError::Configuration(format!(
                "preview JPEG quality must be between 1 and 100, got {}",
                self.quality
            )));
        }
        Ok(())
    }
}

/// A compressed copy of the submitted image, ready to embed in a response.
#[derive(Debug, Clone, PartialEq)]
pub struct PreviewImage {
    bytes: Vec<u8>,
}

impl PreviewImage {
    pub const MIME_TYPE: &'static str = "image/jpeg";

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.bytes)
    }

    pub fn to_data_uri(&self) -> String {
        format!("data:{};base64,{}", Self::MIME_TYPE, self.to_base64())
    }
}

/// Re-encode the original decoded image as JPEG.
///
/// Dimensions and content are unchanged apart from compression artifacts.
pub fn encode_preview(image: &RgbImage, config: &PreviewConfig) -> Result<PreviewImage> {
    config.validate()?;

    let mut bytes = Vec::new();
    let encoder = JpegEncoder::new_with_quality(Cursor::new(&mut bytes), config.quality);
    image
        .write_with_encoder(encoder)
        .map_err(|e| LeafError::Preview(e.to_string()))?;

    if bytes.is_empty() {
        return Err(LeafError::Preview("encoder produced no data".to_string()));
    }

    Ok(PreviewImage { bytes })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::{decode_data_uri, decode_image};
    use image::{ImageFormat, Rgb};

    fn leaf_like(width: u32, height: u32) -> RgbImage {
        RgbImage::from_fn(width, height, |x, y| Rgb([(x % 200) as u8, 120 + (y % 100) as u8, 40]))
    }

    #[test]
    fn test_preview_round_trip() {
        for (w, h) in [(1, 1), (300, 300), (123, 45)] {
            let original = leaf_like(w, h);
            let preview = encode_preview(&original, &PreviewConfig::default()).unwrap();
            assert!(!preview.bytes().is_empty());

            let decoded = decode_image(preview.bytes()).unwrap();
            assert_eq!(decoded.dimensions(), (w, h));
            assert_eq!(image::guess_format(preview.bytes()).unwrap(), ImageFormat::Jpeg);
        }
    }

    #[test]
    fn test_preview_keeps_content() {
        let original = RgbImage::from_pixel(32, 32, Rgb([30, 160, 60]));
        let preview = encode_preview(&original, &PreviewConfig::default()).unwrap();
        let decoded = decode_image(preview.bytes()).unwrap();

        let pixel = decoded.get_pixel(16, 16);
        for (got, want) in pixel.0.iter().zip([30u8, 160, 60]) {
            assert!((*got as i16 - want as i16).abs() <= 4, "{:?}", pixel);
        }
    }

    #[test]
    fn test_data_uri() {
        let preview = encode_preview(&leaf_like(8, 8), &PreviewConfig::default()).unwrap();
        let uri = preview.to_data_uri();
        assert!(uri.starts_with("data:image/jpeg;base64,"));
        assert_eq!(decode_data_uri(&uri).unwrap(), preview.bytes());
    }

    #[test]
    fn test_invalid_quality() {
        let config = PreviewConfig { quality: 0 };
        assert!(matches!(
            encode_preview(&leaf_like(4, 4), &config),
            Err(LeafError::Configuration(_))
        ));
    }
}
