use std::io::Cursor;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use image::{ImageReader, Limits, RgbImage};
use tracing::debug;

use crate::error::{LeafError, Result};

/// Largest accepted width or height, in pixels.
pub const MAX_IMAGE_DIMENSION: u32 = 8192;

/// Largest allocation the decoder may make, in bytes.
pub const MAX_DECODE_ALLOC: u64 = 256 * 1024 * 1024;

/// Decode encoded image bytes (JPEG, PNG, ...) into an RGB pixel grid.
///
/// The format is detected from the content, not from a file name. Empty or
/// undecodable input is a [`LeafError::Decode`].
pub fn decode_image(bytes: &[u8]) -> Result<RgbImage> {
    if bytes.is_empty() {
        return Err(LeafError::Decode("image data is empty".to_string()));
    }

    let mut reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| LeafError::Decode(e.to_string()))?;

    let Some(format) = reader.format() else {
        return Err(LeafError::Decode("unrecognized image format".to_string()));
    };

    let mut limits = Limits::default();
    limits.max_image_width = Some(MAX_IMAGE_DIMENSION);
    limits.max_image_height = Some(MAX_IMAGE_DIMENSION);
    limits.max_alloc = Some(MAX_DECODE_ALLOC);
    reader.limits(limits);

    let image = reader
        .decode()
        .map_err(|e| LeafError::Decode(e.to_string()))?;

    if image.width() == 0 || image.height() == 0 {
        return Err(LeafError::Decode("image has no pixels".to_string()));
    }

    debug!(?format, width = image.width(), height = image.height(), "Decoded image");
    Ok(image.to_rgb8())
}

/// Extract the raw bytes from a `data:<mime>;base64,<payload>` URI.
///
/// Everything up to the first comma is treated as the header and dropped.
/// Input without a comma is decoded as bare base64.
pub fn decode_data_uri(uri: &str) -> Result<Vec<u8>> {
    let payload = match uri.split_once(',') {
        Some((_header, payload)) => payload,
        None => uri,
    };
    let payload = payload.trim();

    if payload.is_empty() {
        return Err(LeafError::Decode("data URI has no payload".to_string()));
    }

    STANDARD
        .decode(payload)
        .map_err(|e| LeafError::Decode(format!("invalid base64 payload: {}", e)))
}
