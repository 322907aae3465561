//! Image decoding boundary.
//!
//! Encoded PNG/JPEG/TGA/BMP payloads are decoded with the `image` crate and
//! always expanded to 4-channel RGBA8.

use std::path::Path;
use crate::error::{Error, Result};
use crate::engine_error;

/// Decoded RGBA8 image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    /// Tightly packed RGBA8 rows, top row first
    pub pixels: Vec<u8>,
}

impl DecodedImage {
    /// Payload size in bytes
    pub fn byte_size(&self) -> usize {
        self.pixels.len()
    }
}

/// Decode an encoded image held in memory
pub fn decode_image(bytes: &[u8]) -> Result<DecodedImage> {
    let img = image::load_from_memory(bytes).map_err(|e| {
        engine_error!("quasar3d::import", "Failed to decode image ({} bytes): {}", bytes.len(), e);
        Error::DecodeFailed(e.to_string())
    })?;
    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();
    if width == 0 || height == 0 {
        engine_error!("quasar3d::import", "Decoded image has zero size");
        return Err(Error::DecodeFailed("zero-sized image".to_string()));
    }

    Ok(DecodedImage {
        width,
        height,
        pixels: rgba.into_raw(),
    })
}

/// Read and decode an image file
///
/// A missing or unreadable file is an import failure; a readable file that
/// does not decode is a decode failure.
pub fn decode_image_file(path: &Path) -> Result<DecodedImage> {
    let bytes = std::fs::read(path).map_err(|e| {
        engine_error!("quasar3d::import", "Failed to read texture '{}': {}", path.display(), e);
        Error::ImportFailed(format!("{}: {}", path.display(), e))
    })?;
    decode_image(&bytes)
}

#[cfg(test)]
#[path = "image_decode_tests.rs"]
mod tests;
