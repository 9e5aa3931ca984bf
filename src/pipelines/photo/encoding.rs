// SPDX-License-Identifier: GPL-3.0-only

//! Photo encoding
//!
//! - PNG (lossless) for the photo file handed to the library
//! - JPEG (with quality control) for `photo --output x.jpg`

use crate::errors::PhotoError;
use image::{ImageFormat, RgbaImage};
use std::io::Cursor;
use std::path::Path;
use tracing::debug;

/// Supported encoding formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EncodingFormat {
    /// PNG format (lossless compression)
    #[default]
    Png,
    /// JPEG format (lossy compression)
    Jpeg,
}

impl EncodingFormat {
    /// Get file extension for this format
    pub fn extension(&self) -> &'static str {
        match self {
            EncodingFormat::Png => "png",
            EncodingFormat::Jpeg => "jpg",
        }
    }

    /// Guess the format from a file extension, PNG when unknown
    pub fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .as_deref()
        {
            Some("jpg") | Some("jpeg") => EncodingFormat::Jpeg,
            _ => EncodingFormat::Png,
        }
    }
}

/// Encode `image` in `format`
pub fn encode(image: &RgbaImage, format: EncodingFormat, jpeg_quality: u8) -> Result<Vec<u8>, PhotoError> {
    let data = match format {
        EncodingFormat::Png => encode_png(image)?,
        EncodingFormat::Jpeg => {
            let rgb = image::DynamicImage::ImageRgba8(image.clone()).to_rgb8();
            let mut buffer = Vec::new();
            image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buffer, jpeg_quality)
                .encode_image(&rgb)
                .map_err(|e| PhotoError::EncodingFailed(format!("JPEG encoding failed: {}", e)))?;
            buffer
        }
    };

    debug!(size = data.len(), format = ?format, "Encoding complete");
    Ok(data)
}

/// Encode `image` as PNG
pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>, PhotoError> {
    let mut buffer = Cursor::new(Vec::new());
    image
        .write_to(&mut buffer, ImageFormat::Png)
        .map_err(|e| PhotoError::EncodingFailed(format!("PNG encoding failed: {}", e)))?;
    Ok(buffer.into_inner())
}
