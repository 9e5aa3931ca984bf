// SPDX-License-Identifier: GPL-3.0-only

//! Lazy image handle

use super::FilterError;
use super::geometry::{AffineTransform, Rect};
use crate::backends::camera::CameraFrame;
use crate::media::frame_to_rgba;
use image::RgbaImage;
use std::sync::Arc;

/// Image in the image context
///
/// A `GpuImage` is a recipe rather than pixels: backing RGBA pixels plus the
/// accumulated transform from the backing space into image space. Backing
/// space is y-up with the bottom-left corner of the buffer at the origin.
/// Pixels are only resampled when the image is drawn or rasterized.
///
/// Images are immutable. Filters consume an image and return a new one.
#[derive(Debug, Clone)]
pub struct GpuImage {
    source: Arc<RgbaImage>,
    transform: AffineTransform,
    extent: Rect,
}

impl GpuImage {
    /// Wrap decoded pixels; the extent is `(0, 0, width, height)`
    pub fn from_rgba(image: RgbaImage) -> Self {
        Self::from_shared(Arc::new(image))
    }

    pub fn from_shared(source: Arc<RgbaImage>) -> Self {
        let extent = Rect::from_size(source.width(), source.height());
        Self {
            source,
            transform: AffineTransform::IDENTITY,
            extent,
        }
    }

    /// Build an image from a streaming pixel buffer
    pub fn from_pixel_buffer(frame: &CameraFrame) -> Result<Self, FilterError> {
        let rgba = frame_to_rgba(frame).map_err(|e| FilterError::InvalidInput(e.to_string()))?;
        Ok(Self::from_rgba(rgba))
    }

    /// Build an image from encoded still data (JPEG, PNG, ...)
    pub fn from_encoded(data: &[u8]) -> Result<Self, FilterError> {
        let decoded = image::load_from_memory(data)
            .map_err(|e| FilterError::InvalidInput(format!("Failed to decode still: {}", e)))?;
        Ok(Self::from_rgba(decoded.to_rgba8()))
    }

    pub fn extent(&self) -> Rect {
        self.extent
    }

    /// Transform from backing space into image space
    pub fn transform(&self) -> &AffineTransform {
        &self.transform
    }

    pub fn source(&self) -> &Arc<RgbaImage> {
        &self.source
    }

    pub fn is_empty(&self) -> bool {
        self.extent.is_empty() || self.source.width() == 0 || self.source.height() == 0
    }

    /// Apply `transform` in image space
    ///
    /// The new extent is the bounding box of the transformed extent. It keeps
    /// its position and is not moved back to the origin.
    pub fn transformed(self, transform: &AffineTransform) -> Result<Self, FilterError> {
        if self.is_empty() {
            return Err(FilterError::EmptyImage);
        }
        if transform.inverse().is_none() {
            return Err(FilterError::NonInvertibleTransform);
        }

        Ok(Self {
            extent: transform.apply_rect(&self.extent),
            transform: self.transform.concat(transform),
            source: self.source,
        })
    }
}
