// SPDX-License-Identifier: GPL-3.0-only

//! Pixel resampling backends

use super::FilterError;
use super::geometry::{AffineTransform, Point};
use image::{Rgba, RgbaImage};

/// Turns a transformed image back into pixels
///
/// `dest_to_source` maps y-up coordinates of the destination buffer (origin at
/// its bottom-left corner) to y-up coordinates of the source buffer.
/// Destination pixels are sampled at their centres with nearest-neighbour
/// lookup; samples that fall outside the source are transparent.
pub trait Rasterizer: Send + Sync {
    fn name(&self) -> &'static str;

    fn resample(
        &self,
        source: &RgbaImage,
        dest_to_source: &AffineTransform,
        width: u32,
        height: u32,
    ) -> Result<RgbaImage, FilterError>;
}

/// CPU nearest-neighbour resampler
#[derive(Debug, Default, Clone, Copy)]
pub struct SoftwareRasterizer;

/// Source pixel under a y-up sample point, if any
pub(crate) fn source_pixel(point: Point, source_width: u32, source_height: u32) -> Option<(u32, u32)> {
    let col = point.x.floor();
    let row_from_bottom = point.y.floor();
    if col < 0.0
        || row_from_bottom < 0.0
        || col >= source_width as f64
        || row_from_bottom >= source_height as f64
    {
        return None;
    }
    let row = source_height - 1 - row_from_bottom as u32;
    Some((col as u32, row))
}

impl Rasterizer for SoftwareRasterizer {
    fn name(&self) -> &'static str {
        "software"
    }

    fn resample(
        &self,
        source: &RgbaImage,
        dest_to_source: &AffineTransform,
        width: u32,
        height: u32,
    ) -> Result<RgbaImage, FilterError> {
        if width == 0 || height == 0 {
            return Err(FilterError::EmptyImage);
        }

        let transparent = Rgba([0, 0, 0, 0]);
        Ok(RgbaImage::from_fn(width, height, |x, y| {
            let center = Point::new(x as f64 + 0.5, (height - y) as f64 - 0.5);
            match source_pixel(
                dest_to_source.apply_point(center),
                source.width(),
                source.height(),
            ) {
                Some((sx, sy)) => *source.get_pixel(sx, sy),
                None => transparent,
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient(width: u32, height: u32) -> RgbaImage {
        RgbaImage::from_fn(width, height, |x, y| Rgba([x as u8, y as u8, 0, 255]))
    }

    #[test]
    fn test_identity_copies_pixels() {
        let source = gradient(3, 2);
        let out = SoftwareRasterizer
            .resample(&source, &AffineTransform::IDENTITY, 3, 2)
            .unwrap();
        assert_eq!(out, source);
    }

    #[test]
    fn test_outside_is_transparent() {
        let source = gradient(2, 2);
        let out = SoftwareRasterizer
            .resample(&source, &AffineTransform::translation(1.0, 0.0), 2, 2)
            .unwrap();
        assert_eq!(out.get_pixel(0, 0).0, [1, 0, 0, 255]);
        assert_eq!(out.get_pixel(1, 0).0, [0, 0, 0, 0]);
    }

    #[test]
    fn test_y_up_translation_moves_rows() {
        // Sampling one unit higher in y-up space reads the row above
        let source = gradient(1, 3);
        let out = SoftwareRasterizer
            .resample(&source, &AffineTransform::translation(0.0, 1.0), 1, 3)
            .unwrap();
        assert_eq!(out.get_pixel(0, 2).0, [0, 1, 0, 255]);
        assert_eq!(out.get_pixel(0, 0).0, [0, 0, 0, 0]);
    }

    #[test]
    fn test_zero_size_is_rejected() {
        let source = gradient(1, 1);
        assert_eq!(
            SoftwareRasterizer
                .resample(&source, &AffineTransform::IDENTITY, 0, 1)
                .unwrap_err(),
            FilterError::EmptyImage
        );
    }
}
