// SPDX-License-Identifier: GPL-3.0-only

//! Integration tests for the rotation stage

use camera_photo::backends::camera::{CameraFrame, PixelFormat};
use camera_photo::imaging::{
    AffineTransform, GpuImage, ImageContext, Rect, TransformStage, rotation_transform,
};
use camera_photo::media::{frame_to_rgba, rgba_to_format};
use image::{Rgba, RgbaImage, imageops};
use std::f64::consts::PI;
use std::sync::Arc;

/// 4x2 image where every pixel is distinct
fn numbered_image() -> RgbaImage {
    RgbaImage::from_fn(4, 2, |x, y| Rgba([(x * 10) as u8, (y * 100) as u8, 7, 255]))
}

fn stage() -> TransformStage {
    TransformStage::new(Arc::new(ImageContext::software()))
}

fn rasterize(stage: &TransformStage, image: &GpuImage) -> RgbaImage {
    stage
        .context()
        .create_bitmap(image, image.extent())
        .expect("rasterize")
}

#[test]
fn test_single_turn_is_clockwise() {
    let stage = stage();
    let rotated = stage
        .rotate(GpuImage::from_rgba(numbered_image()))
        .unwrap();

    assert_eq!(
        rasterize(&stage, &rotated),
        imageops::rotate90(&numbered_image())
    );
}

#[test]
fn test_two_turns_make_half_turn() {
    let stage = stage();
    let once = stage
        .rotate(GpuImage::from_rgba(numbered_image()))
        .unwrap();
    let twice = stage.rotate(once).unwrap();

    // Second pivot is the centre of the rotated extent, so the image lands
    // back on the original extent
    assert_eq!(twice.extent(), Rect::new(0.0, 0.0, 4.0, 2.0));
    assert_eq!(
        rasterize(&stage, &twice),
        imageops::rotate180(&numbered_image())
    );
}

#[test]
fn test_four_turns_are_identity() {
    let stage = stage();
    let mut image = GpuImage::from_rgba(numbered_image());
    for _ in 0..4 {
        image = stage.rotate(image).unwrap();
    }

    assert!(image.transform().approx_eq(&AffineTransform::IDENTITY, 1e-9));
    assert_eq!(rasterize(&stage, &image), numbered_image());
}

#[test]
fn test_pivot_is_extent_centre() {
    let extent = Rect::new(0.0, 0.0, 4.0, 2.0);
    let transform = rotation_transform(&extent);

    // Centre stays put, extent swaps its sides around it
    let centre = transform.apply_point(extent.center());
    assert!((centre.x - 2.0).abs() < 1e-9 && (centre.y - 1.0).abs() < 1e-9);
    assert_eq!(transform.apply_rect(&extent), Rect::new(1.0, -1.0, 2.0, 4.0));

    let half_turn = AffineTransform::translation(2.0, 1.0)
        .rotated(PI)
        .translated(-2.0, -1.0);
    assert!(transform.concat(&transform).approx_eq(&half_turn, 1e-9));
}

#[test]
fn test_marked_corner_lands_top_right() {
    let mut source = RgbaImage::from_pixel(4, 2, Rgba([0, 0, 0, 255]));
    source.put_pixel(0, 0, Rgba([255, 0, 0, 255]));

    let stage = stage();
    let rotated = stage.rotate(GpuImage::from_rgba(source)).unwrap();
    let bitmap = rasterize(&stage, &rotated);

    assert_eq!(bitmap.dimensions(), (2, 4));
    assert_eq!(bitmap.get_pixel(1, 0).0, [255, 0, 0, 255]);
    let marked = bitmap.pixels().filter(|p| p.0[0] == 255).count();
    assert_eq!(marked, 1);
}

#[test]
fn test_two_turns_make_half_turn_for_every_pixel_format() {
    let stage = stage();
    for format in [
        PixelFormat::NV12,
        PixelFormat::RGBA,
        PixelFormat::BGRA,
        PixelFormat::YUYV,
        PixelFormat::Gray8,
    ] {
        let packed = rgba_to_format(&numbered_image(), format);
        let frame = CameraFrame::packed(4, 2, format, packed, 0).unwrap();
        // Chroma subsampling is lossy, so compare with the decoded frame
        let upright = frame_to_rgba(&frame).unwrap();

        let image = GpuImage::from_pixel_buffer(&frame).unwrap();
        let twice = stage.rotate(stage.rotate(image).unwrap()).unwrap();

        assert_eq!(
            rasterize(&stage, &twice),
            imageops::rotate180(&upright),
            "{:?}",
            format
        );
    }
}

#[test]
fn test_empty_image_is_an_error() {
    assert!(stage().rotate(GpuImage::from_rgba(RgbaImage::new(0, 0))).is_err());
}
