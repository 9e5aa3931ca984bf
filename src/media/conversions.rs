// SPDX-License-Identifier: GPL-3.0-only

//! Pixel buffer to RGBA conversion
//!
//! Every streaming format is expanded to RGBA before it becomes an image in the
//! image context. YUV formats use full-range BT.601 coefficients.

use crate::backends::camera::types::{BackendError, BackendResult, CameraFrame, PixelFormat};
use image::RgbaImage;

/// Convert YUV (BT.601, full range) to RGB
pub fn yuv_to_rgb(y: u8, u: u8, v: u8) -> (u8, u8, u8) {
    let y = y as f32;
    let u = u as f32 - 128.0;
    let v = v as f32 - 128.0;

    let r = (y + 1.402 * v).round().clamp(0.0, 255.0) as u8;
    let g = (y - 0.344136 * u - 0.714136 * v).round().clamp(0.0, 255.0) as u8;
    let b = (y + 1.772 * u).round().clamp(0.0, 255.0) as u8;

    (r, g, b)
}

/// Convert RGB to YUV (BT.601, full range)
pub fn rgb_to_yuv(r: u8, g: u8, b: u8) -> (u8, u8, u8) {
    let (r, g, b) = (r as f32, g as f32, b as f32);

    let y = 0.299 * r + 0.587 * g + 0.114 * b;
    let u = -0.168736 * r - 0.331264 * g + 0.5 * b + 128.0;
    let v = 0.5 * r - 0.418688 * g - 0.081312 * b + 128.0;

    (
        y.round().clamp(0.0, 255.0) as u8,
        u.round().clamp(0.0, 255.0) as u8,
        v.round().clamp(0.0, 255.0) as u8,
    )
}

/// Expand a streaming frame to a tightly packed RGBA image
pub fn frame_to_rgba(frame: &CameraFrame) -> BackendResult<RgbaImage> {
    let width = frame.width as usize;
    let height = frame.height as usize;
    let stride = frame.stride as usize;
    let data: &[u8] = &frame.data;

    if width == 0 || height == 0 {
        return Err(BackendError::InvalidFrame("zero-sized frame".to_string()));
    }

    if frame.format.is_yuv() && width % 2 != 0 {
        return Err(BackendError::InvalidFrame(format!(
            "{} frames need an even width, got {}",
            frame.format, width
        )));
    }

    let min_stride = frame.format.packed_stride(frame.width) as usize;
    if stride < min_stride {
        return Err(BackendError::InvalidFrame(format!(
            "stride {} is smaller than a {} row ({} bytes)",
            stride, frame.format, min_stride
        )));
    }

    let main_plane = stride * height;
    let required = match frame.format {
        PixelFormat::NV12 => main_plane + stride * height.div_ceil(2),
        _ => main_plane,
    };
    if data.len() < required {
        return Err(BackendError::InvalidFrame(format!(
            "{} frame {}x{} needs {} bytes, got {}",
            frame.format,
            width,
            height,
            required,
            data.len()
        )));
    }

    let mut rgba = Vec::with_capacity(width * height * 4);

    for y in 0..height {
        let row = &data[y * stride..];
        for x in 0..width {
            let (r, g, b, a) = match frame.format {
                PixelFormat::RGBA => {
                    let p = &row[x * 4..x * 4 + 4];
                    (p[0], p[1], p[2], p[3])
                }
                PixelFormat::BGRA => {
                    let p = &row[x * 4..x * 4 + 4];
                    (p[2], p[1], p[0], p[3])
                }
                PixelFormat::Gray8 => {
                    let v = row[x];
                    (v, v, v, 255)
                }
                PixelFormat::NV12 => {
                    let luma = row[x];
                    let uv_idx = main_plane + (y / 2) * stride + (x & !1);
                    let (r, g, b) = yuv_to_rgb(luma, data[uv_idx], data[uv_idx + 1]);
                    (r, g, b, 255)
                }
                PixelFormat::YUYV => {
                    // Y0 U Y1 V: two pixels share chroma
                    let base = (x & !1) * 2;
                    let luma = if x & 1 == 0 { row[base] } else { row[base + 2] };
                    let (r, g, b) = yuv_to_rgb(luma, row[base + 1], row[base + 3]);
                    (r, g, b, 255)
                }
            };
            rgba.extend_from_slice(&[r, g, b, a]);
        }
    }

    RgbaImage::from_raw(frame.width, frame.height, rgba)
        .ok_or_else(|| BackendError::InvalidFrame("RGBA buffer size mismatch".to_string()))
}

/// Pack an RGBA image into a streaming pixel format
///
/// Used by synthetic sources that render in RGBA and must honour the pixel
/// format requested by the video output.
pub fn rgba_to_format(image: &RgbaImage, format: PixelFormat) -> Vec<u8> {
    let width = image.width() as usize;
    let height = image.height() as usize;
    let mut out = vec![0u8; format.frame_size(image.width(), image.height())];

    match format {
        PixelFormat::RGBA => out.copy_from_slice(image.as_raw()),
        PixelFormat::BGRA => {
            for (dst, src) in out.chunks_exact_mut(4).zip(image.as_raw().chunks_exact(4)) {
                dst.copy_from_slice(&[src[2], src[1], src[0], src[3]]);
            }
        }
        PixelFormat::Gray8 => {
            for (dst, px) in out.iter_mut().zip(image.pixels()) {
                *dst = rgb_to_yuv(px[0], px[1], px[2]).0;
            }
        }
        PixelFormat::NV12 => {
            let uv_base = width * height;
            for y in 0..height {
                for x in 0..width {
                    let px = image.get_pixel(x as u32, y as u32);
                    let (luma, u, v) = rgb_to_yuv(px[0], px[1], px[2]);
                    out[y * width + x] = luma;
                    if y % 2 == 0 && x % 2 == 0 {
                        let idx = uv_base + (y / 2) * width + x;
                        out[idx] = u;
                        if idx + 1 < out.len() {
                            out[idx + 1] = v;
                        }
                    }
                }
            }
        }
        PixelFormat::YUYV => {
            let stride = width * 2;
            for y in 0..height {
                for x in (0..width).step_by(2) {
                    let p0 = image.get_pixel(x as u32, y as u32);
                    let p1 = image.get_pixel((x + 1).min(width - 1) as u32, y as u32);
                    let (y0, u, v) = rgb_to_yuv(p0[0], p0[1], p0[2]);
                    let (y1, _, _) = rgb_to_yuv(p1[0], p1[1], p1[2]);
                    let base = y * stride + x * 2;
                    out[base] = y0;
                    out[base + 1] = u;
                    if base + 3 < (y + 1) * stride {
                        out[base + 2] = y1;
                        out[base + 3] = v;
                    }
                }
            }
        }
    }

    out
}

/// Encode an RGBA image as a JPEG still (alpha is dropped)
pub fn rgba_to_jpeg(image: &RgbaImage, quality: u8) -> BackendResult<Vec<u8>> {
    let rgb = image::DynamicImage::ImageRgba8(image.clone()).to_rgb8();
    let mut jpeg = Vec::new();
    image::codecs::jpeg::JpegEncoder::new_with_quality(&mut jpeg, quality)
        .encode_image(&rgb)
        .map_err(|e| BackendError::Other(format!("JPEG encoding failed: {}", e)))?;
    Ok(jpeg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn solid(width: u32, height: u32, color: [u8; 4]) -> RgbaImage {
        RgbaImage::from_pixel(width, height, Rgba(color))
    }

    fn close(a: u8, b: u8) -> bool {
        (a as i16 - b as i16).abs() <= 2
    }

    #[test]
    fn test_yuv_grey_is_neutral() {
        assert_eq!(yuv_to_rgb(128, 128, 128), (128, 128, 128));
    }

    #[test]
    fn test_nv12_roundtrip_of_solid_color_is_close() {
        let source = solid(4, 4, [200, 40, 90, 255]);
        let packed = rgba_to_format(&source, PixelFormat::NV12);
        let frame = CameraFrame::packed(4, 4, PixelFormat::NV12, packed, 0).unwrap();
        let rgba = frame_to_rgba(&frame).unwrap();

        let px = rgba.get_pixel(3, 3);
        assert!(close(px[0], 200) && close(px[1], 40) && close(px[2], 90));
        assert_eq!(px[3], 255);
    }

    #[test]
    fn test_yuyv_pixel_pair_keeps_both_lumas() {
        let mut source = solid(2, 1, [50, 50, 50, 255]);
        source.put_pixel(1, 0, Rgba([200, 200, 200, 255]));

        let packed = rgba_to_format(&source, PixelFormat::YUYV);
        assert_eq!(packed.len(), 4);
        assert!(packed[0] < packed[2]);

        let frame = CameraFrame::packed(2, 1, PixelFormat::YUYV, packed, 0).unwrap();
        let rgba = frame_to_rgba(&frame).unwrap();
        let (dark, light) = (rgba.get_pixel(0, 0), rgba.get_pixel(1, 0));
        assert!(close(dark[0], 50) && close(dark[1], 50) && close(dark[2], 50));
        assert!(close(light[0], 200) && close(light[1], 200) && close(light[2], 200));
    }

    #[test]
    fn test_bgra_swaps_channels() {
        let frame = CameraFrame::packed(1, 1, PixelFormat::BGRA, vec![1, 2, 3, 4], 0).unwrap();
        let rgba = frame_to_rgba(&frame).unwrap();
        assert_eq!(rgba.get_pixel(0, 0).0, [3, 2, 1, 4]);
    }

    #[test]
    fn test_padded_stride_is_honoured() {
        // 2x2 gray frame with 4-byte rows
        let mut frame = CameraFrame::packed(2, 2, PixelFormat::Gray8, vec![0; 8], 0).unwrap();
        frame.data = vec![10, 20, 0, 0, 30, 40, 0, 0].into();
        frame.stride = 4;

        let rgba = frame_to_rgba(&frame).unwrap();
        assert_eq!(rgba.get_pixel(1, 1).0, [40, 40, 40, 255]);
    }

    #[test]
    fn test_truncated_frame_is_rejected() {
        let mut frame = CameraFrame::packed(2, 2, PixelFormat::RGBA, vec![0; 16], 0).unwrap();
        frame.data = vec![0u8; 7].into();
        assert!(frame_to_rgba(&frame).is_err());
    }
}
