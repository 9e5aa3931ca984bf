// SPDX-License-Identifier: GPL-3.0-only

//! Image file capture device
//!
//! Streams a still image file as if it were a camera. The frame size is the
//! image size (cropped by one column for odd widths so YUV formats work).

use super::frame_loop::FrameClock;
use super::types::{
    BackendError, BackendResult, CameraFormat, CameraFrame, DeviceInfo, Framerate, PixelFormat,
};
use super::{CaptureDevice, DeviceInput};
use crate::media::{rgba_to_format, rgba_to_jpeg};
use image::RgbaImage;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::info;

/// Capture device backed by an image on disk
pub struct ImageFileDevice {
    info: DeviceInfo,
    image: Arc<RgbaImage>,
    framerate: Framerate,
}

impl ImageFileDevice {
    /// Load `path` and prepare it for streaming
    pub fn open(path: &Path) -> BackendResult<Self> {
        info!(path = %path.display(), "Loading image file");

        let img = image::open(path).map_err(|e| {
            BackendError::DeviceNotFound(format!(
                "Failed to load image '{}': {}",
                path.display(),
                e
            ))
        })?;

        Self::from_image(path.to_path_buf(), img.to_rgba8())
    }

    /// Wrap an already decoded image
    pub fn from_image(path: PathBuf, rgba: RgbaImage) -> BackendResult<Self> {
        let width = rgba.width() & !1;
        let height = rgba.height();
        if width == 0 || height == 0 {
            return Err(BackendError::InvalidFrame(format!(
                "image '{}' is too small to stream",
                path.display()
            )));
        }

        let rgba = if width != rgba.width() {
            image::imageops::crop_imm(&rgba, 0, 0, width, height).to_image()
        } else {
            rgba
        };

        info!(width, height, "Image loaded successfully");

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "Image".to_string());

        Ok(Self {
            info: DeviceInfo {
                name,
                path: path.display().to_string(),
                backend: "file".to_string(),
            },
            image: Arc::new(rgba),
            framerate: Framerate::from_int(15),
        })
    }
}

impl CaptureDevice for ImageFileDevice {
    fn info(&self) -> &DeviceInfo {
        &self.info
    }

    fn has_video(&self) -> bool {
        true
    }

    fn formats(&self) -> Vec<CameraFormat> {
        vec![CameraFormat {
            width: self.image.width(),
            height: self.image.height(),
            framerate: self.framerate,
            pixel_formats: vec![
                PixelFormat::NV12,
                PixelFormat::RGBA,
                PixelFormat::BGRA,
                PixelFormat::YUYV,
                PixelFormat::Gray8,
            ],
        }]
    }

    fn open(&self, format: &CameraFormat) -> BackendResult<Arc<dyn DeviceInput>> {
        if format.width != self.image.width() || format.height != self.image.height() {
            return Err(BackendError::InputRejected(format!(
                "{} only streams at {}x{}",
                self.info.name,
                self.image.width(),
                self.image.height()
            )));
        }

        Ok(Arc::new(ImageFileInput {
            format: format.clone(),
            image: Arc::clone(&self.image),
            clock: FrameClock::new(format.framerate.frame_interval()),
            sequence: AtomicU64::new(0),
        }))
    }
}

struct ImageFileInput {
    format: CameraFormat,
    image: Arc<RgbaImage>,
    clock: FrameClock,
    sequence: AtomicU64,
}

impl DeviceInput for ImageFileInput {
    fn format(&self) -> &CameraFormat {
        &self.format
    }

    fn read_frame(
        &self,
        pixel_format: PixelFormat,
        timeout: Duration,
    ) -> BackendResult<Option<CameraFrame>> {
        if !self.format.supports(pixel_format) {
            return Err(BackendError::FormatNotSupported(pixel_format.to_string()));
        }
        if !self.clock.wait_next(timeout) {
            return Ok(None);
        }

        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed);
        let data = rgba_to_format(&self.image, pixel_format);
        CameraFrame::packed(
            self.image.width(),
            self.image.height(),
            pixel_format,
            data,
            sequence,
        )
        .map(Some)
    }

    fn capture_still_jpeg(&self, quality: u8) -> BackendResult<Vec<u8>> {
        rgba_to_jpeg(&self.image, quality)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn test_odd_width_is_cropped() {
        let rgba = RgbaImage::from_pixel(5, 3, Rgba([1, 2, 3, 255]));
        let device = ImageFileDevice::from_image("odd.png".into(), rgba).unwrap();
        let format = &device.formats()[0];
        assert_eq!((format.width, format.height), (4, 3));
        assert_eq!(device.info().name, "odd.png");
    }

    #[test]
    fn test_open_rejects_other_sizes() {
        let rgba = RgbaImage::new(4, 4);
        let device = ImageFileDevice::from_image("a.png".into(), rgba).unwrap();
        let mut format = device.formats()[0].clone();
        format.width = 8;
        assert!(matches!(
            device.open(&format),
            Err(BackendError::InputRejected(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        let result = ImageFileDevice::open(Path::new("/nonexistent/frame.png"));
        assert!(matches!(result, Err(BackendError::DeviceNotFound(_))));
    }

    #[test]
    fn test_streams_rgba_copy_of_image() {
        let rgba = RgbaImage::from_pixel(2, 2, Rgba([9, 8, 7, 255]));
        let device = ImageFileDevice::from_image("a.png".into(), rgba).unwrap();
        let input = device.open(&device.formats()[0]).unwrap();
        let frame = input
            .read_frame(PixelFormat::RGBA, Duration::from_millis(200))
            .unwrap()
            .unwrap();
        assert_eq!(&frame.data[..4], &[9, 8, 7, 255]);
    }
}
