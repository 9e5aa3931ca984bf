// SPDX-License-Identifier: GPL-3.0-only

//! Synthetic capture device
//!
//! Renders scrolling colour bars with a white marker in the top-left corner so
//! the orientation of the rotated preview is obvious at a glance.

use super::frame_loop::FrameClock;
use super::types::{
    BackendError, BackendResult, CameraFormat, CameraFrame, DeviceInfo, Framerate, PixelFormat,
};
use super::{CaptureDevice, DeviceInput};
use crate::media::{rgba_to_format, rgba_to_jpeg};
use image::{Rgba, RgbaImage};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::debug;

const BARS: [[u8; 3]; 8] = [
    [235, 235, 235],
    [235, 235, 16],
    [16, 235, 235],
    [16, 235, 16],
    [235, 16, 235],
    [235, 16, 16],
    [16, 16, 235],
    [16, 16, 16],
];

const PIXEL_FORMATS: [PixelFormat; 5] = [
    PixelFormat::NV12,
    PixelFormat::RGBA,
    PixelFormat::BGRA,
    PixelFormat::YUYV,
    PixelFormat::Gray8,
];

/// Render one frame of the pattern
///
/// Bars scroll one column every frame; the marker covers the top-left
/// `width / 8 x height / 8` block.
pub fn render_pattern(width: u32, height: u32, sequence: u64) -> RgbaImage {
    let bar_width = (width / BARS.len() as u32).max(1);
    let marker_w = (width / 8).max(1);
    let marker_h = (height / 8).max(1);
    let shift = (sequence % width.max(1) as u64) as u32;

    RgbaImage::from_fn(width, height, |x, y| {
        if x < marker_w && y < marker_h {
            return Rgba([255, 255, 255, 255]);
        }
        let bar = (((x + shift) % width) / bar_width) as usize % BARS.len();
        let [r, g, b] = BARS[bar];
        Rgba([r, g, b, 255])
    })
}

/// Always-available synthetic camera
pub struct TestPatternDevice {
    info: DeviceInfo,
    framerate: Framerate,
}

impl TestPatternDevice {
    pub fn new() -> Self {
        Self::with_framerate(Framerate::default())
    }

    pub fn with_framerate(framerate: Framerate) -> Self {
        Self {
            info: DeviceInfo {
                name: "Test Pattern".to_string(),
                path: "pattern:bars".to_string(),
                backend: "synthetic".to_string(),
            },
            framerate,
        }
    }
}

impl Default for TestPatternDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptureDevice for TestPatternDevice {
    fn info(&self) -> &DeviceInfo {
        &self.info
    }

    fn has_video(&self) -> bool {
        true
    }

    fn formats(&self) -> Vec<CameraFormat> {
        [(640, 480), (1280, 720), (1920, 1080)]
            .into_iter()
            .map(|(width, height)| CameraFormat {
                width,
                height,
                framerate: self.framerate,
                pixel_formats: PIXEL_FORMATS.to_vec(),
            })
            .collect()
    }

    fn open(&self, format: &CameraFormat) -> BackendResult<Arc<dyn DeviceInput>> {
        if format.width == 0 || format.height == 0 || format.width % 2 != 0 {
            return Err(BackendError::InputRejected(format!(
                "test pattern cannot produce {}",
                format
            )));
        }

        debug!(format = %format, "Opening test pattern input");
        Ok(Arc::new(TestPatternInput {
            format: format.clone(),
            clock: FrameClock::new(format.framerate.frame_interval()),
            sequence: AtomicU64::new(0),
        }))
    }
}

struct TestPatternInput {
    format: CameraFormat,
    clock: FrameClock,
    sequence: AtomicU64,
}

impl DeviceInput for TestPatternInput {
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
        let rgba = render_pattern(self.format.width, self.format.height, sequence);
        let data = rgba_to_format(&rgba, pixel_format);
        CameraFrame::packed(
            self.format.width,
            self.format.height,
            pixel_format,
            data,
            sequence,
        )
        .map(Some)
    }

    fn capture_still_jpeg(&self, quality: u8) -> BackendResult<Vec<u8>> {
        let sequence = self.sequence.load(Ordering::Relaxed);
        let rgba = render_pattern(self.format.width, self.format.height, sequence);
        rgba_to_jpeg(&rgba, quality)
    }
}
