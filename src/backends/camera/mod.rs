// SPDX-License-Identifier: GPL-3.0-only

//! Capture source
//!
//! ```text
//! ┌─────────────────────┐
//! │  CameraController   │
//! └──────────┬──────────┘
//!            │ configure / start / capture still
//!            ▼
//! ┌─────────────────────┐     ┌──────────────┐     ┌──────────────────┐
//! │   CaptureSession    │ ──▶ │ FrameMailbox │ ──▶ │ SampleBuffer     │
//! │ (capture thread)    │     │ (latest one) │     │ Delegate (serial │
//! └──────────┬──────────┘     └──────────────┘     │ delivery thread) │
//!            │                                     └──────────────────┘
//!            ▼
//! ┌─────────────────────┐
//! │ CaptureDevice trait │  ← test pattern, image file, GStreamer camera
//! └─────────────────────┘
//! ```

pub mod file_source;
pub mod frame_loop;
#[cfg(feature = "gstreamer")]
pub mod gstreamer;
pub mod mailbox;
pub mod session;
pub mod test_pattern;
pub mod types;

pub use mailbox::FrameMailbox;
pub use session::{
    CaptureSession, SampleBufferDelegate, SessionConfiguration, StillImageOutput,
    VideoDataOutput,
};
pub use types::*;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// A capture device (the hardware side of the capture source)
pub trait CaptureDevice: Send + Sync {
    /// Describe the device
    fn info(&self) -> &DeviceInfo;

    /// Whether the device can deliver video frames at all
    fn has_video(&self) -> bool;

    /// Formats the device can stream
    fn formats(&self) -> Vec<CameraFormat>;

    /// Open the device as a session input with the given format
    fn open(&self, format: &CameraFormat) -> BackendResult<Arc<dyn DeviceInput>>;
}

/// An opened device input
///
/// Streaming and still capture are independent: `read_frame` is called from the
/// session's capture thread while `capture_still_jpeg` runs on a background
/// task, possibly at the same time.
pub trait DeviceInput: Send + Sync {
    /// The format the input was opened with
    fn format(&self) -> &CameraFormat;

    /// Wait up to `timeout` for the next streaming frame in `pixel_format`
    ///
    /// Returns `Ok(None)` when no frame became ready in time.
    fn read_frame(
        &self,
        pixel_format: PixelFormat,
        timeout: Duration,
    ) -> BackendResult<Option<CameraFrame>>;

    /// Capture one full-resolution still, JPEG encoded
    fn capture_still_jpeg(&self, quality: u8) -> BackendResult<Vec<u8>>;
}

/// Which device the application captures from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case", tag = "kind", content = "value")]
pub enum DeviceSelection {
    /// Synthetic moving test pattern
    #[default]
    TestPattern,
    /// Stream a still image file as if it were a camera
    ImageFile(PathBuf),
    /// First hardware camera found by GStreamer
    Camera,
}

impl std::str::FromStr for DeviceSelection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "test-pattern" | "pattern" => Ok(DeviceSelection::TestPattern),
            "camera" => Ok(DeviceSelection::Camera),
            other => match other.strip_prefix("file:") {
                Some(path) if !path.is_empty() => Ok(DeviceSelection::ImageFile(path.into())),
                _ => Err(format!(
                    "unknown device '{}', expected test-pattern, camera or file:<path>",
                    other
                )),
            },
        }
    }
}

impl std::fmt::Display for DeviceSelection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeviceSelection::TestPattern => write!(f, "test-pattern"),
            DeviceSelection::ImageFile(path) => write!(f, "file:{}", path.display()),
            DeviceSelection::Camera => write!(f, "camera"),
        }
    }
}

/// Session preset: which streaming resolution to pick from the device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum CapturePreset {
    /// Highest resolution the device offers
    #[default]
    Photo,
    /// 1920x1080
    High,
    /// 1280x720
    Medium,
    /// 640x480
    Low,
}

impl CapturePreset {
    /// Target pixel count, `None` means "largest available"
    fn target_pixels(&self) -> Option<u64> {
        match self {
            CapturePreset::Photo => None,
            CapturePreset::High => Some(1920 * 1080),
            CapturePreset::Medium => Some(1280 * 720),
            CapturePreset::Low => Some(640 * 480),
        }
    }

    /// Pick the device format closest to this preset
    pub fn select_format(&self, formats: &[CameraFormat]) -> Option<CameraFormat> {
        match self.target_pixels() {
            None => formats.iter().max_by_key(|f| f.pixel_count()).cloned(),
            Some(target) => formats
                .iter()
                .min_by_key(|f| f.pixel_count().abs_diff(target))
                .cloned(),
        }
    }
}

/// Resolve a device selection to a concrete capture device
///
/// This is the "default video device" lookup: the selected device must be able
/// to deliver video. `framerate` overrides the test pattern's rate.
pub fn default_device(
    selection: &DeviceSelection,
    framerate: Option<Framerate>,
) -> BackendResult<Arc<dyn CaptureDevice>> {
    let device: Arc<dyn CaptureDevice> = match selection {
        DeviceSelection::TestPattern => Arc::new(test_pattern::TestPatternDevice::with_framerate(
            framerate.unwrap_or_default(),
        )),
        DeviceSelection::ImageFile(path) => Arc::new(file_source::ImageFileDevice::open(path)?),
        DeviceSelection::Camera => camera_device()?,
    };

    if !device.has_video() {
        return Err(BackendError::DeviceNotFound(format!(
            "{} has no video capability",
            device.info().name
        )));
    }

    Ok(device)
}

#[cfg(feature = "gstreamer")]
fn camera_device() -> BackendResult<Arc<dyn CaptureDevice>> {
    Ok(Arc::new(gstreamer::GstCameraDevice::default_camera()?))
}

#[cfg(not(feature = "gstreamer"))]
fn camera_device() -> BackendResult<Arc<dyn CaptureDevice>> {
    Err(BackendError::NotAvailable(
        "hardware cameras need the 'gstreamer' feature".to_string(),
    ))
}

/// List the devices that can be selected on this system
pub fn enumerate_devices() -> Vec<(DeviceSelection, DeviceInfo, Vec<CameraFormat>)> {
    let mut devices = Vec::new();

    let pattern = test_pattern::TestPatternDevice::new();
    devices.push((
        DeviceSelection::TestPattern,
        pattern.info().clone(),
        pattern.formats(),
    ));

    if let Ok(camera) = camera_device() {
        devices.push((
            DeviceSelection::Camera,
            camera.info().clone(),
            camera.formats(),
        ));
    }

    devices
}
