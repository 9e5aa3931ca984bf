// SPDX-License-Identifier: GPL-3.0-only
// Shared types for the capture source

//! Shared types for capture devices and sessions

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

/// Raw frame bytes shared between the capture thread and the delivery thread
///
/// The bytes are reference counted so handing a frame through the mailbox never
/// copies pixel data.
#[derive(Clone)]
pub struct FrameData(Arc<[u8]>);

impl FrameData {
    /// Wrap an owned byte vector
    pub fn from_vec(bytes: Vec<u8>) -> Self {
        FrameData(Arc::from(bytes))
    }

    /// Get the length of the frame data in bytes
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if the frame data is empty
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<u8>> for FrameData {
    fn from(bytes: Vec<u8>) -> Self {
        FrameData::from_vec(bytes)
    }
}

impl std::fmt::Debug for FrameData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "FrameData({} bytes)", self.0.len())
    }
}

impl std::ops::Deref for FrameData {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.0
    }
}

/// Device information reported by a capture backend
#[derive(Debug, Clone, Default)]
pub struct DeviceInfo {
    /// Human readable device name
    pub name: String,
    /// Backend specific identifier (device path, file path, pattern name)
    pub path: String,
    /// Backend that provides the device
    pub backend: String,
}

/// Framerate as a fraction (numerator/denominator)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Framerate {
    pub num: u32,
    pub denom: u32,
}

impl Framerate {
    /// Create a new framerate from numerator and denominator
    pub fn new(num: u32, denom: u32) -> Self {
        Self {
            num,
            denom: if denom == 0 { 1 } else { denom },
        }
    }

    /// Create a framerate from an integer (e.g., 30 becomes 30/1)
    pub fn from_int(fps: u32) -> Self {
        Self::new(fps, 1)
    }

    /// Get the framerate as a floating point value
    pub fn as_f64(&self) -> f64 {
        self.num as f64 / self.denom as f64
    }

    /// Time between two frames at this rate
    pub fn frame_interval(&self) -> std::time::Duration {
        if self.num == 0 {
            return std::time::Duration::from_secs(1);
        }
        std::time::Duration::from_secs_f64(self.denom as f64 / self.num as f64)
    }
}

impl std::fmt::Display for Framerate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.denom != 1 {
            write!(f, "{:.2}", self.as_f64())
        } else {
            write!(f, "{}", self.num)
        }
    }
}

impl Default for Framerate {
    fn default() -> Self {
        Self { num: 30, denom: 1 }
    }
}

/// Capture format offered by a device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CameraFormat {
    pub width: u32,
    pub height: u32,
    pub framerate: Framerate,
    /// Pixel formats the device can deliver at this size
    pub pixel_formats: Vec<PixelFormat>,
}

impl CameraFormat {
    /// Number of pixels per frame
    pub fn pixel_count(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Check whether the device can produce `format` at this size
    pub fn supports(&self, format: PixelFormat) -> bool {
        self.pixel_formats.contains(&format)
    }
}

impl std::fmt::Display for CameraFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{} @ {}fps", self.width, self.height, self.framerate)
    }
}

/// Pixel format tag carried by every streaming frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum PixelFormat {
    /// RGBA - 32-bit with alpha (4 bytes per pixel)
    RGBA,
    /// BGRA - 32-bit with alpha (B G R A byte order)
    BGRA,
    /// NV12 - Semi-planar 4:2:0, full-range (Y plane + interleaved UV plane)
    #[default]
    NV12,
    /// YUYV - Packed 4:2:2 (Y0 U Y1 V interleaved)
    YUYV,
    /// Gray8 - 8-bit grayscale (single channel)
    Gray8,
}

impl PixelFormat {
    /// Check if this format is a YUV format
    pub fn is_yuv(&self) -> bool {
        matches!(self, Self::NV12 | Self::YUYV)
    }

    /// Default row stride for a tightly packed frame of `width` pixels
    ///
    /// For NV12 this is the stride of the Y plane (the UV plane shares it).
    pub fn packed_stride(&self, width: u32) -> u32 {
        match self {
            Self::RGBA | Self::BGRA => width * 4,
            Self::NV12 | Self::Gray8 => width,
            Self::YUYV => width * 2,
        }
    }

    /// Size of a tightly packed frame in bytes
    pub fn frame_size(&self, width: u32, height: u32) -> usize {
        let stride = self.packed_stride(width) as usize;
        match self {
            Self::NV12 => stride * height as usize + stride * height.div_ceil(2) as usize,
            _ => stride * height as usize,
        }
    }

    /// Convert to a GStreamer video/x-raw format string
    pub fn to_gst_format_string(&self) -> &'static str {
        match self {
            Self::RGBA => "RGBA",
            Self::BGRA => "BGRA",
            Self::NV12 => "NV12",
            Self::YUYV => "YUY2",
            Self::Gray8 => "GRAY8",
        }
    }

    /// Parse format from a GStreamer or FourCC format string
    pub fn from_gst_format(format: &str) -> Option<Self> {
        match format {
            "RGBA" | "RGBx" => Some(Self::RGBA),
            "BGRA" | "BGRx" => Some(Self::BGRA),
            "NV12" => Some(Self::NV12),
            "YUYV" | "YUY2" => Some(Self::YUYV),
            "GRAY8" | "GREY" | "Y8" => Some(Self::Gray8),
            _ => None,
        }
    }
}

impl std::fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.to_gst_format_string())
    }
}

/// A single streaming frame from the capture source (the pixel buffer)
///
/// Delegates receive frames by reference for the duration of one callback and
/// must not keep them afterwards.
#[derive(Debug, Clone)]
pub struct CameraFrame {
    pub width: u32,
    pub height: u32,
    /// Pixel data; for NV12 the UV plane follows the Y plane at `stride * height`
    pub data: FrameData,
    /// Pixel format of the data
    pub format: PixelFormat,
    /// Row stride for the main plane (bytes per row, may include padding)
    pub stride: u32,
    /// Monotonic sequence number assigned by the producing device
    pub sequence: u64,
    /// Timestamp when frame was captured
    pub captured_at: Instant,
}

impl CameraFrame {
    /// Build a tightly packed frame, checking that the buffer is large enough
    pub fn packed(
        width: u32,
        height: u32,
        format: PixelFormat,
        data: Vec<u8>,
        sequence: u64,
    ) -> BackendResult<Self> {
        let expected = format.frame_size(width, height);
        if data.len() < expected {
            return Err(BackendError::InvalidFrame(format!(
                "{} frame {}x{} needs {} bytes, got {}",
                format,
                width,
                height,
                expected,
                data.len()
            )));
        }

        Ok(Self {
            width,
            height,
            data: FrameData::from_vec(data),
            format,
            stride: format.packed_stride(width),
            sequence,
            captured_at: Instant::now(),
        })
    }
}

/// Result type for backend operations
pub type BackendResult<T> = Result<T, BackendError>;

/// Error types for capture device and session operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// Backend is not available on this system
    NotAvailable(String),
    /// No device with video capability was found
    DeviceNotFound(String),
    /// Opening the device input failed
    InputRejected(String),
    /// An output could not be attached to the session
    OutputRejected(String),
    /// Format not supported
    FormatNotSupported(String),
    /// The session has no committed configuration
    NotConfigured,
    /// The session has no still output bound to a video connection
    NoVideoConnection,
    /// A frame arrived with inconsistent geometry
    InvalidFrame(String),
    /// The device stopped producing frames
    Disconnected,
    /// General I/O error
    IoError(String),
    /// Other errors
    Other(String),
}

impl std::fmt::Display for BackendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendError::NotAvailable(msg) => write!(f, "Backend not available: {}", msg),
            BackendError::DeviceNotFound(msg) => write!(f, "Device not found: {}", msg),
            BackendError::InputRejected(msg) => write!(f, "Device input rejected: {}", msg),
            BackendError::OutputRejected(msg) => write!(f, "Output rejected: {}", msg),
            BackendError::FormatNotSupported(msg) => write!(f, "Format not supported: {}", msg),
            BackendError::NotConfigured => write!(f, "Capture session is not configured"),
            BackendError::NoVideoConnection => write!(f, "No active video connection"),
            BackendError::InvalidFrame(msg) => write!(f, "Invalid frame: {}", msg),
            BackendError::Disconnected => write!(f, "Device disconnected"),
            BackendError::IoError(msg) => write!(f, "I/O error: {}", msg),
            BackendError::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for BackendError {}

impl From<std::io::Error> for BackendError {
    fn from(err: std::io::Error) -> Self {
        BackendError::IoError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nv12_frame_size_includes_chroma_plane() {
        assert_eq!(PixelFormat::NV12.frame_size(4, 2), 4 * 2 + 4);
        assert_eq!(PixelFormat::NV12.frame_size(4, 3), 4 * 3 + 4 * 2);
        assert_eq!(PixelFormat::RGBA.frame_size(4, 2), 32);
    }

    #[test]
    fn test_packed_frame_rejects_short_buffer() {
        let err = CameraFrame::packed(4, 4, PixelFormat::RGBA, vec![0; 10], 0).unwrap_err();
        assert!(matches!(err, BackendError::InvalidFrame(_)));
    }

    #[test]
    fn test_gst_format_roundtrip_names() {
        assert_eq!(PixelFormat::from_gst_format("YUY2"), Some(PixelFormat::YUYV));
        assert_eq!(PixelFormat::from_gst_format("I420"), None);
    }

    #[test]
    fn test_frame_interval() {
        let interval = Framerate::from_int(25).frame_interval();
        assert_eq!(interval.as_millis(), 40);
    }
}
