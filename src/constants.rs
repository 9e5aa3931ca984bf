// SPDX-License-Identifier: GPL-3.0-only

//! Application-wide constants

use std::time::Duration;

/// Capture session constants
pub mod capture {
    use super::Duration;

    /// Label of the serial queue that delivers preview frames
    pub const DELIVERY_QUEUE_LABEL: &str = "video-streaming";

    /// Name of the thread that reads frames from the device input
    pub const CAPTURE_THREAD_NAME: &str = "camera-capture";

    /// How long the capture thread waits for one frame before checking for stop
    pub const FRAME_READ_TIMEOUT: Duration = Duration::from_millis(100);

    /// How long the delivery thread waits on an empty mailbox before checking for stop
    pub const DELIVERY_POLL_INTERVAL: Duration = Duration::from_millis(50);
}

/// GStreamer pipeline constants
pub mod pipeline {
    /// Maximum buffer queue size in the appsink (latest frame only)
    pub const MAX_BUFFERS: u32 = 1;

    /// Get number of threads for videoconvert based on available CPU threads
    pub fn videoconvert_threads() -> u32 {
        std::thread::available_parallelism()
            .map(|n| n.get() as u32)
            .unwrap_or(4)
    }
}

/// Timing constants
pub mod timing {
    /// Frame counter modulo for periodic logging
    pub const FRAME_LOG_INTERVAL: u64 = 30;

    /// Pipeline state change timeout on stop
    pub const STOP_TIMEOUT_SECS: u64 = 2;

    /// Pipeline playing state timeout on start
    pub const START_TIMEOUT_SECS: u64 = 5;

    /// Terminal UI redraw/poll interval
    pub const UI_TICK_MS: u64 = 33;
}

/// Still photo constants
pub mod photo {
    /// JPEG quality requested from the still output
    pub const JPEG_QUALITY: u8 = 92;

    /// File name of the single overwritten photo file
    pub const FILE_NAME: &str = "camera_capture_photo.png";

    /// Directory name of the default photo library (under the Pictures directory)
    pub const LIBRARY_DIR_NAME: &str = "camera-photo";

    /// Library file name prefix (`IMG_<timestamp>_<id>.png`)
    pub const LIBRARY_FILE_PREFIX: &str = "IMG";
}

/// Render sink constants
pub mod render {
    /// Default screen scale used when sizing the drawable surface
    pub const DEFAULT_DISPLAY_SCALE: f64 = 1.0;

    /// View bounds used by headless modes (points)
    pub const HEADLESS_VIEW_BOUNDS: (u32, u32) = (320, 240);
}

/// Resolution labels for device listings
pub fn get_resolution_label(width: u32) -> Option<&'static str> {
    match width {
        w if w >= 3840 => Some("4K"), // 3840x2160
        w if w >= 2560 => Some("2K"), // 2560x1440
        w if w >= 1920 => Some("HD"), // 1920x1080
        w if w >= 1280 => Some("720p"),
        w if w >= 640 => Some("SD"), // 640x480
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolution_labels() {
        assert_eq!(get_resolution_label(3840), Some("4K"));
        assert_eq!(get_resolution_label(1920), Some("HD"));
        assert_eq!(get_resolution_label(1280), Some("720p"));
        assert_eq!(get_resolution_label(640), Some("SD"));
        assert_eq!(get_resolution_label(320), None);
    }

    #[test]
    fn test_delivery_poll_shorter_than_read_timeout() {
        assert!(capture::DELIVERY_POLL_INTERVAL <= capture::FRAME_READ_TIMEOUT);
    }
}
