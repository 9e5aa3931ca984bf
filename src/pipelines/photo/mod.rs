// SPDX-License-Identifier: GPL-3.0-only

//! Still photo path
//!
//! ```text
//! StillImageOutput ──JPEG──▶ decode ──▶ rotate ──▶ rasterize ──▶ CapturedStillSlot
//!        (blocking task)                                              │
//!                                                save_photo ◀── snapshot
//! ```
//!
//! Preview keeps running while a still is captured and processed.

pub mod capture;
pub mod encoding;

pub use capture::StillCapturePath;
pub use encoding::{EncodingFormat, encode, encode_png};

use chrono::{DateTime, Local};
use image::RgbaImage;
use std::sync::{Arc, Mutex};
use tracing::debug;

/// The most recent rotated still, upright with scale 1
#[derive(Debug, Clone)]
pub struct CapturedStill {
    pub image: Arc<RgbaImage>,
    pub captured_at: DateTime<Local>,
}

impl CapturedStill {
    pub fn new(image: RgbaImage) -> Self {
        Self {
            image: Arc::new(image),
            captured_at: Local::now(),
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }
}

/// Holds at most one captured still
///
/// Every store overwrites the previous still; nothing ever clears it.
/// Readers get a snapshot of the value at the time of the call.
#[derive(Debug, Default)]
pub struct CapturedStillSlot {
    still: Mutex<Option<CapturedStill>>,
}

impl CapturedStillSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn store(&self, still: CapturedStill) {
        let (width, height) = still.dimensions();
        let mut slot = self.still.lock().unwrap_or_else(|e| e.into_inner());
        let replaced = slot.replace(still).is_some();
        debug!(width, height, replaced, "Captured still stored");
    }

    pub fn snapshot(&self) -> Option<CapturedStill> {
        self.still.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn is_empty(&self) -> bool {
        self.still.lock().unwrap_or_else(|e| e.into_inner()).is_none()
    }
}
