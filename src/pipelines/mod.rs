// SPDX-License-Identifier: GPL-3.0-only

//! Processing pipelines for the preview and for still photos
//!
//! ```text
//! ┌──────────────┐     ┌───────────────────┐     ┌──────────────┐
//! │ Camera Frame │ ──▶ │ Preview Pipeline  │ ──▶ │ Render Sink  │
//! │ (delivery    │     │  - GpuImage       │     │ (surface)    │
//! │  thread)     │     │  - rotate 90° CW  │     │              │
//! └──────────────┘     └───────────────────┘     └──────────────┘
//!
//! ┌──────────────┐     ┌───────────────────┐     ┌──────────────┐
//! │ Still output │ ──▶ │  Photo Pipeline   │ ──▶ │ CapturedStill│
//! │   (JPEG)     │     │  - decode         │     │    slot      │
//! │              │     │  - rotate 90° CW  │     │              │
//! │              │     │  - rasterize      │     │              │
//! └──────────────┘     └───────────────────┘     └──────────────┘
//! ```
//!
//! - [`preview`]: per-frame delegate on the delivery thread
//! - [`photo`]: async still capture and PNG/JPEG encoding

pub mod photo;
pub mod preview;

pub use photo::{CapturedStill, CapturedStillSlot, StillCapturePath};
pub use preview::PreviewPipeline;
