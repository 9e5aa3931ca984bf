// SPDX-License-Identifier: GPL-3.0-only

//! Backend abstraction layer for camera capture
//!
//! The backend layer hides how frames are obtained, so the rest of the
//! application only sees capture devices, a capture session and frames:
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │                  App Layer                   │
//! └────────────────────┬────────────────────────┘
//!                      │
//! ┌────────────────────┴────────────────────────┐
//! │              Backend Layer                   │
//! │  ┌─────────────┐ ┌────────────┐ ┌─────────┐ │
//! │  │ Test pattern│ │ Image file │ │GStreamer│ │
//! │  └─────────────┘ └────────────┘ └─────────┘ │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`camera`]: Capture devices, capture session and frame delivery

pub mod camera;
