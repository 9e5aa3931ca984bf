// SPDX-License-Identifier: GPL-3.0-only

//! Media helpers shared by capture backends and the image context
//!
//! - [`conversions`]: pixel buffer ↔ RGBA conversion

pub mod conversions;

pub use conversions::{frame_to_rgba, rgba_to_format, rgba_to_jpeg};
