// SPDX-License-Identifier: GPL-3.0-only

//! Camera Photo - a rotated live camera preview with still capture
//!
//! Every preview frame is turned 90° clockwise and drawn to a surface. A still
//! can be captured on demand, rotated the same way, and saved to a photo
//! library.
//!
//! # Architecture
//!
//! - [`backends`]: capture devices and the capture session
//! - [`imaging`]: lazy images, affine transforms and the rotation stage
//! - [`render`]: rendering session, drawable surface and render sink
//! - [`pipelines`]: the preview delegate and the still capture path
//! - [`storage`]: photo file, photo library and the persistence gateway
//! - [`app`]: the controller wiring everything together
//! - [`config`]: user configuration handling
//! - [`terminal`]: interactive terminal viewer
//!
//! # Example
//!
//! ```ignore
//! // Interactive preview in the terminal:
//! // camera-photo --device test-pattern
//! ```

pub mod app;
pub mod backends;
pub mod config;
pub mod constants;
pub mod errors;
#[cfg(feature = "gpu")]
pub mod gpu;
pub mod imaging;
pub mod media;
pub mod pipelines;
pub mod render;
pub mod shaders;
pub mod storage;
pub mod terminal;

// Re-export commonly used types
pub use app::{CameraController, ControllerEvent};
pub use config::Config;
pub use errors::{AppError, AppResult, PhotoError};
