// SPDX-License-Identifier: GPL-3.0-only

//! Image processing context and the rotation stage
//!
//! ```text
//! CameraFrame / JPEG ──▶ GpuImage ──▶ apply_filter("affine-transform") ──▶ GpuImage
//!                                                                            │
//!                                          Rasterizer (software or wgpu) ◀───┘
//! ```
//!
//! - [`geometry`]: points, rectangles and affine transforms (y-up)
//! - [`gpu_image`]: the lazy [`GpuImage`] handle
//! - [`context`]: filter lookup and rasterization
//! - [`rasterizer`]: resampling backends
//! - [`transform`]: the 90° clockwise rotation stage

pub mod context;
pub mod geometry;
pub mod gpu_image;
pub mod rasterizer;
pub mod transform;

pub use context::{
    AFFINE_TRANSFORM_FILTER, FilterParameters, FilterValue, INPUT_IMAGE, INPUT_TRANSFORM,
    ImageContext,
};
pub use geometry::{AffineTransform, Point, Rect};
pub use gpu_image::GpuImage;
pub use rasterizer::{Rasterizer, SoftwareRasterizer};
pub use transform::{TransformStage, rotation_transform};

use std::fmt;

/// Errors from filters and rasterization
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterError {
    /// No filter with this name exists
    UnknownFilter(String),
    /// A required parameter was not supplied
    MissingParameter(&'static str),
    /// A parameter holds the wrong kind of value
    WrongParameterType(&'static str),
    /// The transform cannot be inverted, so the image cannot be sampled
    NonInvertibleTransform,
    /// The image or the requested area has no pixels
    EmptyImage,
    /// The input pixels could not be turned into an image
    InvalidInput(String),
    /// The rasterizer backend failed
    Backend(String),
}

impl fmt::Display for FilterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterError::UnknownFilter(name) => write!(f, "Unknown filter: {}", name),
            FilterError::MissingParameter(key) => write!(f, "Missing filter parameter: {}", key),
            FilterError::WrongParameterType(key) => {
                write!(f, "Wrong type for filter parameter: {}", key)
            }
            FilterError::NonInvertibleTransform => write!(f, "Transform is not invertible"),
            FilterError::EmptyImage => write!(f, "Image is empty"),
            FilterError::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
            FilterError::Backend(msg) => write!(f, "Rasterizer error: {}", msg),
        }
    }
}

impl std::error::Error for FilterError {}
