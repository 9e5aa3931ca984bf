// SPDX-License-Identifier: GPL-3.0-only

//! Rotation stage shared by the preview and the still path

use super::FilterError;
use super::context::{
    AFFINE_TRANSFORM_FILTER, FilterParameters, INPUT_IMAGE, INPUT_TRANSFORM, ImageContext,
};
use super::geometry::{AffineTransform, Rect};
use super::gpu_image::GpuImage;
use std::f64::consts::FRAC_PI_2;
use std::sync::Arc;

/// Clockwise quarter turn about the centre of `extent`
///
/// Built as translate(+c) · rotate(-90°) · translate(-c), so points are first
/// moved to the centre, rotated, then moved back.
pub fn rotation_transform(extent: &Rect) -> AffineTransform {
    let center = extent.center();
    AffineTransform::translation(center.x, center.y)
        .rotated(-FRAC_PI_2)
        .translated(-center.x, -center.y)
}

/// Applies the fixed 90° clockwise rotation through the image context
#[derive(Clone)]
pub struct TransformStage {
    context: Arc<ImageContext>,
}

impl TransformStage {
    pub fn new(context: Arc<ImageContext>) -> Self {
        Self { context }
    }

    pub fn context(&self) -> &Arc<ImageContext> {
        &self.context
    }

    /// Rotate `image` by 90° clockwise
    ///
    /// The transform is computed from this image's extent on every call.
    pub fn rotate(&self, image: GpuImage) -> Result<GpuImage, FilterError> {
        let transform = rotation_transform(&image.extent());
        self.context.apply_filter(
            AFFINE_TRANSFORM_FILTER,
            FilterParameters::new()
                .with_image(INPUT_IMAGE, image)
                .with_transform(INPUT_TRANSFORM, transform),
        )
    }
}
