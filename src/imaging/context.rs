// SPDX-License-Identifier: GPL-3.0-only

//! Image context: filter lookup and rasterization

use super::FilterError;
use super::geometry::{AffineTransform, Rect};
use super::gpu_image::GpuImage;
use super::rasterizer::{Rasterizer, SoftwareRasterizer};
use image::RgbaImage;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Name of the affine transform filter
pub const AFFINE_TRANSFORM_FILTER: &str = "affine-transform";
/// Parameter key of a filter's input image
pub const INPUT_IMAGE: &str = "input_image";
/// Parameter key of the affine filter's transform
pub const INPUT_TRANSFORM: &str = "input_transform";

/// A single filter parameter value
#[derive(Debug, Clone)]
pub enum FilterValue {
    Image(GpuImage),
    Transform(AffineTransform),
}

/// Named filter parameters
#[derive(Debug, Clone, Default)]
pub struct FilterParameters {
    values: HashMap<&'static str, FilterValue>,
}

impl FilterParameters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_image(mut self, key: &'static str, image: GpuImage) -> Self {
        self.values.insert(key, FilterValue::Image(image));
        self
    }

    pub fn with_transform(mut self, key: &'static str, transform: AffineTransform) -> Self {
        self.values.insert(key, FilterValue::Transform(transform));
        self
    }

    fn take_image(&mut self, key: &'static str) -> Result<GpuImage, FilterError> {
        match self.values.remove(key) {
            Some(FilterValue::Image(image)) => Ok(image),
            Some(_) => Err(FilterError::WrongParameterType(key)),
            None => Err(FilterError::MissingParameter(key)),
        }
    }

    fn take_transform(&mut self, key: &'static str) -> Result<AffineTransform, FilterError> {
        match self.values.remove(key) {
            Some(FilterValue::Transform(transform)) => Ok(transform),
            Some(_) => Err(FilterError::WrongParameterType(key)),
            None => Err(FilterError::MissingParameter(key)),
        }
    }
}

/// Image context
///
/// Applies named filters to [`GpuImage`]s and turns images into pixels with
/// its [`Rasterizer`].
pub struct ImageContext {
    rasterizer: Arc<dyn Rasterizer>,
}

impl ImageContext {
    pub fn new(rasterizer: Arc<dyn Rasterizer>) -> Self {
        debug!(rasterizer = rasterizer.name(), "Creating image context");
        Self { rasterizer }
    }

    pub fn software() -> Self {
        Self::new(Arc::new(SoftwareRasterizer))
    }

    pub fn rasterizer_name(&self) -> &'static str {
        self.rasterizer.name()
    }

    /// Run the filter called `name` on `params`
    pub fn apply_filter(
        &self,
        name: &str,
        mut params: FilterParameters,
    ) -> Result<GpuImage, FilterError> {
        match name {
            AFFINE_TRANSFORM_FILTER => {
                let image = params.take_image(INPUT_IMAGE)?;
                let transform = params.take_transform(INPUT_TRANSFORM)?;
                image.transformed(&transform)
            }
            other => Err(FilterError::UnknownFilter(other.to_string())),
        }
    }

    /// Rasterize `rect` of `image` at scale 1
    ///
    /// The rectangle is snapped outwards to the pixel grid first.
    pub fn create_bitmap(&self, image: &GpuImage, rect: Rect) -> Result<RgbaImage, FilterError> {
        let rect = rect.integral();
        let (width, height) = rect.pixel_size();
        self.render(image, rect, width, height)
    }

    /// Rasterize `from` (in image space) scaled to `width` x `height` pixels
    pub fn render(
        &self,
        image: &GpuImage,
        from: Rect,
        width: u32,
        height: u32,
    ) -> Result<RgbaImage, FilterError> {
        if image.is_empty() || from.is_empty() || width == 0 || height == 0 {
            return Err(FilterError::EmptyImage);
        }

        let image_to_source = image
            .transform()
            .inverse()
            .ok_or(FilterError::NonInvertibleTransform)?;

        let dest_to_source = AffineTransform::scale(
            from.width / width as f64,
            from.height / height as f64,
        )
        .concat(&AffineTransform::translation(from.x, from.y))
        .concat(&image_to_source);

        self.rasterizer
            .resample(image.source(), &dest_to_source, width, height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn sample_image() -> GpuImage {
        GpuImage::from_rgba(RgbaImage::from_fn(4, 2, |x, y| {
            Rgba([x as u8, y as u8, 0, 255])
        }))
    }

    #[test]
    fn test_unknown_filter() {
        let context = ImageContext::software();
        let err = context
            .apply_filter("gaussian-blur", FilterParameters::new())
            .unwrap_err();
        assert_eq!(err, FilterError::UnknownFilter("gaussian-blur".to_string()));
    }

    #[test]
    fn test_missing_and_mistyped_parameters() {
        let context = ImageContext::software();

        let err = context
            .apply_filter(
                AFFINE_TRANSFORM_FILTER,
                FilterParameters::new().with_image(INPUT_IMAGE, sample_image()),
            )
            .unwrap_err();
        assert_eq!(err, FilterError::MissingParameter(INPUT_TRANSFORM));

        let err = context
            .apply_filter(
                AFFINE_TRANSFORM_FILTER,
                FilterParameters::new()
                    .with_transform(INPUT_IMAGE, AffineTransform::IDENTITY)
                    .with_transform(INPUT_TRANSFORM, AffineTransform::IDENTITY),
            )
            .unwrap_err();
        assert_eq!(err, FilterError::WrongParameterType(INPUT_IMAGE));
    }

    #[test]
    fn test_create_bitmap_of_untransformed_image_is_identity() {
        let context = ImageContext::software();
        let original = sample_image();
        let bitmap = context
            .create_bitmap(&original, original.extent())
            .unwrap();
        assert_eq!(&bitmap, original.source().as_ref());
    }

    #[test]
    fn test_render_scales_into_target() {
        let context = ImageContext::software();
        let original = sample_image();
        let scaled = context.render(&original, original.extent(), 8, 4).unwrap();
        assert_eq!(scaled.dimensions(), (8, 4));
        assert_eq!(scaled.get_pixel(7, 3).0, [3, 1, 0, 255]);
        assert_eq!(scaled.get_pixel(0, 0).0, [0, 0, 0, 255]);
    }
}
