// SPDX-License-Identifier: GPL-3.0-only

//! Rendering session: the render context, the surface and the image context

use super::context::RenderContext;
use super::surface::DrawableSurface;
use crate::imaging::{ImageContext, Rect};
use std::sync::Arc;
use tracing::info;

/// Everything the render sink and the transform stage share
///
/// Built once at startup and shared through `Arc`.
pub struct RenderingSession {
    render_context: RenderContext,
    surface: DrawableSurface,
    image_context: Arc<ImageContext>,
    bounds: (u32, u32),
    scale: f64,
}

impl RenderingSession {
    /// Create a session for a view of `bounds` points on a screen with `scale`
    pub fn new(bounds: (u32, u32), scale: f64, image_context: Arc<ImageContext>) -> Self {
        let surface = DrawableSurface::for_view(bounds, scale);
        let (width, height) = surface.size();
        let render_context = RenderContext::new();

        info!(
            bounds = ?bounds,
            scale,
            width,
            height,
            context = render_context.id(),
            rasterizer = image_context.rasterizer_name(),
            "Rendering session created"
        );

        Self {
            render_context,
            surface,
            image_context,
            bounds,
            scale,
        }
    }

    pub fn render_context(&self) -> &RenderContext {
        &self.render_context
    }

    pub fn surface(&self) -> &DrawableSurface {
        &self.surface
    }

    pub fn image_context(&self) -> &Arc<ImageContext> {
        &self.image_context
    }

    pub fn bounds(&self) -> (u32, u32) {
        self.bounds
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Whole surface in pixels: `(0, 0, bounds.w * scale, bounds.h * scale)`
    pub fn target_rect(&self) -> Rect {
        let (width, height) = self.surface.size();
        Rect::from_size(width, height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_rect_covers_scaled_bounds() {
        let session = RenderingSession::new((160, 90), 2.0, Arc::new(ImageContext::software()));
        assert_eq!(session.target_rect(), Rect::new(0.0, 0.0, 320.0, 180.0));
        assert_eq!(session.surface().size(), (320, 180));
    }
}
