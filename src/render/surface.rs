// SPDX-License-Identifier: GPL-3.0-only

//! Double-buffered drawable surface

use image::RgbaImage;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

/// Pixel size of a view of `bounds` points at `scale`
pub fn pixel_size(bounds: (u32, u32), scale: f64) -> (u32, u32) {
    let scale = if scale.is_finite() && scale > 0.0 { scale } else { 1.0 };
    (
        ((bounds.0 as f64 * scale).round() as u32).max(1),
        ((bounds.1 as f64 * scale).round() as u32).max(1),
    )
}

/// Render target with a back buffer for drawing and a front buffer for display
///
/// The size is fixed when the surface is created.
pub struct DrawableSurface {
    width: u32,
    height: u32,
    back: Mutex<RgbaImage>,
    front: Mutex<Arc<RgbaImage>>,
    generation: AtomicU64,
}

impl DrawableSurface {
    pub fn new(width: u32, height: u32) -> Self {
        debug!(width, height, "Creating drawable surface");
        Self {
            width,
            height,
            back: Mutex::new(RgbaImage::new(width, height)),
            front: Mutex::new(Arc::new(RgbaImage::new(width, height))),
            generation: AtomicU64::new(0),
        }
    }

    /// Surface for a view of `bounds` points on a screen with `scale`
    pub fn for_view(bounds: (u32, u32), scale: f64) -> Self {
        let (width, height) = pixel_size(bounds, scale);
        Self::new(width, height)
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Lock the back buffer for drawing
    pub fn bind_drawable(&self) -> MutexGuard<'_, RgbaImage> {
        self.back.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Present the back buffer
    ///
    /// The previous front buffer becomes the new back buffer when nobody else
    /// still holds it.
    pub fn display(&self) {
        let mut back = self.bind_drawable();
        let mut front = self.front.lock().unwrap_or_else(|e| e.into_inner());

        let presented = std::mem::replace(&mut *back, RgbaImage::new(0, 0));
        let previous = std::mem::replace(&mut *front, Arc::new(presented));
        *back = Arc::try_unwrap(previous)
            .unwrap_or_else(|_| RgbaImage::new(self.width, self.height));

        self.generation.fetch_add(1, Ordering::Release);
    }

    /// The most recently displayed frame
    pub fn front_buffer(&self) -> Arc<RgbaImage> {
        Arc::clone(&self.front.lock().unwrap_or_else(|e| e.into_inner()))
    }

    /// Number of frames displayed so far
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn test_pixel_size_uses_scale() {
        assert_eq!(pixel_size((320, 240), 2.0), (640, 480));
        assert_eq!(pixel_size((10, 10), 0.0), (10, 10));
        assert_eq!(pixel_size((0, 3), 1.0), (1, 3));
    }

    #[test]
    fn test_display_swaps_buffers() {
        let surface = DrawableSurface::new(2, 1);
        surface.bind_drawable().put_pixel(0, 0, Rgba([1, 2, 3, 255]));
        assert_eq!(surface.front_buffer().get_pixel(0, 0).0, [0, 0, 0, 0]);

        surface.display();
        assert_eq!(surface.generation(), 1);
        assert_eq!(surface.front_buffer().get_pixel(0, 0).0, [1, 2, 3, 255]);
        assert_eq!(surface.bind_drawable().dimensions(), (2, 1));
    }

    #[test]
    fn test_held_front_buffer_is_not_reused() {
        let surface = DrawableSurface::new(1, 1);
        surface.bind_drawable().put_pixel(0, 0, Rgba([9, 9, 9, 255]));
        surface.display();

        let held = surface.front_buffer();
        surface.bind_drawable().put_pixel(0, 0, Rgba([5, 5, 5, 255]));
        surface.display();

        assert_eq!(held.get_pixel(0, 0).0, [9, 9, 9, 255]);
        assert_eq!(surface.front_buffer().get_pixel(0, 0).0, [5, 5, 5, 255]);
    }
}
