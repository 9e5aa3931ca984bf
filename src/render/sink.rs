// SPDX-License-Identifier: GPL-3.0-only

//! Render sink: draws images onto the session's surface

use super::session::RenderingSession;
use crate::imaging::{FilterError, GpuImage, Rect};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Draws each presented image and displays it immediately
pub struct RenderSink {
    session: Arc<RenderingSession>,
    presented: AtomicU64,
}

impl RenderSink {
    pub fn new(session: Arc<RenderingSession>) -> Self {
        Self {
            session,
            presented: AtomicU64::new(0),
        }
    }

    pub fn session(&self) -> &Arc<RenderingSession> {
        &self.session
    }

    /// Default target: the whole surface
    pub fn target_rect(&self) -> Rect {
        self.session.target_rect()
    }

    /// Draw the full extent of `image` scaled into `target_rect`, then display
    ///
    /// `target_rect` is in surface pixels with its origin at the bottom-left
    /// corner of the surface. Parts outside the surface are clipped.
    pub fn present(&self, image: &GpuImage, target_rect: Rect) -> Result<(), FilterError> {
        let context = self.session.image_context();
        let surface = self.session.surface();
        let (surface_width, surface_height) = surface.size();

        self.session.render_context().make_current_if_needed();

        let target = target_rect.integral();
        let (width, height) = target.pixel_size();
        let rendered = context.render(image, image.extent(), width, height)?;

        {
            let mut drawable = surface.bind_drawable();
            let left = target.x as i64;
            let top = surface_height as i64 - (target.y + target.height) as i64;

            if left == 0 && top == 0 && (width, height) == (surface_width, surface_height) {
                *drawable = rendered;
            } else {
                image::imageops::replace(&mut *drawable, &rendered, left, top);
            }
        }

        surface.display();
        self.presented.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Number of successful presents
    pub fn presented_frames(&self) -> u64 {
        self.presented.load(Ordering::Relaxed)
    }
}
