// SPDX-License-Identifier: GPL-3.0-only

//! Live preview: every delivered frame is rotated and drawn
//!
//! Runs on the session's delivery thread, one frame at a time, in arrival
//! order. Failures drop the frame; nothing is retried.

use crate::backends::camera::{CameraFrame, SampleBufferDelegate};
use crate::constants::timing::FRAME_LOG_INTERVAL;
use crate::imaging::{FilterError, GpuImage, TransformStage};
use crate::render::RenderSink;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, warn};

/// The preview delegate: pixel buffer → rotate → present
pub struct PreviewPipeline {
    stage: TransformStage,
    sink: Arc<RenderSink>,
    rendered: AtomicU64,
    failed: AtomicU64,
}

impl PreviewPipeline {
    pub fn new(stage: TransformStage, sink: Arc<RenderSink>) -> Self {
        Self {
            stage,
            sink,
            rendered: AtomicU64::new(0),
            failed: AtomicU64::new(0),
        }
    }

    pub fn sink(&self) -> &Arc<RenderSink> {
        &self.sink
    }

    /// Frames drawn to the surface
    pub fn rendered_frames(&self) -> u64 {
        self.rendered.load(Ordering::Relaxed)
    }

    /// Frames dropped because conversion, rotation or drawing failed
    pub fn failed_frames(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    /// Process one frame
    pub fn process_frame(&self, frame: &CameraFrame) -> Result<(), FilterError> {
        let image = GpuImage::from_pixel_buffer(frame)?;
        let rotated = self.stage.rotate(image)?;
        self.sink.present(&rotated, self.sink.target_rect())
    }
}

impl SampleBufferDelegate for PreviewPipeline {
    fn did_output_sample_buffer(&self, frame: &CameraFrame) {
        match self.process_frame(frame) {
            Ok(()) => {
                let rendered = self.rendered.fetch_add(1, Ordering::Relaxed) + 1;
                if rendered % FRAME_LOG_INTERVAL == 0 {
                    debug!(
                        sequence = frame.sequence,
                        rendered,
                        width = frame.width,
                        height = frame.height,
                        latency_ms = frame.captured_at.elapsed().as_millis() as u64,
                        "Preview frame rendered"
                    );
                }
            }
            Err(e) => {
                let failed = self.failed.fetch_add(1, Ordering::Relaxed);
                // First failure, then every FRAME_LOG_INTERVAL-th
                if failed % FRAME_LOG_INTERVAL == 0 {
                    warn!(
                        sequence = frame.sequence,
                        failed = failed + 1,
                        error = %e,
                        "Dropping preview frame"
                    );
                }
            }
        }
    }
}
