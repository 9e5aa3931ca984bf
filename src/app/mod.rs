// SPDX-License-Identifier: GPL-3.0-only

//! Camera controller
//!
//! Wires the capture session, the preview pipeline, the still path and the
//! persistence gateway together and exposes the four user actions.
//!
//! # Lifecycle
//!
//! ```text
//! new()   ── configure session (failures logged, controller still usable)
//! start() ── attach preview delegate, start streaming
//! take_photo() / save_photo() / upload_photo()
//! ```
//!
//! `take_photo` and `save_photo` return immediately; their completions are
//! reported on the event channel. They must be called from within a tokio
//! runtime.

use crate::backends::camera::{CameraFormat, CaptureDevice, CaptureSession};
use crate::config::Config;
use crate::constants::capture::DELIVERY_QUEUE_LABEL;
use crate::errors::AppResult;
use crate::imaging::TransformStage;
use crate::pipelines::{CapturedStillSlot, PreviewPipeline, StillCapturePath};
use crate::render::{RenderSink, RenderingSession};
use crate::storage::{PersistenceGateway, PhotoFileSystem, PhotoLibrary, SaveOutcome};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

/// Completion notifications for the UI
#[derive(Debug, Clone, PartialEq)]
pub enum ControllerEvent {
    PhotoCaptured { width: u32, height: u32 },
    PhotoCaptureFailed(String),
    PhotoSaved(SaveOutcome),
}

/// Owns the capture session and the photo paths
pub struct CameraController {
    config: Config,
    device: Arc<dyn CaptureDevice>,
    session: Arc<CaptureSession>,
    rendering: Arc<RenderingSession>,
    preview: Arc<PreviewPipeline>,
    still: StillCapturePath,
    gateway: Arc<PersistenceGateway>,
    event_tx: mpsc::UnboundedSender<ControllerEvent>,
    event_rx: Option<mpsc::UnboundedReceiver<ControllerEvent>>,
}

impl CameraController {
    /// Build the controller and configure the capture session
    pub fn new(
        config: Config,
        device: Arc<dyn CaptureDevice>,
        rendering: Arc<RenderingSession>,
        library: Arc<dyn PhotoLibrary>,
        fs: Arc<dyn PhotoFileSystem>,
    ) -> Self {
        let session = Arc::new(CaptureSession::new());
        match session.configure(device.as_ref(), config.preset, config.pixel_format) {
            Ok(format) => debug!(format = %format, "Controller configured capture session"),
            Err(e) => error!(
                device = %device.info().name,
                error = %e,
                "Failed to configure capture session"
            ),
        }

        let stage = TransformStage::new(Arc::clone(rendering.image_context()));
        let sink = Arc::new(RenderSink::new(Arc::clone(&rendering)));
        let preview = Arc::new(PreviewPipeline::new(stage.clone(), sink));
        let still = StillCapturePath::new(
            Arc::clone(&session),
            stage,
            Arc::new(CapturedStillSlot::new()),
        );
        let gateway = Arc::new(PersistenceGateway::new(library, fs, config.photo_path()));
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        Self {
            config,
            device,
            session,
            rendering,
            preview,
            still,
            gateway,
            event_tx,
            event_rx: Some(event_rx),
        }
    }

    /// Take the receiving end of the event channel (once)
    pub fn take_events(&mut self) -> Option<mpsc::UnboundedReceiver<ControllerEvent>> {
        self.event_rx.take()
    }

    /// Attach the preview delegate and start streaming
    pub fn start(&self) -> AppResult<()> {
        let delegate: Arc<dyn crate::backends::camera::SampleBufferDelegate> =
            self.preview.clone();
        self.session
            .set_sample_buffer_delegate(delegate, DELIVERY_QUEUE_LABEL);

        if let Err(e) = self.session.start() {
            error!(error = %e, "Failed to start capture session");
            return Err(e.into());
        }

        info!(device = %self.device.info().name, "Preview started");
        Ok(())
    }

    /// Stop streaming
    pub fn stop(&self) {
        self.session.stop();
    }

    /// Capture a still in the background
    pub fn take_photo(&self) -> JoinHandle<()> {
        let still = self.still.clone();
        let events = self.event_tx.clone();

        tokio::spawn(async move {
            let event = match still.capture().await {
                Ok((width, height)) => ControllerEvent::PhotoCaptured { width, height },
                Err(e) => ControllerEvent::PhotoCaptureFailed(e.to_string()),
            };
            let _ = events.send(event);
        })
    }

    /// Save the still captured so far
    ///
    /// The still is read when this is called. A capture still in flight does
    /// not affect this save.
    pub fn save_photo(&self) -> JoinHandle<SaveOutcome> {
        let snapshot = self.still.slot().snapshot();
        let gateway = Arc::clone(&self.gateway);
        let events = self.event_tx.clone();

        tokio::spawn(async move {
            let outcome = gateway.save(snapshot).await;
            let _ = events.send(ControllerEvent::PhotoSaved(outcome.clone()));
            outcome
        })
    }

    /// Uploading is not supported
    pub fn upload_photo(&self) {
        debug!("Upload requested, nothing to do");
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn session(&self) -> &Arc<CaptureSession> {
        &self.session
    }

    pub fn rendering(&self) -> &Arc<RenderingSession> {
        &self.rendering
    }

    pub fn preview(&self) -> &Arc<PreviewPipeline> {
        &self.preview
    }

    pub fn captured_still(&self) -> &Arc<CapturedStillSlot> {
        self.still.slot()
    }

    pub fn gateway(&self) -> &Arc<PersistenceGateway> {
        &self.gateway
    }

    pub fn active_format(&self) -> Option<CameraFormat> {
        self.session.active_format()
    }
}

impl Drop for CameraController {
    fn drop(&mut self) {
        self.session.stop();
    }
}
