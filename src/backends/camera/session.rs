// SPDX-License-Identifier: GPL-3.0-only

//! Capture session
//!
//! A session owns one device input plus a still output and a video output.
//! Configuration is staged in a [`SessionConfiguration`] and only becomes
//! visible when it is committed as a whole; a configuration that is dropped
//! without a successful commit leaves the session untouched.

use super::frame_loop::{CaptureLoopController, LoopAction};
use super::mailbox::FrameMailbox;
use super::types::{BackendError, BackendResult, CameraFormat, CameraFrame, PixelFormat};
use super::{CaptureDevice, CapturePreset, DeviceInput};
use crate::constants::{capture, photo, timing};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info, warn};

/// Consumer of streaming frames
///
/// Called on the session's serial delivery thread, once per delivered frame
/// and never concurrently with itself. The frame is only valid for the call.
pub trait SampleBufferDelegate: Send + Sync {
    fn did_output_sample_buffer(&self, frame: &CameraFrame);
}

/// Still output (JPEG only)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StillImageOutput {
    pub jpeg_quality: u8,
}

impl StillImageOutput {
    pub fn jpeg() -> Self {
        Self {
            jpeg_quality: photo::JPEG_QUALITY,
        }
    }
}

impl Default for StillImageOutput {
    fn default() -> Self {
        Self::jpeg()
    }
}

/// Streaming output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VideoDataOutput {
    pub pixel_format: PixelFormat,
    /// Replace a frame the delegate has not picked up yet instead of queueing
    pub always_discards_late_frames: bool,
}

impl VideoDataOutput {
    pub fn new(pixel_format: PixelFormat) -> Self {
        Self {
            pixel_format,
            always_discards_late_frames: true,
        }
    }
}

impl Default for VideoDataOutput {
    fn default() -> Self {
        Self::new(PixelFormat::default())
    }
}

/// Staged session configuration
///
/// Obtained from [`CaptureSession::begin_configuration`] and applied with
/// [`CaptureSession::commit_configuration`].
#[derive(Default)]
pub struct SessionConfiguration {
    input: Option<Arc<dyn DeviceInput>>,
    still: Option<StillImageOutput>,
    video: Option<VideoDataOutput>,
}

impl SessionConfiguration {
    pub fn can_add_input(&self) -> bool {
        self.input.is_none()
    }

    pub fn add_input(&mut self, input: Arc<dyn DeviceInput>) -> BackendResult<()> {
        if !self.can_add_input() {
            return Err(BackendError::InputRejected(
                "session already has an input".to_string(),
            ));
        }
        self.input = Some(input);
        Ok(())
    }

    pub fn can_add_still_output(&self) -> bool {
        self.still.is_none()
    }

    pub fn add_still_output(&mut self, output: StillImageOutput) -> BackendResult<()> {
        if !self.can_add_still_output() {
            return Err(BackendError::OutputRejected(
                "session already has a still output".to_string(),
            ));
        }
        self.still = Some(output);
        Ok(())
    }

    /// A video output needs an input that can produce its pixel format
    pub fn can_add_video_output(&self, output: &VideoDataOutput) -> bool {
        self.video.is_none()
            && self
                .input
                .as_ref()
                .is_some_and(|input| input.format().supports(output.pixel_format))
    }

    pub fn add_video_output(&mut self, output: VideoDataOutput) -> BackendResult<()> {
        if !self.can_add_video_output(&output) {
            return Err(BackendError::OutputRejected(format!(
                "cannot add {} video output",
                output.pixel_format
            )));
        }
        self.video = Some(output);
        Ok(())
    }
}

struct Committed {
    input: Arc<dyn DeviceInput>,
    still: Option<StillImageOutput>,
    video: Option<VideoDataOutput>,
}

struct Running {
    mailbox: Arc<FrameMailbox>,
    capture: CaptureLoopController,
    delivery: CaptureLoopController,
}

#[derive(Default)]
struct SessionState {
    committed: Option<Committed>,
    delegate: Option<(Arc<dyn SampleBufferDelegate>, String)>,
    running: Option<Running>,
}

/// Capture session
#[derive(Default)]
pub struct CaptureSession {
    state: Mutex<SessionState>,
}

impl CaptureSession {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn begin_configuration(&self) -> SessionConfiguration {
        SessionConfiguration::default()
    }

    /// Apply a staged configuration, replacing the previous one
    pub fn commit_configuration(&self, config: SessionConfiguration) -> BackendResult<()> {
        let mut state = self.lock();
        if state.running.is_some() {
            return Err(BackendError::Other(
                "cannot reconfigure a running session".to_string(),
            ));
        }

        let input = config.input.ok_or_else(|| {
            BackendError::InputRejected("configuration has no input".to_string())
        })?;

        state.committed = Some(Committed {
            input,
            still: config.still,
            video: config.video,
        });
        Ok(())
    }

    /// Open `device` and attach a JPEG still output and a video output
    ///
    /// Any failure leaves the session unconfigured.
    pub fn configure(
        &self,
        device: &dyn CaptureDevice,
        preset: CapturePreset,
        pixel_format: PixelFormat,
    ) -> BackendResult<CameraFormat> {
        let format = preset
            .select_format(&device.formats())
            .ok_or_else(|| {
                BackendError::FormatNotSupported(format!(
                    "{} offers no format for preset {:?}",
                    device.info().name,
                    preset
                ))
            })?;

        let input = device.open(&format)?;

        let mut config = self.begin_configuration();
        config.add_input(input)?;
        config.add_still_output(StillImageOutput::jpeg())?;
        config.add_video_output(VideoDataOutput::new(pixel_format))?;
        self.commit_configuration(config)?;

        info!(
            device = %device.info().name,
            format = %format,
            pixel_format = %pixel_format,
            "Capture session configured"
        );
        Ok(format)
    }

    pub fn is_configured(&self) -> bool {
        self.lock().committed.is_some()
    }

    pub fn active_format(&self) -> Option<CameraFormat> {
        self.lock()
            .committed
            .as_ref()
            .map(|c| c.input.format().clone())
    }

    pub fn video_output(&self) -> Option<VideoDataOutput> {
        self.lock().committed.as_ref().and_then(|c| c.video)
    }

    /// Register the frame consumer and the label of its delivery thread
    ///
    /// Takes effect the next time the session starts.
    pub fn set_sample_buffer_delegate(
        &self,
        delegate: Arc<dyn SampleBufferDelegate>,
        queue_label: &str,
    ) {
        self.lock().delegate = Some((delegate, queue_label.to_string()));
    }

    /// The device input and still output for a still capture request
    pub fn still_connection(&self) -> BackendResult<(Arc<dyn DeviceInput>, StillImageOutput)> {
        let state = self.lock();
        let committed = state.committed.as_ref().ok_or(BackendError::NoVideoConnection)?;
        let still = committed.still.ok_or(BackendError::NoVideoConnection)?;
        Ok((Arc::clone(&committed.input), still))
    }

    /// Start streaming frames to the delegate
    pub fn start(&self) -> BackendResult<()> {
        let mut state = self.lock();
        if state.running.is_some() {
            debug!("Capture session already running");
            return Ok(());
        }

        let committed = state.committed.as_ref().ok_or(BackendError::NotConfigured)?;
        let video = committed.video.ok_or(BackendError::NoVideoConnection)?;
        let input = Arc::clone(&committed.input);

        let (delegate, queue_label) = match &state.delegate {
            Some((delegate, label)) => (Some(Arc::clone(delegate)), label.clone()),
            None => {
                warn!("Starting capture session without a sample buffer delegate");
                (None, capture::DELIVERY_QUEUE_LABEL.to_string())
            }
        };

        let mailbox = Arc::new(FrameMailbox::new(video.always_discards_late_frames));

        let delivery = {
            let mailbox = Arc::clone(&mailbox);
            CaptureLoopController::start(&queue_label, move || {
                match mailbox.take_timeout(capture::DELIVERY_POLL_INTERVAL) {
                    Some(frame) => {
                        if let Some(delegate) = &delegate {
                            delegate.did_output_sample_buffer(&frame);
                        }
                    }
                    None if mailbox.is_closed() => return LoopAction::Stop,
                    None => {}
                }
                LoopAction::Continue
            })?
        };

        let capture_loop = {
            let mailbox = Arc::clone(&mailbox);
            let mut frame_count = 0u64;
            CaptureLoopController::start(capture::CAPTURE_THREAD_NAME, move || {
                match input.read_frame(video.pixel_format, capture::FRAME_READ_TIMEOUT) {
                    Ok(Some(frame)) => {
                        frame_count += 1;
                        if frame_count % timing::FRAME_LOG_INTERVAL == 0 {
                            debug!(
                                frame = frame_count,
                                width = frame.width,
                                height = frame.height,
                                dropped = mailbox.dropped_frames(),
                                "Frame captured"
                            );
                        }
                        if !mailbox.post(frame) {
                            return LoopAction::Stop;
                        }
                    }
                    Ok(None) => {}
                    Err(e) => {
                        warn!(error = %e, "Capture input failed, stopping stream");
                        mailbox.close();
                        return LoopAction::Stop;
                    }
                }
                LoopAction::Continue
            })?
        };

        info!(
            queue = %queue_label,
            pixel_format = %video.pixel_format,
            discard_late_frames = video.always_discards_late_frames,
            "Capture session started"
        );

        state.running = Some(Running {
            mailbox,
            capture: capture_loop,
            delivery,
        });
        Ok(())
    }

    /// Stop streaming and join both threads
    pub fn stop(&self) {
        let running = self.lock().running.take();
        if let Some(mut running) = running {
            running.mailbox.close();
            running.capture.stop();
            running.delivery.stop();
            info!(
                delivered = running.mailbox.delivered_frames(),
                dropped = running.mailbox.dropped_frames(),
                "Capture session stopped"
            );
        }
    }

    pub fn is_running(&self) -> bool {
        self.lock().running.is_some()
    }

    /// Frames replaced in the mailbox before delivery since the last start
    pub fn dropped_frames(&self) -> u64 {
        self.lock()
            .running
            .as_ref()
            .map(|r| r.mailbox.dropped_frames())
            .unwrap_or(0)
    }

    /// Frames handed to the delegate since the last start
    pub fn delivered_frames(&self) -> u64 {
        self.lock()
            .running
            .as_ref()
            .map(|r| r.mailbox.delivered_frames())
            .unwrap_or(0)
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        self.stop();
    }
}
