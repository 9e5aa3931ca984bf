// SPDX-License-Identifier: GPL-3.0-only
//! Thread lifecycle for the capture session
//!
//! The session runs two loops on named threads: the capture loop that pulls
//! frames from the device input, and the serial delivery loop that hands them
//! to the sample buffer delegate. Both are driven by [`CaptureLoopController`].
//! [`FrameClock`] paces synthetic sources at their nominal framerate.

use super::types::{BackendError, BackendResult};
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Action returned by the loop callback to control loop behavior
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopAction {
    /// Continue running the loop
    Continue,
    /// Stop the loop gracefully
    Stop,
}

/// Controller for a loop running on its own named thread
///
/// # Example
///
/// ```ignore
/// let controller = CaptureLoopController::start("video-streaming", move || {
///     match mailbox.take_timeout(Duration::from_millis(50)) {
///         Some(frame) => delegate.did_output_sample_buffer(&frame),
///         None => {}
///     }
///     LoopAction::Continue
/// })?;
/// ```
pub struct CaptureLoopController {
    thread_handle: Option<JoinHandle<()>>,
    stop_signal: Arc<AtomicBool>,
    name: String,
}

impl CaptureLoopController {
    /// Start a loop on a thread called `name`
    ///
    /// The closure is called repeatedly until it returns `LoopAction::Stop` or
    /// the controller is stopped.
    pub fn start<F>(name: &str, loop_fn: F) -> BackendResult<Self>
    where
        F: FnMut() -> LoopAction + Send + 'static,
    {
        Self::start_with_init(name, || Ok(()), {
            let mut loop_fn = loop_fn;
            move |_: &mut ()| loop_fn()
        })
    }

    /// Start a loop whose thread first builds some state with `init_fn`
    ///
    /// If initialization fails the thread exits before running the loop.
    pub fn start_with_init<S, I, F>(name: &str, init_fn: I, mut loop_fn: F) -> BackendResult<Self>
    where
        S: 'static,
        I: FnOnce() -> Result<S, String> + Send + 'static,
        F: FnMut(&mut S) -> LoopAction + Send + 'static,
    {
        let stop_signal = Arc::new(AtomicBool::new(false));
        let thread_stop = Arc::clone(&stop_signal);
        let thread_name = name.to_string();

        info!(name = %name, "Starting loop thread");

        let thread_handle = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                let mut state = match init_fn() {
                    Ok(s) => s,
                    Err(e) => {
                        warn!(name = %thread_name, error = %e, "Loop initialization failed");
                        return;
                    }
                };

                while !thread_stop.load(Ordering::SeqCst) {
                    if loop_fn(&mut state) == LoopAction::Stop {
                        debug!(name = %thread_name, "Loop requested stop");
                        break;
                    }
                }

                debug!(name = %thread_name, "Loop thread exiting");
            })
            .map_err(|e| BackendError::Other(format!("Failed to spawn '{}': {}", name, e)))?;

        Ok(Self {
            thread_handle: Some(thread_handle),
            stop_signal,
            name: name.to_string(),
        })
    }

    /// Check if the loop is still running
    pub fn is_running(&self) -> bool {
        self.thread_handle
            .as_ref()
            .map(|h| !h.is_finished())
            .unwrap_or(false)
    }

    /// Signal the loop to stop without waiting for it
    pub fn request_stop(&self) {
        self.stop_signal.store(true, Ordering::SeqCst);
    }

    /// Stop the loop and wait for the thread to finish
    pub fn stop(&mut self) {
        self.request_stop();
        self.join();
    }

    /// Wait for the thread to finish without sending the stop signal
    pub fn join(&mut self) {
        if let Some(handle) = self.thread_handle.take() {
            if handle.thread().id() == thread::current().id() {
                // Dropped from inside its own loop; the flag ends it.
                return;
            }
            if let Err(e) = handle.join() {
                warn!(name = %self.name, "Loop thread panicked: {:?}", e);
            }
        }
    }
}

impl Drop for CaptureLoopController {
    fn drop(&mut self) {
        if self.thread_handle.is_some() {
            self.stop();
        }
    }
}

/// Paces a synthetic source at a fixed frame interval
pub struct FrameClock {
    interval: Duration,
    next: Mutex<Instant>,
}

impl FrameClock {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            next: Mutex::new(Instant::now()),
        }
    }

    /// Wait until the next frame is due
    ///
    /// Returns `false` if the frame is not due within `timeout`. A consumer that
    /// fell behind does not get a burst of catch-up frames.
    pub fn wait_next(&self, timeout: Duration) -> bool {
        let mut next = self.next.lock().unwrap_or_else(|e| e.into_inner());
        let now = Instant::now();

        if *next > now {
            let wait = *next - now;
            if wait > timeout {
                thread::sleep(timeout);
                return false;
            }
            thread::sleep(wait);
        }

        let now = Instant::now();
        *next += self.interval;
        if *next < now {
            *next = now + self.interval;
        }
        true
    }
}
