// SPDX-License-Identifier: GPL-3.0-only

//! Single-slot handoff between the capture thread and the delivery thread

use super::types::CameraFrame;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Condvar, Mutex, MutexGuard};
use std::time::Duration;

struct Slot {
    pending: Option<CameraFrame>,
    closed: bool,
}

/// Latest-frame mailbox
///
/// Holds at most one pending frame. When late frames are discarded, posting
/// replaces whatever is still pending and never blocks; otherwise the producer
/// waits until the consumer has taken the pending frame.
pub struct FrameMailbox {
    slot: Mutex<Slot>,
    changed: Condvar,
    discard_late_frames: bool,
    dropped: AtomicU64,
    delivered: AtomicU64,
}

impl FrameMailbox {
    pub fn new(discard_late_frames: bool) -> Self {
        Self {
            slot: Mutex::new(Slot {
                pending: None,
                closed: false,
            }),
            changed: Condvar::new(),
            discard_late_frames,
            dropped: AtomicU64::new(0),
            delivered: AtomicU64::new(0),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Post a frame
    ///
    /// Returns `false` once the mailbox is closed.
    pub fn post(&self, frame: CameraFrame) -> bool {
        let mut slot = self.lock();

        if !self.discard_late_frames {
            while slot.pending.is_some() && !slot.closed {
                slot = self
                    .changed
                    .wait(slot)
                    .unwrap_or_else(|e| e.into_inner());
            }
        }

        if slot.closed {
            return false;
        }

        if slot.pending.replace(frame).is_some() {
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
        self.changed.notify_all();
        true
    }

    /// Take the pending frame, waiting up to `timeout` for one to arrive
    pub fn take_timeout(&self, timeout: Duration) -> Option<CameraFrame> {
        let slot = self.lock();
        let (mut slot, _) = self
            .changed
            .wait_timeout_while(slot, timeout, |s| s.pending.is_none() && !s.closed)
            .unwrap_or_else(|e| e.into_inner());

        let frame = slot.pending.take();
        if frame.is_some() {
            self.delivered.fetch_add(1, Ordering::Relaxed);
            self.changed.notify_all();
        }
        frame
    }

    /// Close the mailbox, waking any waiting producer or consumer
    pub fn close(&self) {
        let mut slot = self.lock();
        slot.closed = true;
        self.changed.notify_all();
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Frames replaced before the consumer took them
    pub fn dropped_frames(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Frames handed to the consumer
    pub fn delivered_frames(&self) -> u64 {
        self.delivered.load(Ordering::Relaxed)
    }
}
