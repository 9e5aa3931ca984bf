// SPDX-License-Identifier: GPL-3.0-only

//! Render context with per-thread "current" tracking
//!
//! Drawing requires the session's context to be current on the drawing thread.
//! Which context is current is thread-local state, like a GL context.

use std::cell::Cell;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

static NEXT_CONTEXT_ID: AtomicU64 = AtomicU64::new(1);

thread_local! {
    static CURRENT_CONTEXT: Cell<Option<u64>> = const { Cell::new(None) };
}

/// Render context handle
#[derive(Debug)]
pub struct RenderContext {
    id: u64,
    activations: AtomicU64,
}

impl RenderContext {
    pub fn new() -> Self {
        Self {
            id: NEXT_CONTEXT_ID.fetch_add(1, Ordering::Relaxed),
            activations: AtomicU64::new(0),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Whether this context is current on the calling thread
    pub fn is_current(&self) -> bool {
        CURRENT_CONTEXT.with(|current| current.get() == Some(self.id))
    }

    /// Make this context current on the calling thread
    pub fn make_current(&self) {
        CURRENT_CONTEXT.with(|current| current.set(Some(self.id)));
        let count = self.activations.fetch_add(1, Ordering::Relaxed) + 1;
        debug!(
            context = self.id,
            thread = ?std::thread::current().name(),
            activations = count,
            "Render context made current"
        );
    }

    /// Make this context current unless it already is
    ///
    /// Returns `true` if the current context changed.
    pub fn make_current_if_needed(&self) -> bool {
        if self.is_current() {
            return false;
        }
        self.make_current();
        true
    }

    /// Number of times this context was made current on any thread
    pub fn activations(&self) -> u64 {
        self.activations.load(Ordering::Relaxed)
    }

    /// Clear the current context of the calling thread
    pub fn clear_current() {
        CURRENT_CONTEXT.with(|current| current.set(None));
    }
}

impl Default for RenderContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_make_current_only_when_needed() {
        let context = RenderContext::new();
        assert!(!context.is_current());
        assert!(context.make_current_if_needed());
        assert!(!context.make_current_if_needed());
        assert_eq!(context.activations(), 1);

        let other = RenderContext::new();
        other.make_current();
        assert!(!context.is_current());
        assert!(context.make_current_if_needed());
        assert_eq!(context.activations(), 2);
        RenderContext::clear_current();
    }

    #[test]
    fn test_current_is_per_thread() {
        let context = std::sync::Arc::new(RenderContext::new());
        context.make_current();

        let remote = std::sync::Arc::clone(&context);
        let was_current = std::thread::spawn(move || remote.is_current())
            .join()
            .unwrap();

        assert!(!was_current);
        assert!(context.is_current());
        RenderContext::clear_current();
    }
}
