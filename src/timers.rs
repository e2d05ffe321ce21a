//! Cancellable deferred actions.
//!
//! The controller schedules a handful of one-shot timers (the exit-state
//! guard, the autohide delay). Every timer is cancellable by name, and all
//! of them are cancelled during shutdown so nothing fires after teardown
//! has started.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Named set of outstanding deferred actions.
#[derive(Default)]
pub struct PendingTimers {
    tasks: Mutex<HashMap<&'static str, JoinHandle<()>>>,
}

impl PendingTimers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `action` after `delay`. Scheduling under a name that already has a
    /// pending timer cancels the old one first.
    ///
    /// Must be called from within a tokio runtime.
    pub fn schedule(
        &self,
        name: &'static str,
        delay: Duration,
        action: impl FnOnce() + Send + 'static,
    ) {
        tracing::debug!(timer = name, ?delay, "scheduling deferred action");
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            action();
        });
        if let Some(previous) = self.tasks.lock().insert(name, handle) {
            previous.abort();
        }
    }

    /// Cancel one timer by name. Returns whether a timer was registered under
    /// that name (it may already have fired).
    pub fn cancel(&self, name: &str) -> bool {
        match self.tasks.lock().remove(name) {
            Some(handle) => {
                handle.abort();
                true
            }
            None => false,
        }
    }

    /// Cancel every outstanding timer. Called exactly once from the shutdown
    /// sequencer, before the worker is terminated.
    pub fn cancel_all(&self) {
        let mut tasks = self.tasks.lock();
        for (name, handle) in tasks.drain() {
            tracing::debug!(timer = name, "cancelling deferred action");
            handle.abort();
        }
    }

    /// Number of timers still registered (fired timers are only removed by
    /// `cancel`/`cancel_all`, so this counts unfinished tasks).
    pub fn pending(&self) -> usize {
        self.tasks.lock().values().filter(|h| !h.is_finished()).count()
    }
}
