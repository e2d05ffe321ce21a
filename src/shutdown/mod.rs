//! Shutdown sequencing.
//!
//! Closing the surface must always end the process, no matter what breaks on
//! the way down. The sequence: persist the clean exit state synchronously in
//! the event callback, then defer the rest of teardown to a freshly spawned
//! task so the triggering event finishes unwinding before any resource is
//! released. The deferred task cancels all pending timers, drops the surface
//! handle, terminates the worker, and exits the process with a success code
//! — with a catch-all around the whole teardown so a panic in any step still
//! ends in process exit rather than a hang.
//!
//! The sequence runs at most once: later close events (double-close races,
//! the all-windows-closed platform event arriving after a window close) find
//! the guard already taken and return immediately.

use crate::controller::{AppContext, Phase};
use crate::surface::Platform;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::watch;

/// Hook invoked with the process exit code at the end of teardown.
/// Defaults to `std::process::exit`; injectable so tests can observe the
/// exit without dying.
pub type ExitHook = Arc<dyn Fn(i32) + Send + Sync>;

pub struct ShutdownSequencer {
    fired: AtomicBool,
    exit: ExitHook,
    terminated_tx: watch::Sender<bool>,
}

impl Default for ShutdownSequencer {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownSequencer {
    pub fn new() -> Self {
        Self::with_exit_hook(Arc::new(|code| std::process::exit(code)))
    }

    pub fn with_exit_hook(exit: ExitHook) -> Self {
        let (terminated_tx, _) = watch::channel(false);
        Self {
            fired: AtomicBool::new(false),
            exit,
            terminated_tx,
        }
    }

    /// Claim the one shutdown slot. Returns false if shutdown already began.
    fn begin(&self) -> bool {
        self.fired
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    pub fn has_fired(&self) -> bool {
        self.fired.load(Ordering::SeqCst)
    }

    /// Resolves to `true` once teardown has finished (just before the exit
    /// hook runs the process would normally be gone; the controller's run
    /// loop uses this to stop when the hook is a test stub).
    pub fn terminated_watch(&self) -> watch::Receiver<bool> {
        self.terminated_tx.subscribe()
    }
}

/// Handle a close/quit event. Invoked from the controller's event loop.
pub fn on_close<P: Platform>(ctx: &Arc<AppContext<P>>) {
    if !ctx.sequencer.begin() {
        tracing::debug!("shutdown already in progress, ignoring close event");
        return;
    }

    tracing::debug!("close requested, shutting down");
    ctx.set_phase(Phase::ShuttingDown);

    // Step 1, synchronous: a user-driven close is a clean exit and forfeits
    // session restore. Best-effort — failing to persist must not block exit.
    if let Err(e) = ctx.store.record_clean_exit() {
        tracing::warn!("failed to persist exit state: {}", e);
    }

    // Step 2, deferred: let the close event finish propagating before
    // resources are torn down.
    let ctx = Arc::clone(ctx);
    tokio::spawn(async move {
        if AssertUnwindSafe(teardown(&ctx)).catch_unwind().await.is_err() {
            tracing::warn!("teardown panicked, forcing exit");
        }
        ctx.set_phase(Phase::Terminated);
        ctx.sequencer.terminated_tx.send_replace(true);
        (ctx.sequencer.exit)(0);
    });
}

/// Best-effort teardown: every step is attempted even if an earlier one
/// fails.
async fn teardown<P: Platform>(ctx: &AppContext<P>) {
    ctx.timers.cancel_all();
    *ctx.surface.lock() = None;
    if let Err(e) = ctx.supervisor.terminate().await {
        tracing::warn!("failed to terminate worker: {}", e);
    }
}
