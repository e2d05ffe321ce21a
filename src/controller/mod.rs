//! Controller lifecycle.
//!
//! Ties the components together: spawn the worker, hold at the readiness
//! barrier, create the surface, then sit in the event loop until a close
//! event hands control to the shutdown sequencer.
//!
//! Everything the components share lives in one [`AppContext`], constructed
//! once at startup and passed by reference — there is no process-wide
//! singleton. The context is `Arc`-shared with the deferred shutdown task.

mod phase;

pub use phase::Phase;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::probe::{self, HttpProber};
use crate::shutdown::{self, ExitHook, ShutdownSequencer};
use crate::state::{ExitStatus, StateStore};
use crate::supervisor::WorkerSupervisor;
use crate::surface::{CapabilityBridge, Platform, Surface, SurfaceEvent, SurfaceOptions};
use crate::timers::PendingTimers;
use parking_lot::Mutex as SyncMutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// How soon after spawn the exit-state guard marks the run as not cleanly
/// ended. Anything that kills the process after this point, short of a clean
/// shutdown, is detectable on the next launch.
const EXIT_STATE_GUARD_DELAY: Duration = Duration::from_millis(100);

/// Process-argument startup flags.
#[derive(Debug, Clone, Copy, Default)]
pub struct StartupFlags {
    /// Hide the surface shortly after creation and show a one-shot
    /// notification.
    pub autohide: bool,
    /// Treat the persisted exit state as `ok` regardless of its value.
    pub no_session_restore: bool,
    /// Development mode: dev-server content, devtools, work-area sizing.
    pub dev: bool,
}

/// Shared application context: one instance per controller, passed by
/// reference to every component that needs it.
pub struct AppContext<P: Platform> {
    pub config: Config,
    pub flags: StartupFlags,
    pub platform: P,
    pub store: StateStore,
    pub supervisor: WorkerSupervisor,
    pub timers: PendingTimers,
    pub sequencer: ShutdownSequencer,
    /// The single surface. `None` before startup completes and after
    /// shutdown begins.
    pub surface: SyncMutex<Option<Arc<P::Surface>>>,
    /// Effective exit status used for session-restore decisions, mutable
    /// through the capability bridge.
    pub exit_status: SyncMutex<ExitStatus>,
    /// Currently registered hotkey accelerator.
    pub hotkey: SyncMutex<String>,
    pub cancel: CancellationToken,
    phase: SyncMutex<Phase>,
}

impl<P: Platform> AppContext<P> {
    pub fn phase(&self) -> Phase {
        *self.phase.lock()
    }

    pub(crate) fn set_phase(&self, next: Phase) {
        let mut phase = self.phase.lock();
        if *phase == next {
            return;
        }
        if next == Phase::Starting {
            tracing::debug!(from = ?*phase, "beginning controller run");
        } else if phase.can_transition(next) {
            tracing::debug!(from = ?*phase, to = ?next, "phase transition");
        } else {
            tracing::warn!(from = ?*phase, to = ?next, "unexpected phase transition");
        }
        *phase = next;
    }

    pub fn effective_exit_status(&self) -> ExitStatus {
        *self.exit_status.lock()
    }
}

pub struct ControllerBuilder<P: Platform> {
    config: Option<Config>,
    flags: StartupFlags,
    platform: Option<(P, mpsc::UnboundedReceiver<SurfaceEvent>)>,
    store: Option<StateStore>,
    exit_hook: Option<ExitHook>,
}

impl<P: Platform> ControllerBuilder<P> {
    pub fn new() -> Self {
        Self {
            config: None,
            flags: StartupFlags::default(),
            platform: None,
            store: None,
            exit_hook: None,
        }
    }

    pub fn config(mut self, config: Config) -> Self {
        self.config = Some(config);
        self
    }

    pub fn flags(mut self, flags: StartupFlags) -> Self {
        self.flags = flags;
        self
    }

    /// The presentation backend and the event stream it feeds.
    pub fn platform(mut self, platform: P, events: mpsc::UnboundedReceiver<SurfaceEvent>) -> Self {
        self.platform = Some((platform, events));
        self
    }

    pub fn store(mut self, store: StateStore) -> Self {
        self.store = Some(store);
        self
    }

    /// Override the process-exit hook (tests).
    pub fn exit_hook(mut self, hook: ExitHook) -> Self {
        self.exit_hook = Some(hook);
        self
    }

    pub fn build(self) -> Result<Controller<P>> {
        let config = self.config.unwrap_or_default();
        let (platform, events) = self
            .platform
            .ok_or_else(|| Error::Config("controller requires a platform".to_string()))?;
        let store = match self.store {
            Some(store) => store,
            None => StateStore::open(StateStore::default_path(&config.app_name)?)?,
        };
        let sequencer = match self.exit_hook {
            Some(hook) => ShutdownSequencer::with_exit_hook(hook),
            None => ShutdownSequencer::new(),
        };
        let supervisor = WorkerSupervisor::new(config.clone());
        let hotkey = config.hotkey.clone();

        let ctx = Arc::new(AppContext {
            config,
            flags: self.flags,
            platform,
            store,
            supervisor,
            timers: PendingTimers::new(),
            sequencer,
            surface: SyncMutex::new(None),
            exit_status: SyncMutex::new(ExitStatus::Ok),
            hotkey: SyncMutex::new(hotkey),
            cancel: CancellationToken::new(),
            phase: SyncMutex::new(Phase::Starting),
        });

        Ok(Controller { ctx, events })
    }
}

impl<P: Platform> Default for ControllerBuilder<P> {
    fn default() -> Self {
        Self::new()
    }
}

/// The orchestrating process: one controller, one worker, one surface.
pub struct Controller<P: Platform> {
    ctx: Arc<AppContext<P>>,
    events: mpsc::UnboundedReceiver<SurfaceEvent>,
}

impl<P: Platform> Controller<P> {
    pub fn builder() -> ControllerBuilder<P> {
        ControllerBuilder::new()
    }

    /// Shared context, mostly for introspection and the capability bridge.
    pub fn context(&self) -> Arc<AppContext<P>> {
        Arc::clone(&self.ctx)
    }

    /// Capability bridge handed to the presentation layer.
    pub fn bridge(&self) -> CapabilityBridge<P> {
        CapabilityBridge::new(Arc::clone(&self.ctx))
    }

    /// Token that aborts a startup in progress.
    pub fn cancel_token(&self) -> CancellationToken {
        self.ctx.cancel.clone()
    }

    /// Run the controller: full startup sequence, then the event loop until
    /// shutdown. A fatal startup error tears the worker back down and
    /// propagates.
    pub async fn run(&mut self) -> Result<()> {
        if let Err(e) = self.start_session().await {
            self.abort_startup().await;
            return Err(e);
        }

        let mut terminated = self.ctx.sequencer.terminated_watch();
        loop {
            tokio::select! {
                event = self.events.recv() => match event {
                    Some(SurfaceEvent::CloseRequested) | Some(SurfaceEvent::AllClosed) => {
                        shutdown::on_close(&self.ctx);
                    }
                    Some(SurfaceEvent::Focused) => {
                        let surface = self.ctx.surface.lock().clone();
                        if let Some(surface) = surface {
                            surface.notify_focused();
                        }
                    }
                    Some(SurfaceEvent::Activated) => {
                        let needs_surface = self.ctx.surface.lock().is_none();
                        if needs_surface && !self.ctx.sequencer.has_fired() {
                            if let Err(e) = self.start_session().await {
                                self.abort_startup().await;
                                return Err(e);
                            }
                        }
                    }
                    None => break,
                },
                changed = terminated.changed() => {
                    if changed.is_err() || *terminated.borrow() {
                        break;
                    }
                }
            }
        }
        Ok(())
    }

    async fn abort_startup(&self) {
        self.ctx.timers.cancel_all();
        if let Err(e) = self.ctx.supervisor.terminate().await {
            tracing::warn!("failed to terminate worker after startup error: {}", e);
        }
    }

    /// `Starting → AwaitingWorkerReady → SurfaceActive`.
    async fn start_session(&self) -> Result<()> {
        let ctx = &self.ctx;
        ctx.set_phase(Phase::Starting);
        tracing::debug!("controller starting");

        // The persisted status of the *previous* run, read before this run's
        // exit-state guard can overwrite it.
        let prior_status = ctx.store.exit_status();

        let handle = ctx.supervisor.spawn().await?;

        // If the process dies from here on without a clean shutdown, the
        // next launch sees "unknown".
        let store = ctx.store.clone();
        ctx.timers
            .schedule("exit-state-guard", EXIT_STATE_GUARD_DELAY, move || {
                if let Err(e) = store.set_exit_status(ExitStatus::Unknown) {
                    tracing::warn!("failed to persist startup exit state: {}", e);
                }
            });

        ctx.set_phase(Phase::AwaitingWorkerReady);
        let prober = HttpProber::with_shared_client(
            ctx.config.liveness_url(),
            ctx.config.probe.attempt_timeout(),
        )?;
        probe::await_ready(&prober, &ctx.config.probe, handle.failure_watch(), &ctx.cancel)
            .await?;
        handle.mark_operational();

        let effective = if ctx.flags.no_session_restore {
            ExitStatus::Ok
        } else {
            prior_status
        };
        *ctx.exit_status.lock() = effective;

        let options = SurfaceOptions::resolve(
            &ctx.config.app_name,
            ctx.store.window_size(),
            ctx.platform.work_area(),
            ctx.flags.dev,
        );
        let surface = Arc::new(ctx.platform.create_surface(&options)?);
        *ctx.surface.lock() = Some(Arc::clone(&surface));
        ctx.set_phase(Phase::SurfaceActive);

        if ctx.config.show_menu {
            ctx.platform.install_app_menu();
        }

        if ctx.flags.autohide {
            let hide_target = Arc::clone(&surface);
            ctx.timers.schedule(
                "autohide",
                Duration::from_millis(ctx.config.autohide_delay_ms),
                move || hide_target.hide(),
            );

            let hotkey = ctx.hotkey.lock().clone();
            let body = format!(
                "{} is running, press {} to show",
                ctx.config.app_name, hotkey
            );
            if let Err(e) = ctx.platform.show_notification(&body) {
                tracing::warn!("failed to show notification: {}", e);
            }
        }

        surface.load_url(&ctx.config.content_url(ctx.flags.dev))?;
        if ctx.flags.dev {
            surface.open_devtools();
        }

        let hotkey = ctx.hotkey.lock().clone();
        if let Err(e) = ctx.platform.update_hotkey(&hotkey) {
            tracing::warn!("failed to register hotkey {}: {}", hotkey, e);
        }

        tracing::info!("surface active, controller in steady state");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::HeadlessPlatform;

    #[test]
    fn builder_requires_a_platform() {
        let result = ControllerBuilder::<HeadlessPlatform>::new().build();
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
