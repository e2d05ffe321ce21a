//! Headless presentation backend.
//!
//! Implements [`Platform`]/[`Surface`] without any windowing system: every
//! operation is recorded and logged. The CLI binary runs on this backend
//! (the orchestration core is fully exercised; a real GUI backend implements
//! the same traits out of tree), and the test suite drives lifecycle events
//! through it.

use super::{Platform, Surface, SurfaceEvent, SurfaceOptions};
use crate::error::Result;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

#[derive(Default)]
struct SurfaceState {
    visible: AtomicBool,
    maximized: AtomicBool,
    devtools_open: AtomicBool,
    title: Mutex<String>,
    loaded_url: Mutex<Option<String>>,
    focus_signals: AtomicUsize,
}

/// A recorded, windowless surface. Clones share state.
#[derive(Clone)]
pub struct HeadlessSurface {
    state: Arc<SurfaceState>,
    events: mpsc::UnboundedSender<SurfaceEvent>,
}

impl HeadlessSurface {
    fn new(options: &SurfaceOptions, events: mpsc::UnboundedSender<SurfaceEvent>) -> Self {
        let state = SurfaceState {
            visible: AtomicBool::new(true),
            title: Mutex::new(options.title.clone()),
            ..SurfaceState::default()
        };
        Self {
            state: Arc::new(state),
            events,
        }
    }

    /// Simulate the window gaining focus (test hook; a real backend emits
    /// this from the windowing system).
    pub fn focus(&self) {
        let _ = self.events.send(SurfaceEvent::Focused);
    }

    pub fn title(&self) -> String {
        self.state.title.lock().clone()
    }

    pub fn loaded_url(&self) -> Option<String> {
        self.state.loaded_url.lock().clone()
    }

    pub fn devtools_open(&self) -> bool {
        self.state.devtools_open.load(Ordering::SeqCst)
    }

    /// How many fire-and-forget focus signals reached the presentation layer.
    pub fn focus_signals(&self) -> usize {
        self.state.focus_signals.load(Ordering::SeqCst)
    }
}

impl Surface for HeadlessSurface {
    fn load_url(&self, url: &str) -> Result<()> {
        tracing::info!(url, "surface loading content");
        *self.state.loaded_url.lock() = Some(url.to_string());
        Ok(())
    }

    fn show(&self) {
        self.state.visible.store(true, Ordering::SeqCst);
    }

    fn hide(&self) {
        tracing::debug!("surface hidden");
        self.state.visible.store(false, Ordering::SeqCst);
    }

    fn is_visible(&self) -> bool {
        self.state.visible.load(Ordering::SeqCst)
    }

    fn minimize(&self) {
        tracing::debug!("surface minimized");
        self.state.visible.store(false, Ordering::SeqCst);
    }

    fn maximize(&self) {
        self.state.maximized.store(true, Ordering::SeqCst);
    }

    fn unmaximize(&self) {
        self.state.maximized.store(false, Ordering::SeqCst);
    }

    fn is_maximized(&self) -> bool {
        self.state.maximized.load(Ordering::SeqCst)
    }

    fn set_title(&self, title: &str) {
        *self.state.title.lock() = title.to_string();
    }

    fn open_devtools(&self) {
        self.state.devtools_open.store(true, Ordering::SeqCst);
    }

    fn close(&self) {
        let _ = self.events.send(SurfaceEvent::CloseRequested);
    }

    fn notify_focused(&self) {
        self.state.focus_signals.fetch_add(1, Ordering::SeqCst);
        tracing::debug!("focused signal sent to presentation layer");
    }
}

#[derive(Default)]
struct PlatformState {
    work_area: (u32, u32),
    created: Mutex<Vec<SurfaceOptions>>,
    last_surface: Mutex<Option<HeadlessSurface>>,
    notifications: Mutex<Vec<String>>,
    hotkey: Mutex<Option<String>>,
    menu_installed: AtomicBool,
    relaunch_requested: AtomicBool,
}

/// Headless [`Platform`]. Clones share state, so tests can keep one clone
/// for inspection while the controller owns the other.
#[derive(Clone)]
pub struct HeadlessPlatform {
    state: Arc<PlatformState>,
    events: mpsc::UnboundedSender<SurfaceEvent>,
}

impl HeadlessPlatform {
    /// Returns the platform plus the event receiver the controller consumes.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<SurfaceEvent>) {
        Self::with_work_area((1440, 900))
    }

    pub fn with_work_area(work_area: (u32, u32)) -> (Self, mpsc::UnboundedReceiver<SurfaceEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let platform = Self {
            state: Arc::new(PlatformState {
                work_area,
                ..PlatformState::default()
            }),
            events: tx,
        };
        (platform, rx)
    }

    /// Inject a platform-level event (test hook: `Activated`, `AllClosed`).
    pub fn emit(&self, event: SurfaceEvent) {
        let _ = self.events.send(event);
    }

    /// The most recently created surface, if any.
    pub fn last_surface(&self) -> Option<HeadlessSurface> {
        self.state.last_surface.lock().clone()
    }

    /// Options of every surface created so far.
    pub fn created_surfaces(&self) -> Vec<SurfaceOptions> {
        self.state.created.lock().clone()
    }

    pub fn notifications(&self) -> Vec<String> {
        self.state.notifications.lock().clone()
    }

    pub fn hotkey(&self) -> Option<String> {
        self.state.hotkey.lock().clone()
    }

    pub fn menu_installed(&self) -> bool {
        self.state.menu_installed.load(Ordering::SeqCst)
    }

    pub fn relaunch_requested(&self) -> bool {
        self.state.relaunch_requested.load(Ordering::SeqCst)
    }
}

impl Platform for HeadlessPlatform {
    type Surface = HeadlessSurface;

    fn work_area(&self) -> (u32, u32) {
        self.state.work_area
    }

    fn create_surface(&self, options: &SurfaceOptions) -> Result<HeadlessSurface> {
        tracing::info!(
            width = options.width,
            height = options.height,
            title = %options.title,
            "creating surface"
        );
        let surface = HeadlessSurface::new(options, self.events.clone());
        self.state.created.lock().push(options.clone());
        *self.state.last_surface.lock() = Some(surface.clone());
        Ok(surface)
    }

    fn show_notification(&self, body: &str) -> Result<()> {
        tracing::info!(body, "showing notification");
        self.state.notifications.lock().push(body.to_string());
        Ok(())
    }

    fn update_hotkey(&self, accelerator: &str) -> Result<()> {
        tracing::debug!(accelerator, "hotkey registered");
        *self.state.hotkey.lock() = Some(accelerator.to_string());
        Ok(())
    }

    fn install_app_menu(&self) {
        self.state.menu_installed.store(true, Ordering::SeqCst);
    }

    fn relaunch(&self) {
        tracing::info!("relaunch requested");
        self.state.relaunch_requested.store(true, Ordering::SeqCst);
    }
}
