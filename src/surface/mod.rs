//! Surface (window) abstraction and lifecycle glue.
//!
//! The presentation backend is an external collaborator. The controller only
//! needs a narrow seam: create the single window with resolved options, load
//! content into it, and receive its lifecycle events. [`Platform`] is the
//! app-level backend (display geometry, notifications, hotkeys, relaunch);
//! [`Surface`] is the one window it creates.
//!
//! A headless implementation backs the CLI binary and the test suite; a real
//! windowing backend implements the same traits out of tree.

mod bridge;
mod headless;

pub use bridge::CapabilityBridge;
pub use headless::{HeadlessPlatform, HeadlessSurface};

use crate::error::Result;
use crate::state::WindowSize;

/// Options the single window is created with.
///
/// The controller only computes `width`/`height`; the styling fields
/// (frameless, transparent, custom title bar) are fixed and simply carried
/// to the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SurfaceOptions {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub frameless: bool,
    pub transparent: bool,
    pub custom_title_bar: bool,
    pub fullscreenable: bool,
}

impl SurfaceOptions {
    /// Resolve creation options: the persisted last-known size wins when
    /// present and not in development mode, otherwise the display work area.
    pub fn resolve(
        app_name: &str,
        persisted: Option<WindowSize>,
        work_area: (u32, u32),
        dev: bool,
    ) -> Self {
        let (width, height) = match persisted {
            Some(size) if !dev => (size.width, size.height),
            _ => work_area,
        };
        Self {
            title: app_name.to_string(),
            width,
            height,
            frameless: true,
            transparent: true,
            custom_title_bar: true,
            fullscreenable: true,
        }
    }
}

/// Lifecycle events delivered from the presentation backend to the
/// controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceEvent {
    /// The window's close control was used. Triggers the shutdown sequencer.
    CloseRequested,
    /// The window gained focus. Forwarded to the presentation layer as a
    /// fire-and-forget signal.
    Focused,
    /// Every window is gone (platform-level quit path). Same handling as
    /// `CloseRequested`.
    AllClosed,
    /// The application was activated with no window present; re-runs the
    /// full startup sequence.
    Activated,
}

/// The single user-facing window.
pub trait Surface: Send + Sync + 'static {
    fn load_url(&self, url: &str) -> Result<()>;

    fn show(&self);
    fn hide(&self);
    fn is_visible(&self) -> bool;

    fn minimize(&self);
    fn maximize(&self);
    fn unmaximize(&self);
    fn is_maximized(&self) -> bool;

    fn set_title(&self, title: &str);
    fn open_devtools(&self);

    /// Ask the window to close. The backend answers with
    /// [`SurfaceEvent::CloseRequested`].
    fn close(&self);

    /// Fire-and-forget "focused" signal into the presentation layer.
    fn notify_focused(&self);
}

/// App-level presentation backend.
pub trait Platform: Send + Sync + 'static {
    type Surface: Surface;

    /// Usable size of the primary display's work area.
    fn work_area(&self) -> (u32, u32);

    fn create_surface(&self, options: &SurfaceOptions) -> Result<Self::Surface>;

    /// One-shot system notification.
    fn show_notification(&self, body: &str) -> Result<()>;

    /// (Re-)register the global hotkey that toggles the surface.
    fn update_hotkey(&self, accelerator: &str) -> Result<()>;

    /// Install the application menu.
    fn install_app_menu(&self);

    /// Schedule a relaunch of the application after it exits.
    fn relaunch(&self);
}
