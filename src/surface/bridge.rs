//! Capability bridge exposed to the presentation layer.
//!
//! A fixed set of callable operations, each a thin delegation to the current
//! surface (or the platform). Every operation is safe to call when no
//! surface exists: window operations become no-ops, queries return their
//! neutral value. The bridge carries no state of its own beyond the shared
//! application context.

use super::{Platform, Surface};
use crate::config::Config;
use crate::controller::AppContext;
use crate::error::Result;
use crate::state::ExitStatus;
use std::sync::Arc;

pub struct CapabilityBridge<P: Platform> {
    ctx: Arc<AppContext<P>>,
}

impl<P: Platform> CapabilityBridge<P> {
    pub(crate) fn new(ctx: Arc<AppContext<P>>) -> Self {
        Self { ctx }
    }

    fn surface(&self) -> Option<Arc<P::Surface>> {
        self.ctx.surface.lock().clone()
    }

    /// Close the application (asks the window to close; the close event then
    /// drives the shutdown sequencer).
    pub fn close_app(&self) {
        if let Some(surface) = self.surface() {
            surface.close();
        }
    }

    /// Relaunch after exit, then close.
    pub fn restart(&self) {
        self.ctx.platform.relaunch();
        self.close_app();
    }

    pub fn minimize(&self) {
        if let Some(surface) = self.surface() {
            surface.minimize();
        }
    }

    pub fn maximize(&self) {
        if let Some(surface) = self.surface() {
            surface.maximize();
        }
    }

    pub fn unmaximize(&self) {
        if let Some(surface) = self.surface() {
            surface.unmaximize();
        }
    }

    pub fn is_maximized(&self) -> bool {
        self.surface().map(|s| s.is_maximized()).unwrap_or(false)
    }

    pub fn open_devtools(&self) {
        if let Some(surface) = self.surface() {
            surface.open_devtools();
        }
    }

    /// Set the window title, prefixed with the application name.
    pub fn set_title(&self, title: &str) {
        if let Some(surface) = self.surface() {
            surface.set_title(&format!("{} - {}", self.ctx.config.app_name, title));
        }
    }

    /// Re-register the global hotkey under a new accelerator.
    pub fn change_hotkey(&self, accelerator: &str) -> Result<()> {
        self.ctx.platform.update_hotkey(accelerator)?;
        *self.ctx.hotkey.lock() = accelerator.to_string();
        Ok(())
    }

    /// Pass-through configuration accessor.
    pub fn config(&self) -> &Config {
        &self.ctx.config
    }

    /// Effective exit status used for session-restore decisions.
    pub fn exit_status(&self) -> ExitStatus {
        *self.ctx.exit_status.lock()
    }

    pub fn set_exit_status(&self, status: ExitStatus) {
        *self.ctx.exit_status.lock() = status;
    }
}
