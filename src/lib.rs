//! # deskhost
//!
//! Startup/shutdown orchestrator for a desktop application: a controller
//! process that spawns a dependent backend worker, waits until the worker
//! answers a liveness probe, presents a single user-facing surface, and
//! tears everything down deterministically on exit.
//!
//! ## Features
//!
//! - **Worker supervision**: spawn the backend as a child process with a
//!   filtered environment, detect startup failures (stderr output or early
//!   exit), terminate idempotently on shutdown
//! - **Readiness barrier**: short-timeout HTTP probes against the worker's
//!   liveness endpoint, retried until it answers, bounded by an optional
//!   deadline
//! - **Persisted exit state**: a crash-detectable `ok`/`unknown` record plus
//!   session snapshot and window size, surviving restarts
//! - **Race-free shutdown**: exactly-once sequencing, deferred teardown, and
//!   a catch-all that guarantees process exit even when teardown fails
//! - **Presentation seam**: the windowing backend is a pair of traits
//!   ([`Platform`]/[`Surface`]); a headless implementation backs the CLI and
//!   the tests
//!
//! ## Quick Start
//!
//! ```no_run
//! use deskhost::surface::HeadlessPlatform;
//! use deskhost::{Config, Controller, StartupFlags, StateStore};
//!
//! # async fn example() -> Result<(), deskhost::Error> {
//! let config = Config::load(None)?;
//! let store = StateStore::open(StateStore::default_path(&config.app_name)?)?;
//! let (platform, events) = HeadlessPlatform::new();
//!
//! let mut controller = Controller::builder()
//!     .config(config)
//!     .flags(StartupFlags::default())
//!     .store(store)
//!     .platform(platform, events)
//!     .build()?;
//!
//! controller.run().await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Concurrency Model
//!
//! The controller runs on a multi-threaded tokio runtime; the worker is an
//! independent OS process. Synchronous state (surface slot, exit status,
//! phase) sits behind `parking_lot` locks never held across `.await`;
//! startup can be aborted through a `CancellationToken`; the shutdown
//! sequence runs exactly once even under racing close events.

pub mod config;
pub mod controller;
pub mod error;
pub mod probe;
pub mod shutdown;
pub mod state;
pub mod supervisor;
pub mod surface;
pub mod timers;

// Re-export commonly used types
pub use config::{Config, ProbeConfig, WorkerConfig};
pub use controller::{AppContext, Controller, ControllerBuilder, Phase, StartupFlags};
pub use error::{Error, Result};
pub use state::{ExitStatus, StateStore, WindowSize};
pub use supervisor::{WorkerHandle, WorkerSupervisor};
pub use surface::{CapabilityBridge, Platform, Surface, SurfaceEvent, SurfaceOptions};
pub use timers::PendingTimers;
