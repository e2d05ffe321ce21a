//! Startup configuration for the controller.
//!
//! Configuration is read from a YAML file (`deskhost.yaml` in the working
//! directory unless a path is given), with every field optional and
//! defaulted, and a handful of environment overrides applied on top
//! (`DESKHOST_HOST`, `DESKHOST_PORT`, `DESKHOST_DEV_PORT`).
//!
//! Fields the controller does not interpret are collected into `extras` and
//! carried along untouched. Only the network-relevant fields (`port`,
//! `host`) are ever exported to the worker process — see
//! [`Config::worker_env`].

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Config file looked up in the working directory when no path is given.
const DEFAULT_CONFIG_FILE: &str = "deskhost.yaml";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Application name, used for the surface title, notifications, and the
    /// default state directory.
    pub app_name: String,

    /// Host the worker binds its liveness endpoint on.
    pub host: String,

    /// Port the worker binds its liveness endpoint on.
    pub port: u16,

    /// Dev-server port used for the content URL in development mode.
    pub dev_port: u16,

    /// Global hotkey that toggles the surface (presentation detail, carried
    /// into the autohide notification text).
    pub hotkey: String,

    /// Whether to ask the platform to install the application menu.
    pub show_menu: bool,

    /// Directory holding the packaged content document.
    pub assets_dir: PathBuf,

    /// Delay before the surface is hidden when started with `--autohide`.
    pub autohide_delay_ms: u64,

    /// How the worker process is launched.
    pub worker: WorkerConfig,

    /// Readiness probe policy.
    pub probe: ProbeConfig,

    /// Fields this crate does not interpret. Never exported to the worker.
    #[serde(flatten)]
    pub extras: HashMap<String, serde_yaml::Value>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            app_name: "deskhost".to_string(),
            host: "127.0.0.1".to_string(),
            port: 5577,
            dev_port: 5570,
            hotkey: "Control+2".to_string(),
            show_menu: true,
            assets_dir: PathBuf::from("assets"),
            autohide_delay_ms: 500,
            worker: WorkerConfig::default(),
            probe: ProbeConfig::default(),
            extras: HashMap::new(),
        }
    }
}

/// Worker launch command.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Executable to spawn. Must be set before the supervisor can spawn.
    pub command: String,

    /// Arguments passed to the executable.
    pub args: Vec<String>,
}

/// Readiness probe policy.
///
/// Attempts are short (100ms) and cheap; the overall deadline bounds how
/// long startup will wait for the worker. `deadline_secs: null` waits as
/// long as it takes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// Timeout for a single probe attempt, in milliseconds.
    pub attempt_timeout_ms: u64,

    /// Pause between attempts, in milliseconds.
    pub interval_ms: u64,

    /// Overall deadline for the worker to become ready, in seconds.
    /// `None` means wait forever.
    pub deadline_secs: Option<u64>,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            attempt_timeout_ms: 100,
            interval_ms: 100,
            deadline_secs: Some(60),
        }
    }
}

impl ProbeConfig {
    pub fn attempt_timeout(&self) -> Duration {
        Duration::from_millis(self.attempt_timeout_ms)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn deadline(&self) -> Option<Duration> {
        self.deadline_secs.map(Duration::from_secs)
    }
}

impl Config {
    /// Load configuration from `path`, or from `deskhost.yaml` in the working
    /// directory, falling back to defaults when no file exists. Environment
    /// overrides are applied last.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config: Config = match path {
            Some(p) => {
                let text = std::fs::read_to_string(p).map_err(|e| {
                    Error::Config(format!("could not read {}: {}", p.display(), e))
                })?;
                serde_yaml::from_str(&text)?
            }
            None => {
                let default = Path::new(DEFAULT_CONFIG_FILE);
                if default.exists() {
                    serde_yaml::from_str(&std::fs::read_to_string(default)?)?
                } else {
                    Config::default()
                }
            }
        };

        config.apply_env_overrides(|name| std::env::var(name).ok());
        Ok(config)
    }

    /// Apply environment overrides through a lookup function (injectable so
    /// tests don't have to mutate process-wide environment).
    pub fn apply_env_overrides(&mut self, get: impl Fn(&str) -> Option<String>) {
        if let Some(host) = get("DESKHOST_HOST") {
            self.host = host;
        }
        if let Some(port) = get("DESKHOST_PORT") {
            match port.parse() {
                Ok(p) => self.port = p,
                Err(_) => tracing::warn!("ignoring invalid DESKHOST_PORT: {}", port),
            }
        }
        if let Some(port) = get("DESKHOST_DEV_PORT") {
            match port.parse() {
                Ok(p) => self.dev_port = p,
                Err(_) => tracing::warn!("ignoring invalid DESKHOST_DEV_PORT: {}", port),
            }
        }
    }

    /// The filtered view of configuration exported to the worker process:
    /// exactly the network-relevant fields, nothing else.
    pub fn worker_env(&self) -> Vec<(String, String)> {
        vec![
            ("port".to_string(), self.port.to_string()),
            ("host".to_string(), self.host.clone()),
        ]
    }

    /// Liveness endpoint the readiness prober polls.
    pub fn liveness_url(&self) -> String {
        format!("http://{}:{}/run", self.host, self.port)
    }

    /// What the surface loads once the worker is ready: the packaged
    /// document in production, the dev server in development mode.
    pub fn content_url(&self, dev: bool) -> String {
        if dev {
            return format!("http://localhost:{}", self.dev_port);
        }
        let index = self.assets_dir.join("index.html");
        let absolute = if index.is_absolute() {
            index
        } else {
            std::env::current_dir()
                .map(|d| d.join(&index))
                .unwrap_or(index)
        };
        format!("file://{}", absolute.display())
    }
}
