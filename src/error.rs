use miette::Diagnostic;
use std::io;
use thiserror::Error;

#[derive(Error, Diagnostic, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    #[diagnostic(code(deskhost::config::error))]
    Config(String),

    #[error("State store error: {0}")]
    #[diagnostic(
        code(deskhost::state::error),
        help("Check permissions on the state directory (default: ~/.deskhost)")
    )]
    State(String),

    #[error("Failed to spawn worker: {0}")]
    #[diagnostic(
        code(deskhost::worker::spawn_failed),
        help("Check that the worker command exists and is executable")
    )]
    WorkerSpawnFailed(String),

    #[error("Worker failed during startup: {0}")]
    #[diagnostic(
        code(deskhost::worker::start_failed),
        help("Check the worker's stderr output above for the underlying failure")
    )]
    WorkerStartFailed(String),

    #[error("A worker is already running for this controller")]
    #[diagnostic(code(deskhost::worker::already_running))]
    WorkerAlreadyRunning,

    #[error("Worker did not become ready at {url} within {waited_secs}s")]
    #[diagnostic(
        code(deskhost::probe::not_ready),
        help("The worker may be slow to start. Raise probe.deadline_secs, or set it to null to wait indefinitely")
    )]
    WorkerNotReady { url: String, waited_secs: u64 },

    #[error("Startup cancelled")]
    Cancelled,

    #[error("Invalid PID {pid}: {reason}")]
    InvalidPid { pid: u32, reason: String },

    #[error("Surface error: {0}")]
    #[diagnostic(code(deskhost::surface::error))]
    Surface(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Returns a helpful suggestion for resolving this error, if available.
    pub fn suggestion(&self) -> Option<String> {
        match self {
            Error::Config(_) => Some("Check your deskhost.yaml for typos or missing fields".to_string()),
            Error::WorkerSpawnFailed(_) => Some(
                "Check that worker.command in deskhost.yaml names an existing executable".to_string(),
            ),
            Error::WorkerNotReady { url, .. } => Some(format!(
                "Verify the worker actually listens on {} and answers GET requests. \
                 Raise probe.deadline_secs if it is just slow to bind.",
                url
            )),
            Error::State(_) => Some(
                "The state file could not be read or written. Check disk space and \
                 permissions on the state directory."
                    .to_string(),
            ),
            _ => None,
        }
    }
}

/// Validates and converts a u32 PID to nix::unistd::Pid safely.
/// Returns Err for PID 0 (process group), PID 1 (init), or values > i32::MAX.
pub fn validate_pid(pid: u32) -> Result<nix::unistd::Pid> {
    if pid == 0 {
        return Err(Error::InvalidPid {
            pid,
            reason: "PID 0 refers to the process group, not a process".to_string(),
        });
    }
    if pid == 1 {
        return Err(Error::InvalidPid {
            pid,
            reason: "refusing to signal PID 1 (init)".to_string(),
        });
    }
    if pid > i32::MAX as u32 {
        return Err(Error::InvalidPid {
            pid,
            reason: format!("PID {} exceeds i32::MAX, cannot convert safely", pid),
        });
    }
    Ok(nix::unistd::Pid::from_raw(pid as i32))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_pid_zero_and_init() {
        assert!(validate_pid(0).is_err());
        assert!(validate_pid(1).is_err());
    }

    #[test]
    fn rejects_pid_overflow() {
        assert!(validate_pid(u32::MAX).is_err());
        assert!(validate_pid(i32::MAX as u32 + 1).is_err());
    }

    #[test]
    fn accepts_ordinary_pid() {
        let pid = validate_pid(4321).unwrap();
        assert_eq!(pid.as_raw(), 4321);
    }
}
