//! Worker process lifecycle.
//!
//! The supervisor spawns the backend worker as a child process, passing it
//! only the network-relevant configuration fields as environment variables
//! while inheriting everything else from the parent. A monitor task owns the
//! child handle: it forwards worker stdout/stderr into the log stream, reaps
//! the process on exit, and publishes a startup failure if the worker writes
//! to stderr or exits before the controller has marked it operational.
//!
//! Termination is signal-based (the child handle lives in the monitor task):
//! SIGTERM to the worker's process group, a polled grace period, then
//! SIGKILL. Signalling a process that is already gone is a non-fatal no-op,
//! so `terminate` can be called more than once.

use crate::config::Config;
use crate::error::{validate_pid, Error, Result};
use chrono::{DateTime, Utc};
use nix::errno::Errno;
use nix::sys::signal::{self, killpg, Signal};
use parking_lot::Mutex as SyncMutex;
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::watch;

/// How long to wait for the worker to exit after SIGTERM before escalating.
const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(3);

/// Poll step while waiting out the grace period.
const GRACE_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// A startup failure observed by the monitor task before the worker was
/// marked operational.
#[derive(Debug, Clone)]
pub struct WorkerFailure {
    pub detail: String,
}

/// Identity of the spawned worker plus its failure-reporting channel.
///
/// At most one live handle exists per controller instance; `spawn` refuses
/// to create a second one while the first worker is still alive.
#[derive(Clone)]
pub struct WorkerHandle {
    pid: u32,
    started_at: DateTime<Utc>,
    operational: Arc<AtomicBool>,
    failure_rx: watch::Receiver<Option<WorkerFailure>>,
}

impl WorkerHandle {
    pub fn pid(&self) -> u32 {
        self.pid
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// The controller calls this once the readiness probe has succeeded.
    /// From then on worker stderr/exit are logged instead of being treated
    /// as startup failures.
    pub fn mark_operational(&self) {
        self.operational.store(true, Ordering::Release);
    }

    /// Startup failure reported so far, if any.
    pub fn startup_failure(&self) -> Option<WorkerFailure> {
        self.failure_rx.borrow().clone()
    }

    /// Watch channel the readiness loop polls alongside the probe.
    pub fn failure_watch(&self) -> watch::Receiver<Option<WorkerFailure>> {
        self.failure_rx.clone()
    }
}

/// Spawns, owns, and terminates the worker process.
pub struct WorkerSupervisor {
    config: Config,
    grace_period: Duration,
    handle: SyncMutex<Option<WorkerHandle>>,
}

impl WorkerSupervisor {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            grace_period: DEFAULT_GRACE_PERIOD,
            handle: SyncMutex::new(None),
        }
    }

    pub fn with_grace_period(mut self, grace_period: Duration) -> Self {
        self.grace_period = grace_period;
        self
    }

    /// The currently tracked worker, if any.
    pub fn current(&self) -> Option<WorkerHandle> {
        self.handle.lock().clone()
    }

    /// Whether the tracked worker process is still alive (signal 0 check).
    pub fn has_live_worker(&self) -> bool {
        let pid = match self.handle.lock().as_ref() {
            Some(handle) => handle.pid,
            None => return false,
        };
        match validate_pid(pid) {
            Ok(pid) => signal::kill(pid, None).is_ok(),
            Err(_) => false,
        }
    }

    /// Launch the worker as a child process.
    ///
    /// Environment: the parent's, plus the filtered network fields from
    /// configuration (`port`, `host`). Working directory: inherited.
    ///
    /// # Errors
    ///
    /// `WorkerAlreadyRunning` if a live worker is already tracked,
    /// `Config` if no worker command is configured,
    /// `WorkerSpawnFailed` if the OS-level spawn fails.
    pub async fn spawn(&self) -> Result<WorkerHandle> {
        {
            let slot = self.handle.lock();
            if let Some(existing) = slot.as_ref() {
                let alive = validate_pid(existing.pid)
                    .map(|pid| signal::kill(pid, None).is_ok())
                    .unwrap_or(false);
                if alive {
                    return Err(Error::WorkerAlreadyRunning);
                }
            }
        }

        let worker = &self.config.worker;
        if worker.command.is_empty() {
            return Err(Error::Config(
                "worker.command is not set; the controller cannot spawn a backend".to_string(),
            ));
        }

        tracing::debug!(
            command = %worker.command,
            args = ?worker.args,
            "spawning worker"
        );

        let mut cmd = Command::new(&worker.command);
        cmd.args(&worker.args)
            .envs(self.config.worker_env())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(false)
            .process_group(0); // New process group so signals reach worker children too

        let mut child = cmd.spawn().map_err(|e| {
            Error::WorkerSpawnFailed(format!("{}: {}", worker.command, e))
        })?;

        let pid = child.id().ok_or_else(|| {
            Error::WorkerSpawnFailed("worker exited before its pid could be read".to_string())
        })?;

        let (failure_tx, failure_rx) = watch::channel(None);
        let failure_tx = Arc::new(failure_tx);
        let operational = Arc::new(AtomicBool::new(false));

        let handle = WorkerHandle {
            pid,
            started_at: Utc::now(),
            operational: Arc::clone(&operational),
            failure_rx,
        };

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        tokio::spawn(monitor_worker(child, stdout, stderr, operational, failure_tx));

        *self.handle.lock() = Some(handle.clone());
        tracing::info!(pid, command = %worker.command, "worker spawned");
        Ok(handle)
    }

    /// Send a termination signal to the tracked worker and wait for it to go
    /// away, escalating to SIGKILL after the grace period.
    ///
    /// Callable multiple times: once the handle has been taken, or when the
    /// process is already gone (ESRCH), this is a no-op.
    pub async fn terminate(&self) -> Result<()> {
        let handle = self.handle.lock().take();
        let Some(handle) = handle else {
            return Ok(());
        };

        let pid = validate_pid(handle.pid)?;
        let uptime = Utc::now().signed_duration_since(handle.started_at());

        // SIGTERM to the process group first, fall back to the single process
        let signal_result =
            killpg(pid, Signal::SIGTERM).or_else(|_| signal::kill(pid, Signal::SIGTERM));

        match signal_result {
            Ok(()) => {
                let poll_count = (self.grace_period.as_millis()
                    / GRACE_POLL_INTERVAL.as_millis())
                .max(1) as u64;
                for _ in 0..poll_count {
                    tokio::time::sleep(GRACE_POLL_INTERVAL).await;
                    if signal::kill(pid, None).is_err() {
                        tracing::debug!(
                            pid = handle.pid,
                            uptime_secs = uptime.num_seconds(),
                            "worker exited after SIGTERM"
                        );
                        return Ok(());
                    }
                }

                tracing::warn!(
                    pid = handle.pid,
                    grace = ?self.grace_period,
                    "worker did not exit after SIGTERM, sending SIGKILL"
                );
                let _ = killpg(pid, Signal::SIGKILL).or_else(|_| signal::kill(pid, Signal::SIGKILL));
                tokio::time::sleep(GRACE_POLL_INTERVAL).await;
            }
            Err(Errno::ESRCH) => {
                tracing::debug!(pid = handle.pid, "worker already gone");
            }
            Err(e) => {
                // Non-fatal: shutdown must proceed regardless
                tracing::warn!(pid = handle.pid, "failed to signal worker: {}", e);
            }
        }

        Ok(())
    }
}

/// Owns the child: forwards output, reaps the process, reports startup
/// failures on the watch channel.
async fn monitor_worker(
    mut child: Child,
    stdout: Option<tokio::process::ChildStdout>,
    stderr: Option<tokio::process::ChildStderr>,
    operational: Arc<AtomicBool>,
    failure_tx: Arc<watch::Sender<Option<WorkerFailure>>>,
) {
    if let Some(out) = stdout {
        tokio::spawn(async move {
            let mut lines = BufReader::new(out).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                tracing::debug!(target: "deskhost::worker", "{}", line);
            }
        });
    }

    if let Some(err) = stderr {
        let operational = Arc::clone(&operational);
        let failure_tx = Arc::clone(&failure_tx);
        tokio::spawn(async move {
            let mut lines = BufReader::new(err).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                if operational.load(Ordering::Acquire) {
                    tracing::warn!(target: "deskhost::worker", "{}", line);
                } else {
                    tracing::error!("worker wrote to stderr during startup: {}", line);
                    report_failure(&failure_tx, format!("stderr during startup: {}", line));
                }
            }
        });
    }

    match child.wait().await {
        Ok(status) => {
            if operational.load(Ordering::Acquire) {
                if status.success() {
                    tracing::info!("worker exited cleanly");
                } else {
                    tracing::warn!("worker exited with {}", status);
                }
            } else {
                // Any exit before the probe succeeded means the worker never
                // came up; the readiness loop turns this into a fatal error.
                tracing::error!("worker exited during startup with {}", status);
                report_failure(
                    &failure_tx,
                    format!("worker exited during startup with {}", status),
                );
            }
        }
        Err(e) => {
            tracing::warn!("failed to wait on worker: {}", e);
        }
    }
}

fn report_failure(tx: &watch::Sender<Option<WorkerFailure>>, detail: String) {
    // Keep the first failure; later ones are usually consequences of it.
    if tx.borrow().is_none() {
        tx.send_replace(Some(WorkerFailure { detail }));
    }
}
