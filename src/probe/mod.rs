//! Worker readiness probing.
//!
//! The worker's startup time is unbounded from the controller's point of
//! view (OS scheduling, port binding), so readiness is synchronized by
//! polling: short-timeout probe attempts against the worker's liveness
//! endpoint, retried on an interval until one succeeds. The loop is a hard
//! barrier — the surface is only created, and only loads remote content,
//! after [`await_ready`] returns.
//!
//! Two ways out besides success: a supervisor-reported startup failure
//! aborts the wait immediately (no point polling a dead worker), and an
//! optional overall deadline turns "never became ready" into an error.

mod http;

pub use http::HttpProber;

use crate::config::ProbeConfig;
use crate::error::{Error, Result};
use crate::supervisor::WorkerFailure;
use async_trait::async_trait;
use std::time::Instant;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

/// A single liveness check against the worker.
///
/// Transient failures (timeout, refused connection, non-2xx) are reported as
/// `Ok(false)`, never as errors — the readiness loop treats them all the
/// same way.
#[async_trait]
pub trait LivenessProbe: Send + Sync {
    async fn check(&self) -> Result<bool>;

    /// Probed endpoint, for diagnostics.
    fn target(&self) -> &str;
}

/// Block until a probe attempt succeeds.
///
/// Each iteration, in order: a cancelled token returns [`Error::Cancelled`];
/// a worker startup failure returns [`Error::WorkerStartFailed`]; an expired
/// deadline returns [`Error::WorkerNotReady`]; a successful probe returns
/// `Ok(())`. Otherwise the loop sleeps out the retry interval and goes
/// again. On a run of only failed probes this never returns success.
pub async fn await_ready(
    probe: &dyn LivenessProbe,
    policy: &ProbeConfig,
    mut worker_failure: watch::Receiver<Option<WorkerFailure>>,
    cancel: &CancellationToken,
) -> Result<()> {
    let started = Instant::now();
    let deadline = policy.deadline();
    let mut attempts: u64 = 0;

    tracing::info!(url = probe.target(), "waiting for worker to become ready");

    loop {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        if let Some(failure) = worker_failure.borrow_and_update().clone() {
            return Err(Error::WorkerStartFailed(failure.detail));
        }

        if let Some(limit) = deadline {
            if started.elapsed() >= limit {
                return Err(Error::WorkerNotReady {
                    url: probe.target().to_string(),
                    waited_secs: limit.as_secs(),
                });
            }
        }

        attempts += 1;
        match probe.check().await {
            Ok(true) => {
                tracing::info!(
                    attempts,
                    elapsed = ?started.elapsed(),
                    "worker is ready"
                );
                return Ok(());
            }
            Ok(false) => {
                tracing::trace!(attempts, "worker not ready yet");
            }
            Err(e) => {
                tracing::trace!(attempts, "probe error: {}", e);
            }
        }

        tokio::time::sleep(policy.interval()).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Minimal HTTP fixture: answers each connection with the next status
    /// from `statuses`, then `200 OK` forever.
    async fn spawn_endpoint(statuses: Vec<&'static str>) -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            let mut served = 0usize;
            loop {
                let Ok((mut sock, _)) = listener.accept().await else {
                    break;
                };
                let status = statuses.get(served).copied().unwrap_or("200 OK");
                served += 1;
                let mut buf = [0u8; 1024];
                let _ = sock.read(&mut buf).await;
                let response = format!(
                    "HTTP/1.1 {}\r\ncontent-length: 0\r\nconnection: close\r\n\r\n",
                    status
                );
                let _ = sock.write_all(response.as_bytes()).await;
                let _ = sock.shutdown().await;
            }
        });
        port
    }

    fn fast_policy(deadline_secs: Option<u64>) -> ProbeConfig {
        ProbeConfig {
            attempt_timeout_ms: 200,
            interval_ms: 10,
            deadline_secs,
        }
    }

    #[tokio::test]
    async fn returns_after_first_success() {
        let port = spawn_endpoint(vec![]).await;
        let prober = HttpProber::new(
            format!("http://127.0.0.1:{}/run", port),
            Duration::from_millis(200),
        )
        .unwrap();

        let (_failure_tx, failure_rx) = watch::channel(None);
        await_ready(
            &prober,
            &fast_policy(Some(5)),
            failure_rx,
            &CancellationToken::new(),
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn retries_through_unready_responses() {
        let port = spawn_endpoint(vec![
            "503 Service Unavailable",
            "503 Service Unavailable",
            "404 Not Found",
        ])
        .await;
        let prober = HttpProber::new(
            format!("http://127.0.0.1:{}/run", port),
            Duration::from_millis(200),
        )
        .unwrap();

        let (_failure_tx, failure_rx) = watch::channel(None);
        await_ready(
            &prober,
            &fast_policy(Some(10)),
            failure_rx,
            &CancellationToken::new(),
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn deadline_expires_when_never_ready() {
        // Nothing listens on this port
        let prober = HttpProber::new(
            "http://127.0.0.1:59997/run".to_string(),
            Duration::from_millis(50),
        )
        .unwrap();

        let (_failure_tx, failure_rx) = watch::channel(None);
        let result = await_ready(
            &prober,
            &fast_policy(Some(1)),
            failure_rx,
            &CancellationToken::new(),
        )
        .await;

        match result {
            Err(Error::WorkerNotReady { waited_secs, .. }) => assert_eq!(waited_secs, 1),
            other => panic!("expected WorkerNotReady, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn worker_failure_aborts_the_wait() {
        let prober = HttpProber::new(
            "http://127.0.0.1:59996/run".to_string(),
            Duration::from_millis(50),
        )
        .unwrap();

        let (tx, rx) = watch::channel(None);
        tx.send_replace(Some(WorkerFailure {
            detail: "worker exited during startup with exit status: 3".to_string(),
        }));

        let result = await_ready(
            &prober,
            &fast_policy(None),
            rx,
            &CancellationToken::new(),
        )
        .await;

        match result {
            Err(Error::WorkerStartFailed(detail)) => {
                assert!(detail.contains("exited during startup"))
            }
            other => panic!("expected WorkerStartFailed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn cancellation_aborts_the_wait() {
        let prober = HttpProber::new(
            "http://127.0.0.1:59995/run".to_string(),
            Duration::from_millis(50),
        )
        .unwrap();

        let cancel = CancellationToken::new();
        cancel.cancel();

        let (_failure_tx, failure_rx) = watch::channel(None);
        let result = await_ready(&prober, &fast_policy(None), failure_rx, &cancel).await;
        assert!(matches!(result, Err(Error::Cancelled)));
    }
}
