//! Capability bridge tests: every operation is a thin delegation to the
//! current surface, and a no-op when none exists.

use deskhost::surface::{HeadlessPlatform, Surface};
use deskhost::{
    Config, Controller, ExitStatus, ProbeConfig, StateStore, WorkerConfig,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

async fn spawn_liveness_endpoint() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        loop {
            let Ok((mut sock, _)) = listener.accept().await else {
                break;
            };
            tokio::spawn(async move {
                let mut buf = [0u8; 1024];
                let _ = sock.read(&mut buf).await;
                let _ = sock
                    .write_all(b"HTTP/1.1 200 OK\r\ncontent-length: 0\r\nconnection: close\r\n\r\n")
                    .await;
                let _ = sock.shutdown().await;
            });
        }
    });
    port
}

fn test_config(port: u16) -> Config {
    Config {
        host: "127.0.0.1".to_string(),
        port,
        worker: WorkerConfig {
            command: "/bin/sleep".to_string(),
            args: vec!["300".to_string()],
        },
        probe: ProbeConfig {
            attempt_timeout_ms: 200,
            interval_ms: 20,
            deadline_secs: Some(10),
        },
        ..Config::default()
    }
}

async fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    condition()
}

#[tokio::test]
async fn bridge_operations_are_noops_without_a_surface() {
    let dir = tempfile::tempdir().unwrap();
    let store = StateStore::open(dir.path().join("state.json")).unwrap();
    let (platform, events) = HeadlessPlatform::new();

    let controller = Controller::builder()
        .config(test_config(59990))
        .store(store)
        .platform(platform, events)
        .exit_hook(Arc::new(|_| {}))
        .build()
        .unwrap();
    let bridge = controller.bridge();

    // No surface exists yet: nothing panics, queries return neutral values
    bridge.close_app();
    bridge.minimize();
    bridge.maximize();
    bridge.unmaximize();
    bridge.open_devtools();
    bridge.set_title("ignored");
    assert!(!bridge.is_maximized());
    assert_eq!(bridge.exit_status(), ExitStatus::Ok);
}

#[tokio::test]
async fn bridge_delegates_to_the_live_surface() {
    let port = spawn_liveness_endpoint().await;
    let dir = tempfile::tempdir().unwrap();
    let store = StateStore::open(dir.path().join("state.json")).unwrap();

    let (platform, events) = HeadlessPlatform::new();
    let observer = platform.clone();

    let mut controller = Controller::builder()
        .config(test_config(port))
        .store(store)
        .platform(platform, events)
        .exit_hook(Arc::new(|_| {}))
        .build()
        .unwrap();
    let bridge = controller.bridge();

    let run = tokio::spawn(async move { controller.run().await });
    assert!(wait_until(Duration::from_secs(5), || observer.last_surface().is_some()).await);
    let surface = observer.last_surface().unwrap();

    bridge.set_title("session 1");
    assert_eq!(surface.title(), "deskhost - session 1");

    bridge.maximize();
    assert!(bridge.is_maximized());
    bridge.unmaximize();
    assert!(!bridge.is_maximized());

    bridge.minimize();
    assert!(!surface.is_visible());

    bridge.open_devtools();
    assert!(surface.devtools_open());

    bridge.change_hotkey("Alt+X").unwrap();
    assert_eq!(observer.hotkey().as_deref(), Some("Alt+X"));

    bridge.set_exit_status(ExitStatus::Unknown);
    assert_eq!(bridge.exit_status(), ExitStatus::Unknown);

    assert_eq!(bridge.config().port, port);

    bridge.close_app();
    tokio::time::timeout(Duration::from_secs(10), run)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn restart_relaunches_and_closes() {
    let port = spawn_liveness_endpoint().await;
    let dir = tempfile::tempdir().unwrap();
    let store = StateStore::open(dir.path().join("state.json")).unwrap();

    let (platform, events) = HeadlessPlatform::new();
    let observer = platform.clone();
    let exits = Arc::new(AtomicUsize::new(0));
    let exits2 = Arc::clone(&exits);

    let mut controller = Controller::builder()
        .config(test_config(port))
        .store(store)
        .platform(platform, events)
        .exit_hook(Arc::new(move |_| {
            exits2.fetch_add(1, Ordering::SeqCst);
        }))
        .build()
        .unwrap();
    let bridge = controller.bridge();

    let run = tokio::spawn(async move { controller.run().await });
    assert!(wait_until(Duration::from_secs(5), || observer.last_surface().is_some()).await);

    bridge.restart();

    tokio::time::timeout(Duration::from_secs(10), run)
        .await
        .unwrap()
        .unwrap()
        .unwrap();

    assert!(observer.relaunch_requested());
    assert_eq!(exits.load(Ordering::SeqCst), 1);
}
