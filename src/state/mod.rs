//! Persisted exit/session state.
//!
//! A small JSON file records how the previous run ended (`exit_status`), an
//! opaque session snapshot for the presentation layer to restore, and the
//! last window size. The file survives process restarts; the next launch
//! reads it to decide whether session restore should be offered.
//!
//! Writes go through a temp-file-then-rename so an interrupted write never
//! leaves a half-written state file behind. All access is serialized by a
//! synchronous mutex: the store is shared across the multi-threaded runtime
//! and has no other writer coordination.

use crate::error::{Error, Result};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// How the previous run of the controller ended.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExitStatus {
    /// Clean shutdown: the shutdown sequencer ran to completion.
    #[default]
    Ok,
    /// The process died before reaching a clean shutdown.
    Unknown,
}

/// Last known surface dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowSize {
    pub width: u32,
    pub height: u32,
}

/// On-disk layout. `exit_status` and `sessions` share a record; `window_size`
/// is its own namespaced key.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
struct StateFile {
    exit_status: ExitStatus,
    sessions: Option<serde_json::Value>,
    window_size: Option<WindowSize>,
}

struct StoreInner {
    path: PathBuf,
    cached: Mutex<StateFile>,
}

/// Key-addressable persisted store for last-known-good session/exit state.
///
/// Cheap to clone; clones share the same file and cache.
#[derive(Clone)]
pub struct StateStore {
    inner: Arc<StoreInner>,
}

impl StateStore {
    /// Open (or create) the store at `path`. The parent directory is created
    /// if needed. A corrupt state file is logged and replaced by defaults
    /// rather than failing startup.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    Error::State(format!(
                        "failed to create state directory {}: {}",
                        parent.display(),
                        e
                    ))
                })?;
            }
        }

        let cached = match std::fs::read_to_string(&path) {
            Ok(text) => match serde_json::from_str(&text) {
                Ok(state) => state,
                Err(e) => {
                    tracing::warn!(
                        "state file {} is corrupt ({}), starting fresh",
                        path.display(),
                        e
                    );
                    StateFile::default()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => StateFile::default(),
            Err(e) => {
                return Err(Error::State(format!(
                    "failed to read {}: {}",
                    path.display(),
                    e
                )))
            }
        };

        Ok(Self {
            inner: Arc::new(StoreInner {
                path,
                cached: Mutex::new(cached),
            }),
        })
    }

    /// Default state file location: `~/.<app_name>/state.json`.
    pub fn default_path(app_name: &str) -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| Error::Config("could not determine home directory".to_string()))?;
        Ok(home.join(format!(".{}", app_name)).join("state.json"))
    }

    pub fn exit_status(&self) -> ExitStatus {
        self.inner.cached.lock().exit_status
    }

    pub fn set_exit_status(&self, status: ExitStatus) -> Result<()> {
        let mut state = self.inner.cached.lock();
        state.exit_status = status;
        self.persist(&state)
    }

    pub fn sessions(&self) -> Option<serde_json::Value> {
        self.inner.cached.lock().sessions.clone()
    }

    pub fn set_sessions(&self, sessions: Option<serde_json::Value>) -> Result<()> {
        let mut state = self.inner.cached.lock();
        state.sessions = sessions;
        self.persist(&state)
    }

    /// Shutdown-path write: exit status `ok` and no session snapshot, in a
    /// single persist. An explicit user-driven close means no restore is
    /// desired on the next launch.
    pub fn record_clean_exit(&self) -> Result<()> {
        let mut state = self.inner.cached.lock();
        state.exit_status = ExitStatus::Ok;
        state.sessions = None;
        self.persist(&state)
    }

    pub fn window_size(&self) -> Option<WindowSize> {
        self.inner.cached.lock().window_size
    }

    pub fn set_window_size(&self, size: WindowSize) -> Result<()> {
        let mut state = self.inner.cached.lock();
        state.window_size = Some(size);
        self.persist(&state)
    }

    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    fn persist(&self, state: &StateFile) -> Result<()> {
        let text = serde_json::to_string_pretty(state)?;
        let tmp = self.inner.path.with_extension("json.tmp");
        std::fs::write(&tmp, text)
            .map_err(|e| Error::State(format!("failed to write {}: {}", tmp.display(), e)))?;
        std::fs::rename(&tmp, &self.inner.path).map_err(|e| {
            Error::State(format!(
                "failed to replace {}: {}",
                self.inner.path.display(),
                e
            ))
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_in(dir: &tempfile::TempDir) -> StateStore {
        StateStore::open(dir.path().join("state.json")).unwrap()
    }

    #[test]
    fn missing_file_defaults_to_ok() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        assert_eq!(store.exit_status(), ExitStatus::Ok);
        assert!(store.sessions().is_none());
        assert!(store.window_size().is_none());
    }

    #[test]
    fn exit_status_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");

        let store = StateStore::open(&path).unwrap();
        store.set_exit_status(ExitStatus::Unknown).unwrap();
        drop(store);

        let reopened = StateStore::open(&path).unwrap();
        assert_eq!(reopened.exit_status(), ExitStatus::Unknown);
    }

    #[test]
    fn record_clean_exit_sets_ok_and_clears_sessions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");

        let store = StateStore::open(&path).unwrap();
        store.set_exit_status(ExitStatus::Unknown).unwrap();
        store
            .set_sessions(Some(serde_json::json!({"tabs": ["a", "b"]})))
            .unwrap();
        store.record_clean_exit().unwrap();
        drop(store);

        let reopened = StateStore::open(&path).unwrap();
        assert_eq!(reopened.exit_status(), ExitStatus::Ok);
        assert!(reopened.sessions().is_none());
    }

    #[test]
    fn window_size_is_namespaced_separately() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");

        let store = StateStore::open(&path).unwrap();
        store
            .set_window_size(WindowSize {
                width: 1024,
                height: 768,
            })
            .unwrap();
        // Clearing exit/session state must not touch the window size.
        store.record_clean_exit().unwrap();
        drop(store);

        let reopened = StateStore::open(&path).unwrap();
        assert_eq!(
            reopened.window_size(),
            Some(WindowSize {
                width: 1024,
                height: 768,
            })
        );
    }

    #[test]
    fn corrupt_file_starts_fresh() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, "{not json").unwrap();

        let store = StateStore::open(&path).unwrap();
        assert_eq!(store.exit_status(), ExitStatus::Ok);
    }

    #[test]
    fn exit_status_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&ExitStatus::Ok).unwrap(), "\"ok\"");
        assert_eq!(
            serde_json::to_string(&ExitStatus::Unknown).unwrap(),
            "\"unknown\""
        );
    }

    #[test]
    fn clones_share_state() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        let clone = store.clone();
        clone.set_exit_status(ExitStatus::Unknown).unwrap();
        assert_eq!(store.exit_status(), ExitStatus::Unknown);
    }
}
