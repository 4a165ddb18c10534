use std::{
    fs,
    path::{Path, PathBuf},
    sync::{
        RwLock,
        atomic::{AtomicBool, Ordering},
    },
};

use serde::{Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};
use tokio::sync::broadcast;
use tracing::{info, warn};

use crate::dao::storage::{StorageError, StorageResult};

/// Store key holding the participant roster.
pub const KEY_ROSTER: &str = "roster";
/// Store key holding the prize tier configuration.
pub const KEY_PRIZE_TIERS: &str = "prize_tiers";
/// Store key holding the committed winners list.
pub const KEY_WINNERS: &str = "winners";
/// Store key holding the stop mode setting.
pub const KEY_STOP_MODE: &str = "settings.stop_mode";
/// Store key holding the auto-stop delay in milliseconds.
pub const KEY_AUTO_STOP_MS: &str = "settings.auto_stop_ms";
/// Store key holding the keyboard shortcuts toggle.
pub const KEY_KEYBOARD_ENABLED: &str = "settings.keyboard_enabled";

/// Capacity of the change broadcast channel.
const CHANGE_CAPACITY: usize = 64;

/// A change notification for one store key. Carries the full new value so
/// subscribers never have to read back.
#[derive(Debug, Clone)]
pub struct StoreChange {
    /// Key that was written.
    pub key: String,
    /// The value as it now stands under that key.
    pub value: Value,
}

/// Typed key/value store backed by a single JSON document on disk.
///
/// Every write updates the in-memory document, persists the whole file, and
/// broadcasts a [`StoreChange`] to all subscribers, including the writer's
/// own process. Reads never fail: a missing or unreadable key yields the
/// caller's fallback. Persistence failures flip the degraded flag but keep
/// the in-memory document and the notification flowing.
pub struct StateStore {
    path: PathBuf,
    document: RwLock<Map<String, Value>>,
    changes: broadcast::Sender<StoreChange>,
    degraded: AtomicBool,
}

impl StateStore {
    /// Open the store at `path`, loading the existing document if one is
    /// there. A missing file starts empty; a malformed one is logged and
    /// replaced on the next write.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let document = match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<Map<String, Value>>(&contents) {
                Ok(document) => {
                    info!(path = %path.display(), keys = document.len(), "loaded state document");
                    document
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "state document is malformed; starting empty"
                    );
                    Map::new()
                }
            },
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %path.display(), "no state document yet; starting empty");
                Map::new()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read state document; starting empty"
                );
                Map::new()
            }
        };

        let (changes, _receiver) = broadcast::channel(CHANGE_CAPACITY);
        Self {
            path,
            document: RwLock::new(document),
            changes,
            degraded: AtomicBool::new(false),
        }
    }

    /// Read the value under `key`, falling back to `fallback` when the key
    /// is absent or does not deserialize to `T`.
    pub fn read<T: DeserializeOwned>(&self, key: &str, fallback: T) -> T {
        let guard = match self.document.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        match guard.get(key) {
            Some(value) => match serde_json::from_value(value.clone()) {
                Ok(parsed) => parsed,
                Err(err) => {
                    warn!(key, error = %err, "stored value does not parse; using fallback");
                    fallback
                }
            },
            None => fallback,
        }
    }

    /// Write `value` under `key`, persist the document, and notify every
    /// subscriber. The writing process receives its own change like any
    /// other subscriber.
    ///
    /// A persistence failure marks the store degraded but the in-memory
    /// update and the notification still go through, so a single instance
    /// keeps working off its memory copy.
    pub fn write<T: Serialize>(&self, key: &str, value: &T) -> StorageResult<()> {
        let json = serde_json::to_value(value).map_err(|err| {
            StorageError::unavailable(format!("cannot serialize value for key {key}"), err)
        })?;

        let snapshot = {
            let mut guard = match self.document.write() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            guard.insert(key.to_owned(), json.clone());
            guard.clone()
        };

        match self.persist(&snapshot) {
            Ok(()) => self.degraded.store(false, Ordering::Relaxed),
            Err(err) => {
                warn!(key, error = %err, "failed to persist state document; running degraded");
                self.degraded.store(true, Ordering::Relaxed);
            }
        }

        let _ = self.changes.send(StoreChange {
            key: key.to_owned(),
            value: json,
        });
        Ok(())
    }

    /// Register a subscriber that receives every subsequent [`StoreChange`].
    pub fn subscribe(&self) -> broadcast::Receiver<StoreChange> {
        self.changes.subscribe()
    }

    /// Whether the last persistence attempt failed.
    pub fn is_degraded(&self) -> bool {
        self.degraded.load(Ordering::Relaxed)
    }

    /// Path of the backing document.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, document: &Map<String, Value>) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(document)?;
        fs::write(&self.path, contents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_returns_fallback_for_missing_key() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::open(dir.path().join("event.json"));
        let value: Vec<String> = store.read(KEY_WINNERS, Vec::new());
        assert!(value.is_empty());
    }

    #[test]
    fn write_notifies_the_writer_too() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::open(dir.path().join("event.json"));
        let mut rx = store.subscribe();

        store.write(KEY_KEYBOARD_ENABLED, &true).unwrap();

        let change = rx.try_recv().unwrap();
        assert_eq!(change.key, KEY_KEYBOARD_ENABLED);
        assert_eq!(change.value, serde_json::json!(true));
    }

    #[test]
    fn writes_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("event.json");

        let store = StateStore::open(&path);
        store.write(KEY_AUTO_STOP_MS, &5_000u64).unwrap();
        drop(store);

        let reopened = StateStore::open(&path);
        assert_eq!(reopened.read(KEY_AUTO_STOP_MS, 0u64), 5_000);
    }

    #[test]
    fn malformed_document_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("event.json");
        fs::write(&path, "not json").unwrap();

        let store = StateStore::open(&path);
        assert_eq!(store.read(KEY_AUTO_STOP_MS, 42u64), 42);
        assert!(!store.is_degraded());
    }

    #[test]
    fn mismatched_value_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::open(dir.path().join("event.json"));
        store.write(KEY_AUTO_STOP_MS, &"not a number").unwrap();
        assert_eq!(store.read(KEY_AUTO_STOP_MS, 3_500u64), 3_500);
    }
}
