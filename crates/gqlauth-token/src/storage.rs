//! The storage collaborator: where token stores persist themselves.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde_json::Value;

/// Key-value persistence for token stores.
///
/// Browsers would back this with cookies or local storage; a CLI with a
/// file; a server-side session with its session map. Token stores only
/// need two operations, both synchronous: token mutations must never be
/// interleaved with I/O suspension.
///
/// Implementations share one instance between the access and refresh
/// stores, and possibly between several schemes, so methods take `&self`.
pub trait Storage: Send + Sync + 'static {
    /// Reads the value under `key`.
    fn get(&self, key: &str) -> Option<Value>;

    /// Writes `value` under `key`. `None` removes the key.
    fn set(&self, key: &str, value: Option<Value>);
}

/// In-process [`Storage`] backed by a `HashMap`.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, Value>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// All keys currently stored, sorted.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.lock().keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    // Storage writes are single inserts/removes, so a panic elsewhere
    // can't leave the map half-updated.
    fn lock(&self) -> MutexGuard<'_, HashMap<String, Value>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> Option<Value> {
        self.lock().get(key).cloned()
    }

    fn set(&self, key: &str, value: Option<Value>) {
        let mut entries = self.lock();
        match value {
            Some(value) => {
                entries.insert(key.to_string(), value);
            }
            None => {
                entries.remove(key);
            }
        }
    }
}
