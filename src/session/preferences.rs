//! Opaque key-value preference storage.

use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Where the session persists small cross-reload state.
pub trait PreferenceStore: Send {
    fn get(&self, key: &str) -> Option<Value>;
    fn set(&mut self, key: &str, value: Value);
    fn remove(&mut self, key: &str);
}

/// In-memory store. Clones share entries, which lets a test or a host keep
/// the same preferences across sessions.
#[derive(Debug, Clone, Default)]
pub struct MemoryPreferences {
    entries: Arc<Mutex<HashMap<String, Value>>>,
}

impl MemoryPreferences {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PreferenceStore for MemoryPreferences {
    fn get(&self, key: &str) -> Option<Value> {
        self.entries.lock().get(key).cloned()
    }

    fn set(&mut self, key: &str, value: Value) {
        self.entries.lock().insert(key.to_string(), value);
    }

    fn remove(&mut self, key: &str) {
        self.entries.lock().remove(key);
    }
}
