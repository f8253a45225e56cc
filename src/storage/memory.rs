//! In-memory key-value store for tests and the simulator.

use dashmap::DashMap;

use super::KeyValueStore;

/// Thread-safe in-memory store. State dies with the process, which makes it
/// a stand-in for browser storage in tests and headless hosts only.
#[derive(Debug, Default)]
pub struct MemoryKeyValueStore {
    entries: DashMap<String, String>,
}

impl MemoryKeyValueStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the store holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl KeyValueStore for MemoryKeyValueStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).map(|entry| entry.value().clone())
    }

    fn put(&self, key: &str, value: &str) {
        self.entries.insert(key.to_owned(), value.to_owned());
    }

    fn remove(&self, key: &str) {
        self.entries.remove(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overwrite_replaces_value() {
        let store = MemoryKeyValueStore::new();
        store.put("k", "first");
        store.put("k", "second");
        assert_eq!(store.get("k"), Some("second".to_owned()));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_remove_missing_key_is_noop() {
        let store = MemoryKeyValueStore::new();
        store.remove("missing");
        assert!(store.is_empty());
    }
}
