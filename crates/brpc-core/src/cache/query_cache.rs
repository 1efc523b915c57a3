//! Scrape-cycle memoizer keyed by request fingerprint.

use std::collections::HashMap;

/// Key/value store that lives for one scrape cycle.
///
/// There is no expiry: entries stay until [`QueryCache::remove`] or
/// [`QueryCache::clear`]. The type is not synchronized; the owning
/// transport wraps it in a lock and is the only writer.
#[derive(Debug, Clone)]
pub struct QueryCache<V> {
    entries: HashMap<String, V>,
}

impl<V> Default for QueryCache<V> {
    fn default() -> Self {
        Self { entries: HashMap::new() }
    }
}

impl<V: Clone> QueryCache<V> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_cached(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Stores `value` under `key`, replacing any earlier entry.
    pub fn store(&mut self, key: impl Into<String>, value: V) {
        self.entries.insert(key.into(), value);
    }

    #[must_use]
    pub fn retrieve(&self, key: &str) -> Option<V> {
        self.entries.get(key).cloned()
    }

    pub fn remove(&mut self, key: &str) -> Option<V> {
        self.entries.remove(key)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
