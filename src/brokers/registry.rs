//! Registry: name-keyed container shared between the write paths
//! (create/delete) and the stats readers.
//!
//! The lock only guards membership. Readers copy `Arc`s out and release the
//! lock before touching any entity, so no guard or iterator ever escapes.

use std::collections::HashMap;
use std::sync::Arc;
use parking_lot::RwLock;

pub struct Registry<V: ?Sized> {
    entries: RwLock<HashMap<String, Arc<V>>>,
}

impl<V: ?Sized> Registry<V> {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Inserts or replaces. Returns the previous entry, if any.
    pub fn insert(&self, name: &str, value: Arc<V>) -> Option<Arc<V>> {
        self.entries.write().insert(name.to_string(), value)
    }

    pub fn lookup(&self, name: &str) -> Option<Arc<V>> {
        self.entries.read().get(name).cloned()
    }

    pub fn remove(&self, name: &str) -> Option<Arc<V>> {
        self.entries.write().remove(name)
    }

    /// Copies every entry out under a single read lock.
    pub fn snapshot(&self) -> Vec<Arc<V>> {
        self.entries.read().values().cloned().collect()
    }

    pub fn snapshot_keys(&self) -> Vec<String> {
        self.entries.read().keys().cloned().collect()
    }

    /// Applies `f` to every entry while the read lock is held.
    /// `f` must be cheap and must not touch this registry.
    pub fn map_snapshot<T, F>(&self, f: F) -> Vec<T>
    where
        F: Fn(&V) -> T,
    {
        self.entries.read().values().map(|v| f(&**v)).collect()
    }

    /// Empty filter selects everything, otherwise the named entry if present.
    pub fn select(&self, filter: &str) -> Vec<Arc<V>> {
        if filter.is_empty() {
            return self.snapshot();
        }
        self.lookup(filter).into_iter().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl<V> Registry<V> {
    /// Returns the existing entry or inserts the one built by `ctor`.
    /// The bool is true when a new entry was created.
    pub fn get_or_insert_with<F>(&self, name: &str, ctor: F) -> (Arc<V>, bool)
    where
        F: FnOnce() -> V,
    {
        // Fast path: most lookups hit an existing entry
        if let Some(existing) = self.entries.read().get(name) {
            return (existing.clone(), false);
        }

        let mut entries = self.entries.write();
        if let Some(existing) = entries.get(name) {
            return (existing.clone(), false);
        }
        let created = Arc::new(ctor());
        entries.insert(name.to_string(), created.clone());
        (created, true)
    }
}

impl<V: ?Sized> Default for Registry<V> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_or_insert_is_idempotent() {
        let registry: Registry<u32> = Registry::new();
        let (a, created_a) = registry.get_or_insert_with("a", || 1);
        let (b, created_b) = registry.get_or_insert_with("a", || 2);
        assert!(created_a);
        assert!(!created_b);
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(*b, 1);
    }

    #[test]
    fn test_select_filter() {
        let registry: Registry<u32> = Registry::new();
        registry.get_or_insert_with("a", || 1);
        registry.get_or_insert_with("b", || 2);

        assert_eq!(registry.select("").len(), 2);
        assert_eq!(registry.select("b").len(), 1);
        assert!(registry.select("missing").is_empty());
    }

    #[test]
    fn test_removed_entry_outlives_registry_membership() {
        let registry: Registry<String> = Registry::new();
        registry.get_or_insert_with("a", || "alive".to_string());
        let held = registry.snapshot();

        assert!(registry.remove("a").is_some());
        assert!(registry.is_empty());
        assert_eq!(held[0].as_str(), "alive");
    }
}
