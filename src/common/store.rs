use std::{hash::Hash, sync::{PoisonError, RwLock}};

use ahash::AHashMap;

/// A keyed in-memory store with an explicit invalidate/clear contract.
///
/// Values are cloned out; store cheap handles (e.g. `Arc`) for large values.
#[derive(Debug)]
pub struct KeyedStore<K, V> {
    entries: RwLock<AHashMap<K, V>>,
}

impl<K, V> Default for KeyedStore<K, V> {
    fn default() -> Self { Self { entries: RwLock::new(AHashMap::new()) } }
}

impl<K: Eq + Hash + Clone, V: Clone> KeyedStore<K, V> {
    pub fn new() -> Self { Self::default() }

    pub fn get(&self, key: &K) -> Option<V> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).get(key).cloned()
    }

    pub fn insert(&self, key: K, value: V) {
        self.entries.write().unwrap_or_else(PoisonError::into_inner).insert(key, value);
    }

    /// Return the stored value, computing and storing it on a miss.
    /// Failed computations store nothing.
    pub fn get_or_try_insert_with<E>(&self, key: K, f: impl FnOnce() -> Result<V, E>) -> Result<V, E> {
        if let Some(value) = self.get(&key) {
            return Ok(value);
        }
        let value = f()?;
        self.insert(key, value.clone());
        Ok(value)
    }

    /// Drop one entry. Returns whether it was present.
    pub fn invalidate(&self, key: &K) -> bool {
        self.entries.write().unwrap_or_else(PoisonError::into_inner).remove(key).is_some()
    }

    /// Drop every entry, returning how many were removed.
    pub fn clear(&self) -> usize {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let n = entries.len();
        entries.clear();
        n
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool { self.len() == 0 }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn computes_once_until_invalidated() {
        let store: KeyedStore<&str, u32> = KeyedStore::new();
        let mut calls = 0;

        for _ in 0..3 {
            let v: Result<u32, ()> = store.get_or_try_insert_with("a", || { calls += 1; Ok(7) });
            assert_eq!(v, Ok(7));
        }
        assert_eq!(calls, 1);

        assert!(store.invalidate(&"a"));
        assert!(!store.invalidate(&"a"));
        let _: Result<u32, ()> = store.get_or_try_insert_with("a", || { calls += 1; Ok(8) });
        assert_eq!(calls, 2);
        assert_eq!(store.get(&"a"), Some(8));
    }

    #[test]
    fn failures_are_not_stored() {
        let store: KeyedStore<u8, u8> = KeyedStore::new();
        assert_eq!(store.get_or_try_insert_with(1, || Err::<u8, _>("boom")), Err("boom"));
        assert!(store.is_empty());
    }

    #[test]
    fn clear_reports_count() {
        let store = KeyedStore::new();
        store.insert(1, "x");
        store.insert(2, "y");
        assert_eq!(store.clear(), 2);
        assert_eq!(store.len(), 0);
    }
}
