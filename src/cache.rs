use std::fmt;
use std::hash::Hash;
use std::num::NonZeroUsize;

use lru::LruCache;

// ---------------------------------------------------------------------------
// Memoization store keyed by deterministic inputs
// ---------------------------------------------------------------------------

/// Keyed store with an explicit invalidation policy.
///
/// Entries live until they are invalidated, the store is cleared, or the
/// capacity is exceeded (the oldest insertion is evicted first). Reads never
/// promote an entry. Inserting a key never touches any other key's entry
/// except through eviction.
pub struct MemoStore<K: Eq + Hash, V> {
    entries: LruCache<K, V>,
}

impl<K: Eq + Hash, V> MemoStore<K, V> {
    /// A store holding at most `capacity` entries (at least one).
    pub fn with_capacity(capacity: usize) -> Self {
        MemoStore {
            entries: LruCache::new(NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN)),
        }
    }

    /// A store that only forgets on explicit invalidation.
    pub fn unbounded() -> Self {
        MemoStore {
            entries: LruCache::unbounded(),
        }
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        self.entries.peek(key)
    }

    pub fn contains(&self, key: &K) -> bool {
        self.entries.contains(key)
    }

    /// Replacing an existing key keeps its place in the eviction order.
    pub fn insert(&mut self, key: K, value: V) {
        match self.entries.peek_mut(&key) {
            Some(slot) => *slot = value,
            None => {
                self.entries.put(key, value);
            }
        }
    }

    /// Return the cached value, computing and storing it on a miss.
    /// A failed computation stores nothing.
    pub fn get_or_try_insert_with<E>(
        &mut self,
        key: K,
        compute: impl FnOnce() -> Result<V, E>,
    ) -> Result<V, E>
    where
        V: Clone,
    {
        if let Some(value) = self.entries.peek(&key) {
            return Ok(value.clone());
        }
        let value = compute()?;
        self.entries.put(key, value.clone());
        Ok(value)
    }

    pub fn invalidate(&mut self, key: &K) -> Option<V> {
        self.entries.pop(key)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Eq + Hash, V> fmt::Debug for MemoStore<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoStore")
            .field("len", &self.entries.len())
            .field("cap", &self.entries.cap())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evicts_oldest_beyond_capacity() {
        let mut store = MemoStore::with_capacity(2);
        store.insert("a", 1);
        store.insert("b", 2);
        store.insert("c", 3);
        assert!(!store.contains(&"a"));
        assert_eq!(store.get(&"b"), Some(&2));
        assert_eq!(store.get(&"c"), Some(&3));
    }

    #[test]
    fn reads_do_not_change_eviction_order() {
        let mut store = MemoStore::with_capacity(2);
        store.insert("a", 1);
        store.insert("b", 2);
        assert_eq!(store.get(&"a"), Some(&1));
        store.insert("a", 10);
        store.insert("c", 3);
        assert!(!store.contains(&"a"));
        assert_eq!(store.get(&"b"), Some(&2));
    }

    #[test]
    fn new_key_leaves_other_keys_alone() {
        let mut store = MemoStore::unbounded();
        store.insert(1, "one");
        store.insert(2, "two");
        assert_eq!(store.get(&1), Some(&"one"));
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn computes_once_per_key() {
        let mut store = MemoStore::unbounded();
        let mut calls = 0;
        for _ in 0..3 {
            let v = store
                .get_or_try_insert_with("k", || {
                    calls += 1;
                    Ok::<_, ()>(42)
                })
                .unwrap();
            assert_eq!(v, 42);
        }
        assert_eq!(calls, 1);
    }

    #[test]
    fn failed_computation_is_not_cached() {
        let mut store: MemoStore<&str, i32> = MemoStore::unbounded();
        assert!(store.get_or_try_insert_with("k", || Err("boom")).is_err());
        assert!(store.is_empty());
    }

    #[test]
    fn invalidate_and_clear() {
        let mut store = MemoStore::with_capacity(4);
        store.insert("a", 1);
        store.insert("b", 2);
        assert_eq!(store.invalidate(&"a"), Some(1));
        assert_eq!(store.invalidate(&"a"), None);
        store.clear();
        assert!(store.is_empty());
    }
}
