//! A bounded least-recently-used cache for materialized field data.

use std::fmt;
use std::hash::Hash;
use std::num::NonZeroUsize;

use lru::LruCache;

#[cfg(test)]
mod tests;

/// Bounded LRU map, typically keyed on [`crate::field::FieldId`].
///
/// `get` promotes the entry to most-recently-used; `put` on an existing key replaces the value
/// and promotes it; inserting past capacity evicts the least-recently-used entry.  When two
/// writers race on the same key the last writer wins.
///
/// The cache itself is not synchronized: callers must serialize mutation.  Shared use inside
/// this crate wraps it in a [`parking_lot::Mutex`].
pub struct BoundedCache<K: Hash + Eq, V> {
    inner: LruCache<K, V>,
}

impl<K: Hash + Eq, V> fmt::Debug for BoundedCache<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundedCache")
            .field("len", &self.len())
            .field("capacity", &self.capacity())
            .finish()
    }
}

impl<K: Hash + Eq, V> BoundedCache<K, V> {
    /// Creates a cache that holds at most `capacity` entries.
    pub fn new(capacity: NonZeroUsize) -> Self {
        BoundedCache { inner: LruCache::new(capacity) }
    }

    /// Looks up `key`, promoting it to most-recently-used on a hit.
    pub fn get(&mut self, key: &K) -> Option<&V> {
        self.inner.get(key)
    }

    /// Inserts `value` under `key`, replacing and promoting any existing entry, and evicting
    /// the least-recently-used entry when the insert overflows capacity.  Returns the value
    /// previously stored under `key`, if any.
    pub fn put(&mut self, key: K, value: V) -> Option<V> {
        self.inner.put(key, value)
    }

    /// Removes every entry.
    pub fn clear(&mut self) {
        self.inner.clear();
    }

    /// Number of entries currently held.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Maximum number of entries the cache will hold.
    pub fn capacity(&self) -> usize {
        self.inner.cap().get()
    }

    /// Whether `key` is present, without promoting it.
    pub fn contains(&self, key: &K) -> bool {
        self.inner.contains(key)
    }
}
