//! Fixed-capacity LRU cache

use std::hash::Hash;
use std::num::NonZeroUsize;
use std::time::Instant;

use tracing::trace;

use crate::error::{CacheError, Result};
use crate::metrics::CacheStats;

/// Cached value together with its last access time
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    pub value: V,
    pub last_accessed: Instant,
}

impl<V> CacheEntry<V> {
    fn new(value: V) -> Self {
        Self {
            value,
            last_accessed: Instant::now(),
        }
    }

    fn touch(&mut self) {
        self.last_accessed = Instant::now();
    }
}

/// Bounded key/value store evicting the least recently used entry when full
pub struct LruCache<K: Hash + Eq, V> {
    entries: lru::LruCache<K, CacheEntry<V>>,
    hits: u64,
    misses: u64,
    evictions: u64,
}

impl<K: Hash + Eq, V> LruCache<K, V> {
    /// Create a cache holding at most `capacity` entries
    pub fn new(capacity: usize) -> Result<Self> {
        let capacity = NonZeroUsize::new(capacity).ok_or(CacheError::InvalidCapacity { capacity })?;
        Ok(Self {
            entries: lru::LruCache::new(capacity),
            hits: 0,
            misses: 0,
            evictions: 0,
        })
    }

    /// Look up a value, marking it as most recently used
    pub fn get(&mut self, key: &K) -> Option<&V> {
        match self.entries.get_mut(key) {
            Some(entry) => {
                self.hits += 1;
                entry.touch();
                Some(&entry.value)
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    /// Insert or replace a value.
    ///
    /// Returns the entry evicted to make room, if any. Replacing an existing
    /// key never evicts.
    pub fn set(&mut self, key: K, value: V) -> Option<(K, V)> {
        if let Some(entry) = self.entries.get_mut(&key) {
            entry.value = value;
            entry.touch();
            return None;
        }

        let evicted = self.entries.push(key, CacheEntry::new(value));
        evicted.map(|(key, entry)| {
            self.evictions += 1;
            trace!(evictions = self.evictions, "Evicted least recently used cache entry");
            (key, entry.value)
        })
    }

    /// Check presence without affecting recency or counters
    pub fn has(&self, key: &K) -> bool {
        self.entries.contains(key)
    }

    /// Read a value without affecting recency or counters
    pub fn peek(&self, key: &K) -> Option<&V> {
        self.entries.peek(key).map(|entry| &entry.value)
    }

    /// Last access time of an entry
    pub fn last_accessed(&self, key: &K) -> Option<Instant> {
        self.entries.peek(key).map(|entry| entry.last_accessed)
    }

    /// Remove an entry
    pub fn delete(&mut self, key: &K) -> Option<V> {
        self.entries.pop(key).map(|entry| entry.value)
    }

    /// Remove every entry; counters are kept
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Zero the hit/miss/eviction counters
    pub fn reset_stats(&mut self) {
        self.hits = 0;
        self.misses = 0;
        self.evictions = 0;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.entries.cap().get()
    }

    /// Keys from most to least recently used
    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.entries.iter().map(|(key, _)| key)
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            size: self.entries.len(),
            capacity: self.capacity(),
            hits: self.hits,
            misses: self.misses,
            evictions: self.evictions,
        }
    }
}

impl<K: Hash + Eq, V> std::fmt::Debug for LruCache<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LruCache")
            .field("stats", &self.stats())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_zero_capacity_is_rejected() {
        let result = LruCache::<u32, u32>::new(0);
        assert_eq!(result.unwrap_err(), CacheError::InvalidCapacity { capacity: 0 });
    }

    #[test]
    fn test_get_refreshes_recency_before_eviction() {
        let mut cache = LruCache::new(2).unwrap();
        cache.set("a", 1);
        cache.set("b", 2);
        assert_eq!(cache.get(&"b"), Some(&2));

        let evicted = cache.set("c", 3);

        assert_eq!(evicted, Some(("a", 1)));
        assert!(!cache.has(&"a"));
        assert!(cache.has(&"b"));
        assert!(cache.has(&"c"));
    }

    #[test]
    fn test_get_of_older_entry_protects_it() {
        let mut cache = LruCache::new(2).unwrap();
        cache.set("a", 1);
        cache.set("b", 2);
        cache.get(&"a");

        assert_eq!(cache.set("c", 3), Some(("b", 2)));
        assert_eq!(cache.keys().copied().collect::<Vec<_>>(), vec!["c", "a"]);
    }

    #[test]
    fn test_replacing_existing_key_never_evicts() {
        let mut cache = LruCache::new(2).unwrap();
        cache.set("a", 1);
        cache.set("b", 2);

        assert_eq!(cache.set("a", 10), None);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.peek(&"a"), Some(&10));
        assert_eq!(cache.stats().evictions, 0);
    }

    #[test]
    fn test_hit_and_miss_accounting() {
        let mut cache = LruCache::new(4).unwrap();
        cache.set(1, "one");

        assert!(cache.get(&1).is_some());
        assert!(cache.get(&2).is_none());
        assert!(cache.get(&3).is_none());
        assert!(cache.has(&1));

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 2);
        assert_eq!(stats.size, 1);
        assert_eq!(stats.capacity, 4);
        assert!((stats.hit_rate() - 1.0 / 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_has_does_not_refresh_recency() {
        let mut cache = LruCache::new(2).unwrap();
        cache.set("a", 1);
        cache.set("b", 2);
        assert!(cache.has(&"a"));

        assert_eq!(cache.set("c", 3), Some(("a", 1)));
    }

    #[test]
    fn test_delete_and_clear() {
        let mut cache = LruCache::new(3).unwrap();
        cache.set("a", 1);
        cache.set("b", 2);

        assert_eq!(cache.delete(&"a"), Some(1));
        assert_eq!(cache.delete(&"a"), None);
        cache.get(&"b");

        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.stats().hits, 1);

        cache.reset_stats();
        assert_eq!(cache.stats(), CacheStats { size: 0, capacity: 3, ..CacheStats::default() });
    }

    #[test]
    fn test_get_updates_last_accessed() {
        let mut cache = LruCache::new(1).unwrap();
        cache.set("a", 1);
        let inserted = cache.last_accessed(&"a").unwrap();
        std::thread::sleep(std::time::Duration::from_millis(2));
        cache.get(&"a");
        assert!(cache.last_accessed(&"a").unwrap() > inserted);
    }

    proptest! {
        #[test]
        fn prop_size_never_exceeds_capacity(
            capacity in 1usize..16,
            keys in prop::collection::vec(0u8..32, 0..200),
        ) {
            let mut cache = LruCache::new(capacity).unwrap();
            for key in keys {
                cache.set(key, ());
                prop_assert!(cache.len() <= capacity);
            }
        }
    }
}
