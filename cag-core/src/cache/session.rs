//! In-memory LRU of loaded cache batches, keyed by cache key
//!
//! A pipeline instance owns exactly one [`SessionCache`]. It is a
//! single-writer structure: every method that can change it takes
//! `&mut self`, so two logical calls can never touch it at once.

use crate::cache::{
    entry::CacheEntry,
    invalidation::InvalidationReason,
    types::{CacheKey, CacheStats},
};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tracing::{debug, info};

/// Loaded batches with LRU eviction
#[derive(Debug)]
pub struct SessionCache {
    capacity: usize,

    /// Main storage: key -> loaded batch
    entries: HashMap<CacheKey, Arc<[CacheEntry]>>,

    /// LRU tracking: front is least recently used
    lru_queue: VecDeque<CacheKey>,

    stats: CacheStats,
}

impl SessionCache {
    /// Create a session cache holding at most `capacity` keys (minimum one)
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: HashMap::new(),
            lru_queue: VecDeque::new(),
            stats: CacheStats::default(),
        }
    }

    /// Look up a loaded batch, marking it most recently used
    pub fn get(&mut self, key: &str) -> Option<Arc<[CacheEntry]>> {
        match self.entries.get(key) {
            Some(entries) => {
                let entries = Arc::clone(entries);
                self.touch(key);
                self.stats.hits += 1;
                debug!("Session cache hit: {}", key);
                Some(entries)
            }
            None => {
                self.stats.misses += 1;
                debug!("Session cache miss: {}", key);
                None
            }
        }
    }

    /// Store a freshly loaded batch, evicting the least recently used key if full
    pub fn insert(&mut self, key: impl Into<CacheKey>, entries: Vec<CacheEntry>) -> Arc<[CacheEntry]> {
        let key = key.into();
        let entries: Arc<[CacheEntry]> = entries.into();

        if self.entries.contains_key(&key) {
            self.touch(&key);
        } else {
            while self.entries.len() >= self.capacity {
                let Some(oldest) = self.lru_queue.pop_front() else {
                    break;
                };
                self.entries.remove(&oldest);
                self.stats.evictions += 1;
                debug!(
                    "Evicting session cache entry ({}): {}",
                    InvalidationReason::LeastRecentlyUsed,
                    oldest
                );
            }
            self.lru_queue.push_back(key.clone());
        }

        debug!(
            "Session cache holds {}: {} entries, ~{} bytes",
            key,
            entries.len(),
            entries.iter().map(CacheEntry::size_bytes).sum::<usize>()
        );
        self.entries.insert(key, Arc::clone(&entries));
        self.stats.loads += 1;
        entries
    }

    /// Drop one key; returns whether it was loaded
    pub fn invalidate(&mut self, key: &str, reason: InvalidationReason) -> bool {
        if self.entries.remove(key).is_some() {
            self.lru_queue.retain(|k| k != key);
            self.stats.invalidations += 1;
            debug!("Session cache entry invalidated ({}): {}", reason, key);
            true
        } else {
            false
        }
    }

    /// Drop every key; returns how many were loaded
    pub fn clear(&mut self, reason: InvalidationReason) -> usize {
        let count = self.entries.len();
        self.entries.clear();
        self.lru_queue.clear();
        self.stats.invalidations += count as u64;
        if count > 0 {
            info!("Cleared {} session cache entries ({})", count, reason);
        }
        count
    }

    /// Check if a key is loaded (without updating recency)
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Loaded keys from least to most recently used
    pub fn keys(&self) -> Vec<CacheKey> {
        self.lru_queue.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Current statistics
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.entries.len(),
            ..self.stats.clone()
        }
    }

    fn touch(&mut self, key: &str) {
        if let Some(pos) = self.lru_queue.iter().position(|k| k == key) {
            if let Some(k) = self.lru_queue.remove(pos) {
                self.lru_queue.push_back(k);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn batch(text: &str) -> Vec<CacheEntry> {
        vec![CacheEntry::new(text)]
    }

    #[test]
    fn test_basic_insert_and_get() {
        let mut cache = SessionCache::new(2);
        cache.insert("geo", batch("Paris"));

        let loaded = cache.get("geo").unwrap();
        assert_eq!(loaded[0].text, "Paris");

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 0);
        assert_eq!(stats.loads, 1);
        assert_eq!(stats.entries, 1);
    }

    #[test]
    fn test_cache_miss() {
        let mut cache = SessionCache::new(2);
        assert!(cache.get("nonexistent").is_none());
        assert_eq!(cache.stats().misses, 1);
    }

    #[test]
    fn test_lru_eviction() {
        let mut cache = SessionCache::new(2);
        cache.insert("a", batch("1"));
        cache.insert("b", batch("2"));

        // Touch "a" so "b" becomes least recently used
        assert!(cache.get("a").is_some());
        cache.insert("c", batch("3"));

        assert!(cache.contains("a"));
        assert!(!cache.contains("b"));
        assert!(cache.contains("c"));
        assert_eq!(cache.keys(), vec!["a".to_string(), "c".to_string()]);
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn test_reinsert_replaces_without_eviction() {
        let mut cache = SessionCache::new(1);
        cache.insert("a", batch("old"));
        cache.insert("a", batch("new"));

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("a").unwrap()[0].text, "new");
        assert_eq!(cache.stats().evictions, 0);
    }

    #[test]
    fn test_zero_capacity_holds_one() {
        let mut cache = SessionCache::new(0);
        assert_eq!(cache.capacity(), 1);
        cache.insert("a", batch("1"));
        cache.insert("b", batch("2"));
        assert_eq!(cache.keys(), vec!["b".to_string()]);
    }

    #[test]
    fn test_invalidate_and_clear() {
        let mut cache = SessionCache::new(4);
        cache.insert("a", batch("1"));
        cache.insert("b", batch("2"));

        assert!(cache.invalidate("a", InvalidationReason::Manual));
        assert!(!cache.invalidate("a", InvalidationReason::Manual));
        assert!(!cache.contains("a"));

        assert_eq!(cache.clear(InvalidationReason::Reset), 1);
        assert!(cache.is_empty());
        assert_eq!(cache.stats().invalidations, 2);
    }
}
