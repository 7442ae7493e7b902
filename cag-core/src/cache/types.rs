//! Core type definitions for the cache system

use serde::{Deserialize, Serialize};
use std::fmt;

/// Cache key type - opaque string naming one preloaded batch
pub type CacheKey = String;

/// Statistics for the in-memory session cache
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups served from memory
    pub hits: u64,

    /// Lookups that had to go to disk
    pub misses: u64,

    /// Batches read from disk into memory
    pub loads: u64,

    /// Keys evicted by the LRU policy
    pub evictions: u64,

    /// Keys dropped by explicit invalidation
    pub invalidations: u64,

    /// Keys currently held in memory
    pub entries: usize,
}

impl CacheStats {
    /// Calculate cache hit rate as a percentage
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            (self.hits as f64 / total as f64) * 100.0
        }
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CacheStats {{ hits: {}, misses: {}, hit_rate: {:.2}%, loads: {}, entries: {}, evictions: {}, invalidations: {} }}",
            self.hits,
            self.misses,
            self.hit_rate(),
            self.loads,
            self.entries,
            self.evictions,
            self.invalidations
        )
    }
}
