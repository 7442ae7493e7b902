//! Reasons a loaded batch leaves the session cache

use serde::{Deserialize, Serialize};

/// Reason for session cache invalidation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InvalidationReason {
    /// Caller asked for it
    Manual,

    /// The key was preloaded again, so the loaded copy is stale
    Overwritten,

    /// Caller forced a fresh read from disk
    Reload,

    /// The persistent store was wiped
    Reset,

    /// Evicted by the LRU policy to make room
    LeastRecentlyUsed,
}

impl std::fmt::Display for InvalidationReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InvalidationReason::Manual => write!(f, "manual invalidation"),
            InvalidationReason::Overwritten => write!(f, "cache key overwritten"),
            InvalidationReason::Reload => write!(f, "reload requested"),
            InvalidationReason::Reset => write!(f, "cache store reset"),
            InvalidationReason::LeastRecentlyUsed => write!(f, "LRU eviction"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reason_display() {
        assert_eq!(InvalidationReason::Manual.to_string(), "manual invalidation");
        assert_eq!(InvalidationReason::LeastRecentlyUsed.to_string(), "LRU eviction");
    }
}
