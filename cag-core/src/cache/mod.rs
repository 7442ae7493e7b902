//! # Key-value document cache
//!
//! Two layers keep preloaded chunks available to the retriever:
//!
//! - **Persistent store** ([`KvCacheStore`]): one serialized blob per cache
//!   key under a directory. Saving replaces, loading a missing key is `None`.
//! - **Session cache** ([`SessionCache`]): an in-memory LRU of batches that a
//!   pipeline instance has already read, with explicit invalidation.
//!
//! ## Example
//!
//! ```rust
//! use cag_core::cache::{CacheEntry, KvCacheStore};
//!
//! # fn example() -> cag_core::Result<()> {
//! let dir = std::env::temp_dir().join("cag-doc-example");
//! let store = KvCacheStore::new(&dir)?;
//!
//! store.save("geo", &[CacheEntry::new("Paris is the capital of France.")])?;
//!
//! if let Some(entries) = store.load("geo")? {
//!     println!("loaded {} chunks", entries.len());
//! }
//! # Ok(())
//! # }
//! ```

pub mod entry;
pub mod invalidation;
pub mod session;
pub mod store;
pub mod types;

pub use entry::CacheEntry;
pub use invalidation::InvalidationReason;
pub use session::SessionCache;
pub use store::{KvCacheStore, MAX_ENCODED_KEY_LEN};
pub use types::{CacheKey, CacheStats};
