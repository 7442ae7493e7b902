//! Error types for the CAG retrieval core
//!
//! Every fallible operation in the crate returns [`CagError`]. Collaborators
//! (language model, embedder, web search, vector store) report failures as
//! `anyhow::Error`; the core wraps those into [`CagError::ExternalCall`] so
//! callers can tell a collaborator failure apart from a local one.

use thiserror::Error;

/// Main error type for cache-augmented generation
#[derive(Error, Debug)]
pub enum CagError {
    /// No persisted cache exists for the requested key
    #[error("KV cache missing for key '{key}': preload the documents first")]
    CacheMiss { key: String },

    /// Embedding or persistence failed while preloading a batch
    #[error("failed to preload cache '{key}': {source}")]
    Preload {
        key: String,
        #[source]
        source: Box<CagError>,
    },

    /// Invalid configuration value (unknown search type, bad limits, ...)
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// A collaborator call (LLM, embedding model, web search) failed
    #[error("{capability} call failed: {source}")]
    ExternalCall {
        capability: &'static str,
        #[source]
        source: anyhow::Error,
    },

    /// Filesystem error from the cache store
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/Deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result type alias for CAG operations
pub type Result<T> = std::result::Result<T, CagError>;

impl CagError {
    /// Wrap a collaborator failure
    pub fn external(capability: &'static str, source: anyhow::Error) -> Self {
        CagError::ExternalCall { capability, source }
    }

    /// Wrap a failure that happened while preloading `key`
    pub fn preload(key: impl Into<String>, source: CagError) -> Self {
        CagError::Preload {
            key: key.into(),
            source: Box::new(source),
        }
    }

    /// True when the error came from an external collaborator
    pub fn is_external(&self) -> bool {
        matches!(self, CagError::ExternalCall { .. })
    }
}

impl From<serde_json::Error> for CagError {
    fn from(err: serde_json::Error) -> Self {
        CagError::Serialization(err.to_string())
    }
}
