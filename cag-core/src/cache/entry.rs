//! Cache entry model: a chunk of text plus its optional embedding

use serde::{Deserialize, Serialize};

/// One preloaded chunk
///
/// The embedding is present only when the pipeline that preloaded the chunk
/// had an embedding model configured.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// The chunk text
    pub text: String,

    /// Precomputed embedding of `text`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
}

impl CacheEntry {
    /// Create a text-only entry
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            embedding: None,
        }
    }

    /// Create an entry with a precomputed embedding
    pub fn with_embedding(text: impl Into<String>, embedding: Vec<f32>) -> Self {
        Self {
            text: text.into(),
            embedding: Some(embedding),
        }
    }

    /// True when an embedding is attached
    pub fn has_embedding(&self) -> bool {
        self.embedding.is_some()
    }

    /// Approximate in-memory size in bytes
    pub fn size_bytes(&self) -> usize {
        self.text.len()
            + self
                .embedding
                .as_ref()
                .map(|e| e.len() * std::mem::size_of::<f32>())
                .unwrap_or(0)
    }
}
