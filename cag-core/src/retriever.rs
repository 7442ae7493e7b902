//! Relevance retriever: rank loaded cache entries against a query
//!
//! Scoring mode is resolved once per call. When an embedding model is
//! configured every call scores by embedding cosine, whatever lexical search
//! type was asked for; otherwise the requested [`SearchType`] scorer runs over
//! the entry texts.

use crate::cache::CacheEntry;
use crate::error::{CagError, Result};
use crate::providers::EmbeddingModel;
use crate::similarity::{cosine_similarity, SearchType};
use tracing::debug;

/// How entries are scored for one retrieval
#[derive(Debug, Clone, PartialEq)]
pub enum ScoringMode {
    /// Cosine against each entry's stored embedding; entries without one are skipped
    Embedding(Vec<f32>),
    /// Lexical scorer over entry texts
    Lexical(SearchType),
}

/// Ranks cache entries and keeps the best `top_k` above a threshold
#[derive(Clone, Copy, Default)]
pub struct RelevanceRetriever<'a> {
    embedder: Option<&'a dyn EmbeddingModel>,
}

impl<'a> RelevanceRetriever<'a> {
    /// Retriever scoring lexically only
    pub fn lexical() -> Self {
        Self { embedder: None }
    }

    /// Retriever that scores by embedding whenever `embedder` is set
    pub fn new(embedder: Option<&'a dyn EmbeddingModel>) -> Self {
        Self { embedder }
    }

    /// True when retrieval will use embedding cosine
    pub fn uses_embeddings(&self) -> bool {
        self.embedder.is_some()
    }

    /// Decide the scoring mode for `query`, embedding it if needed
    pub fn scoring_mode(&self, query: &str, search_type: SearchType) -> Result<ScoringMode> {
        match self.embedder {
            Some(embedder) => {
                let query_embedding = embedder
                    .embed_query(query)
                    .map_err(|e| CagError::external("embed_query", e))?;
                Ok(ScoringMode::Embedding(query_embedding))
            }
            None => Ok(ScoringMode::Lexical(search_type)),
        }
    }

    /// Texts of the best `top_k` entries scoring at least `threshold`, best first
    pub fn retrieve(
        &self,
        query: &str,
        entries: &[CacheEntry],
        top_k: usize,
        threshold: f32,
        search_type: SearchType,
    ) -> Result<Vec<String>> {
        if entries.is_empty() || top_k == 0 {
            return Ok(Vec::new());
        }
        let mode = self.scoring_mode(query, search_type)?;
        Ok(rank(query, entries, top_k, threshold, &mode))
    }
}

/// Score, sort and filter `entries` under an already resolved `mode`
pub fn rank(
    query: &str,
    entries: &[CacheEntry],
    top_k: usize,
    threshold: f32,
    mode: &ScoringMode,
) -> Vec<String> {
    if entries.is_empty() || top_k == 0 {
        return Vec::new();
    }

    let scored: Vec<(usize, f32)> = match mode {
        ScoringMode::Embedding(query_embedding) => entries
            .iter()
            .enumerate()
            .filter_map(|(i, entry)| {
                let embedding = entry.embedding.as_deref()?;
                cosine_similarity(query_embedding, embedding).map(|score| (i, score))
            })
            .collect(),
        ScoringMode::Lexical(search_type) => {
            let texts: Vec<&str> = entries.iter().map(|e| e.text.as_str()).collect();
            search_type
                .scorer()
                .score(query, &texts)
                .into_iter()
                .enumerate()
                .collect()
        }
    };

    let selected = select(scored, top_k, threshold);
    debug!(
        "Retrieved {} of {} entries ({:?})",
        selected.len(),
        entries.len(),
        mode_name(mode)
    );

    selected
        .into_iter()
        .map(|i| entries[i].text.clone())
        .collect()
}

/// Stable descending sort, threshold filter, truncate; returns entry indices
fn select(mut scored: Vec<(usize, f32)>, top_k: usize, threshold: f32) -> Vec<usize> {
    scored.sort_by(|a, b| b.1.total_cmp(&a.1));
    scored
        .into_iter()
        .filter(|(_, score)| *score >= threshold)
        .take(top_k)
        .map(|(i, _)| i)
        .collect()
}

fn mode_name(mode: &ScoringMode) -> &'static str {
    match mode {
        ScoringMode::Embedding(_) => "embedding",
        ScoringMode::Lexical(search_type) => search_type.as_str(),
    }
}
