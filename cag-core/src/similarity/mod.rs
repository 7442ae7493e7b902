//! Similarity scoring for cached chunks
//!
//! Lexical scorers (TF-IDF, BM25, Jaccard) share the [`SimilarityScorer`]
//! trait and are selected through the closed [`SearchType`] enum. Embedding
//! cosine similarity lives in [`cosine`]; it scores vectors rather than text
//! and is chosen by the retriever whenever an embedding model is configured.

pub mod bm25;
pub mod cosine;
pub mod jaccard;
pub mod tfidf;

use crate::error::CagError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub use bm25::Bm25Scorer;
pub use cosine::cosine_similarity;
pub use jaccard::JaccardScorer;
pub use tfidf::TfIdfScorer;

/// A lexical relevance scorer
///
/// Implementations return one score per document, in document order; higher
/// means more relevant. Scores are deterministic for a fixed input.
pub trait SimilarityScorer {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// Score every document against the query
    fn score(&self, query: &str, documents: &[&str]) -> Vec<f32>;
}

static TFIDF: TfIdfScorer = TfIdfScorer;
static BM25: Bm25Scorer = Bm25Scorer::OKAPI;
static JACCARD: JaccardScorer = JaccardScorer;

/// Lexical similarity search type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchType {
    /// TF-IDF vectors compared with cosine similarity
    #[default]
    TfIdf,
    /// Okapi BM25
    Bm25,
    /// Token-set Jaccard index
    Jaccard,
}

impl SearchType {
    /// Every supported search type
    pub const ALL: [SearchType; 3] = [SearchType::TfIdf, SearchType::Bm25, SearchType::Jaccard];

    pub fn as_str(&self) -> &'static str {
        match self {
            SearchType::TfIdf => "tfidf",
            SearchType::Bm25 => "bm25",
            SearchType::Jaccard => "jaccard",
        }
    }

    /// The scorer implementing this search type
    pub fn scorer(&self) -> &'static dyn SimilarityScorer {
        match self {
            SearchType::TfIdf => &TFIDF,
            SearchType::Bm25 => &BM25,
            SearchType::Jaccard => &JACCARD,
        }
    }
}

impl fmt::Display for SearchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SearchType {
    type Err = CagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tfidf" => Ok(SearchType::TfIdf),
            "bm25" => Ok(SearchType::Bm25),
            "jaccard" => Ok(SearchType::Jaccard),
            other => Err(CagError::InvalidConfiguration(format!(
                "unsupported similarity search type '{}': choose from 'tfidf', 'bm25', or 'jaccard'",
                other
            ))),
        }
    }
}

/// Whitespace tokenization shared by BM25 and Jaccard
pub(crate) fn whitespace_tokens(text: &str) -> impl Iterator<Item = &str> {
    text.split_whitespace()
}

/// Lowercased word tokens of two or more word characters
///
/// Word characters are alphanumerics and underscore; everything else splits.
pub(crate) fn word_tokens(text: &str) -> Vec<String> {
    text.split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|token| token.chars().count() >= 2)
        .map(|token| token.to_lowercase())
        .collect()
}
