//! Collaborator capabilities the retrieval core calls out to
//!
//! The core never talks to a model, an index or the network directly. It is
//! handed implementations of these traits and wraps every failure they report
//! into [`CagError::ExternalCall`](crate::error::CagError::ExternalCall).
//! All calls block; implementations decide their own timeouts.

use anyhow::Result;

/// Text generation, grading and hallucination checking
pub trait LanguageModel: Send + Sync {
    /// Free-form completion of `prompt`
    fn generate(&self, prompt: &str) -> Result<String>;

    /// Answer `question` using only `context`
    fn answer_question(&self, context: &[String], question: &str) -> Result<String>;

    /// Judge whether `answer` is unsupported by `context`
    ///
    /// The verdict is expected to be "yes" or "no" in any case; anything else
    /// counts as "no".
    fn check_hallucination(&self, context: &[String], answer: &str) -> Result<String>;

    /// Return the subset of `context` relevant to `question`, in order
    fn grade_docs(&self, context: &[String], question: &str) -> Result<Vec<String>>;
}

/// Text to vector embedding
pub trait EmbeddingModel: Send + Sync {
    fn embed_query(&self, text: &str) -> Result<Vec<f32>>;

    /// One vector per input text, in input order
    fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

/// Web search returning text snippets
pub trait WebSearch: Send + Sync {
    fn search(&self, query: &str) -> Result<Vec<String>>;
}

/// Opaque vector-store retrieval
pub trait VectorStore: Send + Sync {
    /// Top `top_k` documents for `query` with their scores, best first
    fn retrieve(&self, query: &str, top_k: usize) -> Result<(Vec<String>, Vec<f32>)>;
}
