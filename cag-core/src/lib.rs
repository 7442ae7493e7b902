//! # CAG core (cag-core)
//!
//! Cache-augmented generation: preload document chunks into a local
//! key-value cache once, then answer queries by ranking the cached chunks and
//! handing the best ones to a language model.
//!
//! ## Features
//!
//! - Persistent per-key blob store plus an in-memory LRU session cache
//! - Lexical scoring (TF-IDF, BM25, Jaccard) or embedding cosine similarity
//! - Multi-query retrieval
//! - Smart retrieval with LLM grading, web-search fallback and a single
//!   hallucination-triggered regeneration
//! - Vector-store question answering (`rag`)
//!
//! The language model, embedding model, web search and vector store are
//! collaborators supplied by the caller through the traits in [`providers`].
//!
//! ## Usage
//!
//! ```no_run
//! use cag_core::{CagPipeline, InferOptions, LanguageModel, PipelineConfig};
//! use std::sync::Arc;
//!
//! fn run(llm: Arc<dyn LanguageModel>) -> cag_core::Result<()> {
//!     let mut pipeline = CagPipeline::builder()
//!         .llm(llm)
//!         .config(PipelineConfig::from_env()?)
//!         .build()?;
//!
//!     let chunks = vec![
//!         "Paris is the capital of France.".to_string(),
//!         "Berlin is the capital of Germany.".to_string(),
//!     ];
//!     pipeline.preload_documents(&chunks, "geo")?;
//!
//!     let options = InferOptions::new().top_k(1).threshold(0.0);
//!     let answer = pipeline.infer("What is the capital of France?", "geo", &options)?;
//!     println!("{}", answer);
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod fallback;
pub mod multi_query;
pub mod orchestrator;
pub mod pipeline;
pub mod providers;
pub mod rag;
pub mod retriever;
pub mod similarity;
pub mod validator;

// Re-export main types for convenience
pub use cache::{CacheEntry, CacheKey, CacheStats, InvalidationReason, KvCacheStore, SessionCache};
pub use config::{PipelineConfig, PipelineConfigBuilder};
pub use error::{CagError, Result};
pub use orchestrator::{ContextSource, SmartRetrieval, SmartRetriever};
pub use pipeline::{CagPipeline, CagPipelineBuilder, InferOptions, RetrievalMode};
pub use providers::{EmbeddingModel, LanguageModel, VectorStore, WebSearch};
pub use rag::{AgenticRag, QaRecord, QuestionAnswer};
pub use retriever::{RelevanceRetriever, ScoringMode};
pub use similarity::{SearchType, SimilarityScorer};
pub use validator::{AnswerValidator, Outcome};
