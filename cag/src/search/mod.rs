//! Search collaborators
//!
//! A Tantivy BM25 keyword index serving as the vector store for the
//! question-answering flows, and (with the `embeddings` feature) a local
//! embedding model.

#[cfg(feature = "embeddings")]
pub mod embedding;
pub mod keyword;

#[cfg(feature = "embeddings")]
pub use embedding::FastEmbedder;
pub use keyword::KeywordIndex;
