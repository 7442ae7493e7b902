//! Local embedding model for embedding-scored retrieval

use anyhow::{Context, Result};
use fastembed::{EmbeddingModel as FastEmbedModel, InitOptions, TextEmbedding};
use tracing::info;

/// [`cag_core::EmbeddingModel`] over a fastembed model
pub struct FastEmbedder {
    model: TextEmbedding,
    dimension: usize,
}

impl FastEmbedder {
    /// Create an embedder with the multilingual E5 small model
    pub fn new() -> Result<Self> {
        Self::with_model(FastEmbedModel::MultilingualE5Small)
    }

    /// Create with a specific model
    pub fn with_model(model_name: FastEmbedModel) -> Result<Self> {
        info!("Initializing embedding model: {:?}", model_name);

        let dimension = match model_name {
            FastEmbedModel::MultilingualE5Small => 384,
            FastEmbedModel::MultilingualE5Base => 768,
            FastEmbedModel::MultilingualE5Large => 1024,
            FastEmbedModel::BGEBaseENV15 => 768,
            _ => 384,
        };

        let mut options = InitOptions::default();
        options.model_name = model_name;
        options.show_download_progress = true;

        let model = TextEmbedding::try_new(options)
            .context("Failed to initialize embedding model")?;

        Ok(Self { model, dimension })
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }
}

impl cag_core::EmbeddingModel for FastEmbedder {
    fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        // E5 models expect a "query: " prefix for queries
        let embeddings = self
            .model
            .embed(vec![format!("query: {}", text)], None)
            .context("Failed to generate embedding")?;

        embeddings
            .into_iter()
            .next()
            .ok_or_else(|| anyhow::anyhow!("No embedding generated"))
    }

    fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        // ... and "passage: " for documents
        let prefixed: Vec<String> = texts.iter().map(|t| format!("passage: {}", t)).collect();
        self.model
            .embed(prefixed, None)
            .context("Failed to generate embeddings")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cag_core::EmbeddingModel;

    #[test]
    #[ignore] // Requires model download
    fn test_query_and_document_embedding() {
        let embedder = FastEmbedder::new().unwrap();

        let query = embedder.embed_query("capital of France").unwrap();
        let documents = embedder
            .embed_documents(&["Paris is the capital of France.".to_string()])
            .unwrap();

        assert_eq!(query.len(), embedder.dimension());
        assert_eq!(documents.len(), 1);
        assert_eq!(documents[0].len(), 384);
    }
}
