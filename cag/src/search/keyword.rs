//! Keyword index using Tantivy (BM25), exposed as a [`VectorStore`]

use std::path::Path;
use std::sync::Mutex;

use anyhow::{anyhow, Context, Result};
use cag_core::VectorStore;
use chrono::Utc;
use sha2::{Digest, Sha256};
use tantivy::collector::TopDocs;
use tantivy::query::QueryParser;
use tantivy::schema::{Field, Schema, Value, INDEXED, STORED, STRING, TEXT};
use tantivy::{doc, Index, IndexReader, IndexWriter, ReloadPolicy, TantivyDocument, Term};
use tracing::{debug, info, warn};

/// BM25 keyword index over document chunks
pub struct KeywordIndex {
    index: Index,
    reader: IndexReader,
    writer: Option<Mutex<IndexWriter>>,
    // Field handles
    id_field: Field,
    content_field: Field,
    indexed_at_field: Field,
}

impl KeywordIndex {
    /// Open or create an index (read-write mode)
    pub fn open(index_path: impl AsRef<Path>) -> Result<Self> {
        Self::open_internal(index_path, true)
    }

    /// Open an index without taking the write lock
    pub fn open_reader_only(index_path: impl AsRef<Path>) -> Result<Self> {
        Self::open_internal(index_path, false)
    }

    fn open_internal(index_path: impl AsRef<Path>, with_writer: bool) -> Result<Self> {
        let index_path = index_path.as_ref();
        info!(
            "Opening Tantivy index at {:?} (write_mode: {})",
            index_path, with_writer
        );

        let mut schema_builder = Schema::builder();
        let id_field = schema_builder.add_text_field("id", STRING | STORED);
        let content_field = schema_builder.add_text_field("content", TEXT | STORED);
        let indexed_at_field = schema_builder.add_date_field("indexed_at", INDEXED | STORED);
        let schema = schema_builder.build();

        std::fs::create_dir_all(index_path)?;
        let index = Index::open_or_create(
            tantivy::directory::MmapDirectory::open(index_path)?,
            schema,
        )?;

        // 50MB writer heap
        let writer = if with_writer {
            Some(Mutex::new(index.writer(50_000_000)?))
        } else {
            None
        };

        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::OnCommitWithDelay)
            .try_into()?;

        Ok(Self {
            index,
            reader,
            writer,
            id_field,
            content_field,
            indexed_at_field,
        })
    }

    /// Stage chunks for indexing; identical chunks replace each other
    ///
    /// Returns the number of chunks staged. Call [`commit`](Self::commit) to
    /// make them searchable.
    pub fn add_documents(&self, chunks: &[String]) -> Result<usize> {
        let writer = self
            .writer
            .as_ref()
            .ok_or_else(|| anyhow!("Cannot index: opened in read-only mode"))?;
        let writer = writer.lock().map_err(|_| anyhow!("index writer lock poisoned"))?;

        let now = tantivy::DateTime::from_timestamp_secs(Utc::now().timestamp());
        let mut staged = 0;
        for chunk in chunks.iter().filter(|c| !c.trim().is_empty()) {
            let id = chunk_id(chunk);
            writer.delete_term(Term::from_field_text(self.id_field, &id));
            writer.add_document(doc!(
                self.id_field => id.as_str(),
                self.content_field => chunk.as_str(),
                self.indexed_at_field => now
            ))?;
            debug!("Indexed chunk: {}", id);
            staged += 1;
        }
        Ok(staged)
    }

    /// Commit pending changes and refresh the reader
    pub fn commit(&self) -> Result<()> {
        if let Some(writer) = &self.writer {
            writer
                .lock()
                .map_err(|_| anyhow!("index writer lock poisoned"))?
                .commit()?;
            self.reader.reload()?;
        }
        Ok(())
    }

    /// Get document count
    pub fn count(&self) -> Result<usize> {
        Ok(self.reader.searcher().num_docs() as usize)
    }

    /// Top `limit` chunks for `query` with scores squashed into (0, 1)
    pub fn search(&self, query: &str, limit: usize) -> Result<Vec<(String, f32)>> {
        if limit == 0 || query.trim().is_empty() {
            return Ok(Vec::new());
        }
        let searcher = self.reader.searcher();

        let query_parser = QueryParser::for_index(&self.index, vec![self.content_field]);
        let (parsed_query, errors) = query_parser.parse_query_lenient(query);
        if !errors.is_empty() {
            warn!("Ignored {} malformed query clauses in {:?}", errors.len(), query);
        }

        let top_docs = searcher
            .search(&parsed_query, &TopDocs::with_limit(limit))
            .context("Search failed")?;

        let mut results = Vec::with_capacity(top_docs.len());
        for (score, doc_address) in top_docs {
            let retrieved_doc: TantivyDocument = searcher
                .doc(doc_address)
                .context("Failed to retrieve document")?;
            let content = retrieved_doc
                .get_first(self.content_field)
                .and_then(|v| v.as_str())
                .unwrap_or("")
                .to_string();

            // BM25 scores are unbounded
            let normalized_score = 1.0 / (1.0 + (-score).exp());
            results.push((content, normalized_score));
        }

        Ok(results)
    }
}

impl VectorStore for KeywordIndex {
    fn retrieve(&self, query: &str, top_k: usize) -> Result<(Vec<String>, Vec<f32>)> {
        Ok(self.search(query, top_k)?.into_iter().unzip())
    }
}

/// Content digest, stable across processes and toolchains
fn chunk_id(chunk: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(chunk.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_keyword_index_creation() {
        let dir = tempdir().unwrap();
        let index = KeywordIndex::open(dir.path()).unwrap();
        assert_eq!(index.count().unwrap(), 0);
    }

    #[test]
    fn test_duplicate_chunks_replace_each_other() {
        let dir = tempdir().unwrap();
        let index = KeywordIndex::open(dir.path()).unwrap();

        let chunks = vec!["same text".to_string(), "same text".to_string(), "  ".to_string()];
        assert_eq!(index.add_documents(&chunks).unwrap(), 2);
        index.commit().unwrap();
        assert_eq!(index.count().unwrap(), 1);
    }

    #[test]
    fn test_chunk_id_is_content_digest() {
        assert_eq!(
            chunk_id("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_reindexing_after_reopen_replaces_chunk() {
        let dir = tempdir().unwrap();
        let chunks = vec!["Paris is the capital of France.".to_string()];

        let index = KeywordIndex::open(dir.path()).unwrap();
        index.add_documents(&chunks).unwrap();
        index.commit().unwrap();
        drop(index);

        let index = KeywordIndex::open(dir.path()).unwrap();
        index.add_documents(&chunks).unwrap();
        index.commit().unwrap();
        assert_eq!(index.count().unwrap(), 1);
    }

    #[test]
    fn test_zero_limit() {
        let dir = tempdir().unwrap();
        let index = KeywordIndex::open(dir.path()).unwrap();
        assert!(index.search("anything", 0).unwrap().is_empty());
    }
}
