//! CAG pipeline facade: preload documents under a cache key, then answer
//! queries against it

use crate::cache::{CacheEntry, CacheStats, InvalidationReason, KvCacheStore, SessionCache};
use crate::config::PipelineConfig;
use crate::error::{CagError, Result};
use crate::multi_query::MultiQueryRetriever;
use crate::orchestrator::{SmartRetrieval, SmartRetriever};
use crate::providers::{EmbeddingModel, LanguageModel, WebSearch};
use crate::retriever::RelevanceRetriever;
use crate::similarity::SearchType;
use std::sync::Arc;
use tracing::{debug, error, info};

/// Per-call inference options
///
/// Unset values fall back to the pipeline configuration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InferOptions {
    pub top_k: Option<usize>,
    pub threshold: Option<f32>,
    pub use_multi_query: bool,
    pub smart_retrieval: bool,
    pub search_type: Option<SearchType>,
}

impl InferOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn top_k(mut self, top_k: usize) -> Self {
        self.top_k = Some(top_k);
        self
    }

    pub fn threshold(mut self, threshold: f32) -> Self {
        self.threshold = Some(threshold);
        self
    }

    pub fn multi_query(mut self, enabled: bool) -> Self {
        self.use_multi_query = enabled;
        self
    }

    pub fn smart(mut self, enabled: bool) -> Self {
        self.smart_retrieval = enabled;
        self
    }

    pub fn search_type(mut self, search_type: SearchType) -> Self {
        self.search_type = Some(search_type);
        self
    }

    /// Parse and set the search type from its name
    pub fn search_type_name(self, name: &str) -> Result<Self> {
        Ok(self.search_type(name.parse()?))
    }
}

/// Which retrieval flow produced a context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetrievalMode {
    Plain,
    MultiQuery,
    Smart,
}

impl RetrievalMode {
    /// Smart wins over multi-query, which wins over plain
    pub fn select(options: &InferOptions) -> Self {
        if options.smart_retrieval {
            RetrievalMode::Smart
        } else if options.use_multi_query {
            RetrievalMode::MultiQuery
        } else {
            RetrievalMode::Plain
        }
    }
}

/// Cache-augmented generation pipeline
///
/// One instance owns one session cache; `infer` takes `&mut self` so the
/// session cache always has a single writer.
pub struct CagPipeline {
    llm: Arc<dyn LanguageModel>,
    embedding_model: Option<Arc<dyn EmbeddingModel>>,
    web_search: Option<Arc<dyn WebSearch>>,
    config: PipelineConfig,
    store: KvCacheStore,
    session: SessionCache,
}

impl CagPipeline {
    pub fn builder() -> CagPipelineBuilder {
        CagPipelineBuilder::default()
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn store(&self) -> &KvCacheStore {
        &self.store
    }

    pub fn has_embedding_model(&self) -> bool {
        self.embedding_model.is_some()
    }

    /// Embed (if configured) and persist `chunks` under `cache_key`
    ///
    /// The whole batch is built in memory before a single save, so a failure
    /// leaves any previous value for the key untouched. Returns the number of
    /// entries saved.
    pub fn preload_documents(&mut self, chunks: &[String], cache_key: &str) -> Result<usize> {
        info!("Preloading {} chunks under cache key: {}", chunks.len(), cache_key);

        let entries = self
            .build_entries(chunks)
            .map_err(|e| CagError::preload(cache_key, e))?;
        self.store
            .save(cache_key, &entries)
            .map_err(|e| CagError::preload(cache_key, e))?;

        self.session
            .invalidate(cache_key, InvalidationReason::Overwritten);
        info!("Preloaded {} entries under cache key: {}", entries.len(), cache_key);
        Ok(entries.len())
    }

    fn build_entries(&self, chunks: &[String]) -> Result<Vec<CacheEntry>> {
        let Some(embedder) = &self.embedding_model else {
            return Ok(chunks.iter().map(CacheEntry::new).collect());
        };
        if chunks.is_empty() {
            return Ok(Vec::new());
        }

        debug!("Embedding {} chunks", chunks.len());
        let embeddings = embedder
            .embed_documents(chunks)
            .map_err(|e| CagError::external("embed_documents", e))?;
        if embeddings.len() != chunks.len() {
            return Err(CagError::external(
                "embed_documents",
                anyhow::anyhow!(
                    "returned {} embeddings for {} chunks",
                    embeddings.len(),
                    chunks.len()
                ),
            ));
        }
        if let Some(position) = embeddings
            .iter()
            .position(|embedding| embedding.iter().any(|v| !v.is_finite()))
        {
            return Err(CagError::external(
                "embed_documents",
                anyhow::anyhow!("embedding for chunk {} has non-finite components", position),
            ));
        }

        Ok(chunks
            .iter()
            .zip(embeddings)
            .map(|(text, embedding)| CacheEntry::with_embedding(text, embedding))
            .collect())
    }

    /// Answer `query` from the documents preloaded under `cache_key`
    pub fn infer(&mut self, query: &str, cache_key: &str, options: &InferOptions) -> Result<String> {
        let context = self.retrieve_context(query, cache_key, options)?;

        info!("Answering with {} context chunks", context.len());
        self.llm
            .answer_question(&context, query)
            .map_err(|e| {
                let err = CagError::external("answer_question", e);
                error!("Error during inference: {}", err);
                err
            })
    }

    /// The context `infer` would answer from
    pub fn retrieve_context(
        &mut self,
        query: &str,
        cache_key: &str,
        options: &InferOptions,
    ) -> Result<Vec<String>> {
        let entries = self.load_entries(cache_key)?;
        let (top_k, threshold, search_type) = self.resolve(options);
        let retriever = RelevanceRetriever::new(self.embedding_model.as_deref());

        let mode = RetrievalMode::select(options);
        debug!(
            "Retrieval mode {:?} for cache key {} (embeddings: {})",
            mode,
            cache_key,
            retriever.uses_embeddings()
        );

        let result = match mode {
            RetrievalMode::Smart => self
                .smart_retriever()
                .run(query, &entries, top_k, threshold, search_type)
                .map(|report| report.context),
            RetrievalMode::MultiQuery => MultiQueryRetriever::new(self.llm.as_ref(), retriever)
                .retrieve(query, &entries, top_k, threshold, search_type),
            RetrievalMode::Plain => {
                retriever.retrieve(query, &entries, top_k, threshold, search_type)
            }
        };

        result.map_err(|e| {
            error!("Error during retrieval: {}", e);
            e
        })
    }

    /// Run smart retrieval and return the full report
    pub fn smart_retrieve(
        &mut self,
        query: &str,
        cache_key: &str,
        options: &InferOptions,
    ) -> Result<SmartRetrieval> {
        let entries = self.load_entries(cache_key)?;
        let (top_k, threshold, search_type) = self.resolve(options);
        self.smart_retriever()
            .run(query, &entries, top_k, threshold, search_type)
    }

    fn smart_retriever(&self) -> SmartRetriever<'_> {
        SmartRetriever::new(
            self.llm.as_ref(),
            self.embedding_model.as_deref(),
            self.web_search.as_deref(),
        )
    }

    fn resolve(&self, options: &InferOptions) -> (usize, f32, SearchType) {
        (
            options.top_k.unwrap_or(self.config.default_top_k),
            options.threshold.unwrap_or(self.config.default_threshold),
            options
                .search_type
                .unwrap_or(self.config.default_search_type),
        )
    }

    fn load_entries(&mut self, cache_key: &str) -> Result<Arc<[CacheEntry]>> {
        if let Some(entries) = self.session.get(cache_key) {
            return Ok(entries);
        }

        info!("Loading KV cache for key: {}", cache_key);
        match self.store.load(cache_key)? {
            Some(entries) => Ok(self.session.insert(cache_key, entries)),
            None => {
                error!("KV cache is not loaded. Please preload the documents first.");
                Err(CagError::CacheMiss {
                    key: cache_key.to_string(),
                })
            }
        }
    }

    /// Drop `cache_key` from the session cache; returns whether it was loaded
    pub fn invalidate(&mut self, cache_key: &str) -> bool {
        self.session.invalidate(cache_key, InvalidationReason::Manual)
    }

    /// Drop every loaded key from the session cache
    pub fn invalidate_all(&mut self) -> usize {
        self.session.clear(InvalidationReason::Manual)
    }

    /// Re-read `cache_key` from disk into the session cache
    pub fn reload(&mut self, cache_key: &str) -> Result<usize> {
        self.session.invalidate(cache_key, InvalidationReason::Reload);
        let entries = self.load_entries(cache_key)?;
        Ok(entries.len())
    }

    /// Delete every persisted key and empty the session cache
    pub fn reset(&mut self) -> Result<usize> {
        let removed = self.store.reset()?;
        self.session.clear(InvalidationReason::Reset);
        Ok(removed)
    }

    pub fn session_stats(&self) -> CacheStats {
        self.session.stats()
    }

    /// Cache keys currently held in memory, least recently used first
    pub fn loaded_keys(&self) -> Vec<String> {
        self.session.keys()
    }
}

/// Builder for [`CagPipeline`]
#[derive(Default)]
pub struct CagPipelineBuilder {
    llm: Option<Arc<dyn LanguageModel>>,
    embedding_model: Option<Arc<dyn EmbeddingModel>>,
    web_search: Option<Arc<dyn WebSearch>>,
    config: Option<PipelineConfig>,
}

impl CagPipelineBuilder {
    /// Set the language model (required)
    pub fn llm(mut self, llm: Arc<dyn LanguageModel>) -> Self {
        self.llm = Some(llm);
        self
    }

    /// Set the embedding model; when set, all retrieval scores by embedding
    pub fn embedding_model(mut self, model: Arc<dyn EmbeddingModel>) -> Self {
        self.embedding_model = Some(model);
        self
    }

    /// Set the web search used by smart retrieval's fallback
    pub fn web_search(mut self, search: Arc<dyn WebSearch>) -> Self {
        self.web_search = Some(search);
        self
    }

    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Validate the configuration and open the cache store
    pub fn build(self) -> Result<CagPipeline> {
        let llm = self.llm.ok_or_else(|| {
            CagError::InvalidConfiguration("a language model is required".to_string())
        })?;
        let config = self.config.unwrap_or_default();
        config.validate()?;

        let store = KvCacheStore::new(&config.cache_dir)?;
        let session = SessionCache::new(config.session_capacity);

        info!(
            "CAG pipeline ready (search type: {}, embeddings: {}, web search: {})",
            config.default_search_type,
            self.embedding_model.is_some(),
            self.web_search.is_some()
        );

        Ok(CagPipeline {
            llm,
            embedding_model: self.embedding_model,
            web_search: self.web_search,
            config,
            store,
            session,
        })
    }
}
