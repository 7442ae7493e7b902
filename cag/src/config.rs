//! Application configuration: optional YAML file layered over the
//! environment-derived pipeline configuration

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use cag_core::{PipelineConfig, SearchType};
use serde::{Deserialize, Serialize};

use crate::chunking::DEFAULT_CHUNK_SIZE;
use crate::cli::Model;

/// Settings read from `--config FILE`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Overrides the cache directory derived from the data directory
    pub cache_dir: Option<PathBuf>,
    pub search_type: Option<SearchType>,
    pub session_capacity: Option<usize>,
    pub top_k: Option<usize>,
    pub threshold: Option<f32>,

    pub model: Model,
    pub claude_path: Option<PathBuf>,

    /// Use DuckDuckGo as the smart-retrieval fallback
    pub web_search: bool,
    pub max_web_results: usize,

    /// Score by local embeddings (needs the `embeddings` feature)
    pub embeddings: bool,

    pub chunk_size: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            cache_dir: None,
            search_type: None,
            session_capacity: None,
            top_k: None,
            threshold: None,
            model: Model::default(),
            claude_path: None,
            web_search: true,
            max_web_results: 5,
            embeddings: false,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl AppConfig {
    /// Load from a YAML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {:?}", path))?;
        Self::from_yaml(&content).with_context(|| format!("Invalid config file {:?}", path))
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }

    /// Apply this file's overrides to `base`
    ///
    /// `base` normally comes from the environment. When neither the file nor
    /// the environment names a cache directory it goes under `data_dir`.
    pub fn apply(&self, mut base: PipelineConfig, data_dir: &Path, env_cache_dir: bool) -> Result<PipelineConfig> {
        if let Some(dir) = &self.cache_dir {
            base.cache_dir = dir.clone();
        } else if !env_cache_dir {
            base.cache_dir = data_dir.join("kv_cache");
        }
        if let Some(search_type) = self.search_type {
            base.default_search_type = search_type;
        }
        if let Some(capacity) = self.session_capacity {
            base.session_capacity = capacity;
        }
        if let Some(top_k) = self.top_k {
            base.default_top_k = top_k;
        }
        if let Some(threshold) = self.threshold {
            base.default_threshold = threshold;
        }
        base.validate()?;
        Ok(base)
    }
}

/// `<platform cache dir>/cag`, or `./.cag` when the platform has none
pub fn default_data_dir() -> PathBuf {
    dirs::cache_dir()
        .map(|dir| dir.join("cag"))
        .unwrap_or_else(|| PathBuf::from(".cag"))
}
