//! Configuration for the CAG pipeline

use crate::error::{CagError, Result};
use crate::similarity::SearchType;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Environment variable naming the cache directory
pub const ENV_CACHE_DIR: &str = "CAG_CACHE_DIR";
/// Environment variable naming the default lexical search type
pub const ENV_SEARCH_TYPE: &str = "CAG_SEARCH_TYPE";
/// Environment variable for the session cache capacity
pub const ENV_SESSION_CAPACITY: &str = "CAG_SESSION_CAPACITY";
/// Environment variable for the default top-k
pub const ENV_TOP_K: &str = "CAG_TOP_K";
/// Environment variable for the default similarity threshold
pub const ENV_THRESHOLD: &str = "CAG_THRESHOLD";

/// Configuration for a [`CagPipeline`](crate::pipeline::CagPipeline)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Directory holding one serialized blob per cache key
    pub cache_dir: PathBuf,

    /// Lexical scorer used when a call does not name one
    pub default_search_type: SearchType,

    /// How many cache keys the in-memory session cache keeps loaded
    pub session_capacity: usize,

    /// Number of chunks retrieved when a call does not say otherwise
    pub default_top_k: usize,

    /// Minimum similarity score when a call does not say otherwise
    pub default_threshold: f32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            cache_dir: PathBuf::from("kv_cache"),
            default_search_type: SearchType::TfIdf,
            session_capacity: 4,
            default_top_k: 5,
            default_threshold: 0.1,
        }
    }
}

impl PipelineConfig {
    /// Create a new builder for pipeline configuration
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder::default()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.session_capacity == 0 {
            return Err(CagError::InvalidConfiguration(
                "session_capacity must be greater than 0".to_string(),
            ));
        }

        if !self.default_threshold.is_finite() {
            return Err(CagError::InvalidConfiguration(
                "default_threshold must be a finite number".to_string(),
            ));
        }

        if self.cache_dir.as_os_str().is_empty() {
            return Err(CagError::InvalidConfiguration(
                "cache_dir must not be empty".to_string(),
            ));
        }

        Ok(())
    }

    /// Load configuration from the environment (and a `.env` file if present)
    ///
    /// Unset variables keep their defaults. A value that does not parse is an
    /// error rather than a silent fallback.
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build a configuration from an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut builder = Self::builder();

        if let Some(dir) = lookup(ENV_CACHE_DIR) {
            builder = builder.cache_dir(dir);
        }
        if let Some(search_type) = lookup(ENV_SEARCH_TYPE) {
            builder = builder.default_search_type(search_type.parse()?);
        }
        if let Some(capacity) = lookup(ENV_SESSION_CAPACITY) {
            builder = builder.session_capacity(parse_var(ENV_SESSION_CAPACITY, &capacity)?);
        }
        if let Some(top_k) = lookup(ENV_TOP_K) {
            builder = builder.default_top_k(parse_var(ENV_TOP_K, &top_k)?);
        }
        if let Some(threshold) = lookup(ENV_THRESHOLD) {
            builder = builder.default_threshold(parse_var(ENV_THRESHOLD, &threshold)?);
        }

        let config = builder.build();
        config.validate()?;
        Ok(config)
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, raw: &str) -> Result<T> {
    raw.trim().parse().map_err(|_| {
        CagError::InvalidConfiguration(format!("{} has an invalid value: {:?}", name, raw))
    })
}

/// Builder for pipeline configuration
#[derive(Debug, Default)]
pub struct PipelineConfigBuilder {
    cache_dir: Option<PathBuf>,
    default_search_type: Option<SearchType>,
    session_capacity: Option<usize>,
    default_top_k: Option<usize>,
    default_threshold: Option<f32>,
}

impl PipelineConfigBuilder {
    /// Set the cache directory
    pub fn cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = Some(dir.into());
        self
    }

    /// Set the default lexical search type
    pub fn default_search_type(mut self, search_type: SearchType) -> Self {
        self.default_search_type = Some(search_type);
        self
    }

    /// Set how many cache keys stay loaded in memory
    pub fn session_capacity(mut self, capacity: usize) -> Self {
        self.session_capacity = Some(capacity);
        self
    }

    /// Set the default top-k
    pub fn default_top_k(mut self, top_k: usize) -> Self {
        self.default_top_k = Some(top_k);
        self
    }

    /// Set the default similarity threshold
    pub fn default_threshold(mut self, threshold: f32) -> Self {
        self.default_threshold = Some(threshold);
        self
    }

    /// Build the pipeline configuration
    pub fn build(self) -> PipelineConfig {
        let defaults = PipelineConfig::default();

        PipelineConfig {
            cache_dir: self.cache_dir.unwrap_or(defaults.cache_dir),
            default_search_type: self
                .default_search_type
                .unwrap_or(defaults.default_search_type),
            session_capacity: self.session_capacity.unwrap_or(defaults.session_capacity),
            default_top_k: self.default_top_k.unwrap_or(defaults.default_top_k),
            default_threshold: self.default_threshold.unwrap_or(defaults.default_threshold),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = PipelineConfig::default();
        assert_eq!(config.cache_dir, PathBuf::from("kv_cache"));
        assert_eq!(config.default_search_type, SearchType::TfIdf);
        assert_eq!(config.default_top_k, 5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut invalid_config = PipelineConfig::default();
        invalid_config.session_capacity = 0;
        assert!(invalid_config.validate().is_err());

        let mut invalid_config = PipelineConfig::default();
        invalid_config.default_threshold = f32::NAN;
        assert!(invalid_config.validate().is_err());
    }

    #[test]
    fn test_config_builder() {
        let config = PipelineConfig::builder()
            .cache_dir("/tmp/cag")
            .default_search_type(SearchType::Bm25)
            .session_capacity(2)
            .default_threshold(0.0)
            .build();

        assert_eq!(config.cache_dir, PathBuf::from("/tmp/cag"));
        assert_eq!(config.default_search_type, SearchType::Bm25);
        assert_eq!(config.session_capacity, 2);
        assert_eq!(config.default_threshold, 0.0);
        assert_eq!(config.default_top_k, 5);
    }

    #[test]
    fn test_from_lookup() {
        let vars: HashMap<&str, &str> = [
            (ENV_CACHE_DIR, "cache-here"),
            (ENV_SEARCH_TYPE, "JACCARD"),
            (ENV_TOP_K, "3"),
        ]
        .into_iter()
        .collect();

        let config =
            PipelineConfig::from_lookup(|name| vars.get(name).map(|v| v.to_string())).unwrap();

        assert_eq!(config.cache_dir, PathBuf::from("cache-here"));
        assert_eq!(config.default_search_type, SearchType::Jaccard);
        assert_eq!(config.default_top_k, 3);
        assert_eq!(config.session_capacity, 4);
    }

    #[test]
    fn test_from_lookup_rejects_bad_values() {
        let result = PipelineConfig::from_lookup(|name| {
            (name == ENV_SEARCH_TYPE).then(|| "cosine".to_string())
        });
        assert!(matches!(result, Err(CagError::InvalidConfiguration(_))));

        let result = PipelineConfig::from_lookup(|name| {
            (name == ENV_SESSION_CAPACITY).then(|| "many".to_string())
        });
        assert!(matches!(result, Err(CagError::InvalidConfiguration(_))));

        let result = PipelineConfig::from_lookup(|name| {
            (name == ENV_SESSION_CAPACITY).then(|| "0".to_string())
        });
        assert!(matches!(result, Err(CagError::InvalidConfiguration(_))));
    }
}
