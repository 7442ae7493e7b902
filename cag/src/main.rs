use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use anyhow::{Context, Result};
use cag_core::{
    AgenticRag, CagPipeline, InferOptions, LanguageModel, PipelineConfig, QuestionAnswer,
    SearchType, VectorStore, WebSearch,
};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cag::chunking::chunk_text;
use cag::config::{default_data_dir, AppConfig};
use cag::{ClaudeCli, DuckDuckGo, KeywordIndex};

#[derive(Parser)]
#[command(name = "cag")]
#[command(about = "Cache-augmented generation over local documents", long_about = None)]
struct Cli {
    /// Data directory (defaults to the platform cache directory)
    #[arg(short, long)]
    data_dir: Option<PathBuf>,

    /// YAML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Chunk files and preload them under a cache key
    Preload {
        /// Cache key to store the chunks under
        #[arg(short, long)]
        key: String,

        /// Maximum chunk length in characters
        #[arg(long)]
        chunk_size: Option<usize>,

        /// Files to read
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Answer a question from a preloaded cache key
    Ask {
        #[arg(short, long)]
        key: String,

        #[arg(long)]
        top_k: Option<usize>,

        #[arg(long)]
        threshold: Option<f32>,

        /// tfidf, bm25 or jaccard
        #[arg(short = 't', long, value_parser = SearchType::from_str)]
        search_type: Option<SearchType>,

        /// Grade context, fall back to web search, check for hallucination
        #[arg(long)]
        smart: bool,

        /// Pool retrieval over model-generated query variants
        #[arg(long)]
        multi_query: bool,

        query: String,
    },

    /// List persisted cache keys
    Keys,

    /// Delete every persisted cache key
    Reset,

    /// Add files to the keyword index used by `qa` and `agentic`
    Index {
        #[arg(long)]
        chunk_size: Option<usize>,

        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Answer from the keyword index
    Qa {
        query: String,

        #[arg(long, default_value = "5")]
        top_k: usize,

        /// Grade retrieved documents before answering
        #[arg(long)]
        filter: bool,
    },

    /// Answer from the keyword index, searching the web if nothing is relevant
    Agentic {
        query: String,

        #[arg(long, default_value = "5")]
        top_k: usize,
    },
}

struct App {
    data_dir: PathBuf,
    config: AppConfig,
}

impl App {
    fn load(cli: &Cli) -> Result<Self> {
        let data_dir = cli.data_dir.clone().unwrap_or_else(default_data_dir);
        let config = match &cli.config {
            Some(path) => AppConfig::load(path)?,
            None => AppConfig::default(),
        };
        Ok(Self { data_dir, config })
    }

    fn index_dir(&self) -> PathBuf {
        self.data_dir.join("index")
    }

    fn pipeline_config(&self) -> Result<PipelineConfig> {
        let from_env = PipelineConfig::from_env()?;
        let env_cache_dir = std::env::var_os(cag_core::config::ENV_CACHE_DIR).is_some();
        self.config.apply(from_env, &self.data_dir, env_cache_dir)
    }

    fn llm(&self) -> Arc<dyn LanguageModel> {
        let mut llm = ClaudeCli::new(self.config.model);
        if let Some(path) = &self.config.claude_path {
            llm = llm.with_claude_path(path.clone());
        }
        Arc::new(llm)
    }

    fn web_search(&self) -> Result<Option<Arc<dyn WebSearch>>> {
        if !self.config.web_search {
            return Ok(None);
        }
        Ok(Some(Arc::new(DuckDuckGo::new(self.config.max_web_results)?)))
    }

    fn pipeline(&self) -> Result<CagPipeline> {
        let mut builder = CagPipeline::builder()
            .llm(self.llm())
            .config(self.pipeline_config()?);
        if let Some(web) = self.web_search()? {
            builder = builder.web_search(web);
        }
        builder = self.with_embeddings(builder)?;
        Ok(builder.build()?)
    }

    #[cfg(feature = "embeddings")]
    fn with_embeddings(&self, builder: cag_core::CagPipelineBuilder) -> Result<cag_core::CagPipelineBuilder> {
        if !self.config.embeddings {
            return Ok(builder);
        }
        let embedder = cag::search::FastEmbedder::new()?;
        Ok(builder.embedding_model(Arc::new(embedder)))
    }

    #[cfg(not(feature = "embeddings"))]
    fn with_embeddings(&self, builder: cag_core::CagPipelineBuilder) -> Result<cag_core::CagPipelineBuilder> {
        if self.config.embeddings {
            tracing::warn!("Embeddings requested but this build lacks the `embeddings` feature; using lexical scoring");
        }
        Ok(builder)
    }

    fn read_chunks(&self, files: &[PathBuf], chunk_size: Option<usize>) -> Result<Vec<String>> {
        let chunk_size = chunk_size.unwrap_or(self.config.chunk_size);
        let mut chunks = Vec::new();
        for file in files {
            chunks.extend(read_file_chunks(file, chunk_size)?);
        }
        Ok(chunks)
    }
}

fn read_file_chunks(path: &Path, chunk_size: usize) -> Result<Vec<String>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {:?}", path))?;
    let chunks = chunk_text(&text, chunk_size);
    info!("{:?}: {} chunks", path, chunks.len());
    Ok(chunks)
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "cag=info,cag_core=info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let app = App::load(&cli)?;

    match cli.command {
        Commands::Preload { ref key, chunk_size, ref files } => {
            let chunks = app.read_chunks(files, chunk_size)?;
            let mut pipeline = app.pipeline()?;
            let count = pipeline.preload_documents(&chunks, key)?;
            println!("Preloaded {} chunks under '{}'", count, key);
        }

        Commands::Ask {
            ref key,
            top_k,
            threshold,
            search_type,
            smart,
            multi_query,
            ref query,
        } => {
            let mut options = InferOptions::new().smart(smart).multi_query(multi_query);
            if let Some(top_k) = top_k {
                options = options.top_k(top_k);
            }
            if let Some(threshold) = threshold {
                options = options.threshold(threshold);
            }
            if let Some(search_type) = search_type {
                options = options.search_type(search_type);
            }

            let mut pipeline = app.pipeline()?;
            let answer = pipeline.infer(query, key, &options)?;
            println!("{}", answer);
        }

        Commands::Keys => {
            let pipeline = app.pipeline()?;
            let keys = pipeline.store().keys()?;
            if keys.is_empty() {
                println!("No cache keys found. Run 'cag preload --key <KEY> <FILE>...' first.");
            } else {
                for key in keys {
                    println!("{}", key);
                }
            }
        }

        Commands::Reset => {
            let mut pipeline = app.pipeline()?;
            let removed = pipeline.reset()?;
            println!("Removed {} cache blobs from {:?}", removed, pipeline.store().cache_dir());
        }

        Commands::Index { chunk_size, ref files } => {
            let chunks = app.read_chunks(files, chunk_size)?;
            let index = KeywordIndex::open(app.index_dir())?;
            let staged = index.add_documents(&chunks)?;
            index.commit()?;
            println!("Indexed {} chunks ({} documents total)", staged, index.count()?);
        }

        Commands::Qa { ref query, top_k, filter } => {
            let index: Arc<dyn VectorStore> =
                Arc::new(KeywordIndex::open_reader_only(app.index_dir())?);
            let mut qa = QuestionAnswer::new(app.llm(), index)
                .with_top_k(top_k)
                .with_relevancy_filter(filter);
            println!("{}", qa.invoke(query)?);
        }

        Commands::Agentic { ref query, top_k } => {
            let mut agentic = AgenticRag::new(app.llm()).with_top_k(top_k);
            if app.index_dir().exists() {
                agentic = agentic.with_vector_store(Arc::new(KeywordIndex::open_reader_only(app.index_dir())?));
            }
            if let Some(web) = app.web_search()? {
                agentic = agentic.with_web_search(web);
            }
            println!("{}", agentic.run(query)?);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_type_parsed_by_clap() {
        let cli = Cli::try_parse_from(["cag", "ask", "--key", "geo", "-t", "BM25", "capital?"]).unwrap();
        match cli.command {
            Commands::Ask { search_type, .. } => assert_eq!(search_type, Some(SearchType::Bm25)),
            _ => panic!("expected ask"),
        }
    }

    #[test]
    fn test_unknown_search_type_rejected_at_parse_time() {
        let err = Cli::try_parse_from(["cag", "ask", "--key", "geo", "--search-type", "dense", "q"])
            .err()
            .unwrap();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }
}
