pub mod chunking;
pub mod cli;
pub mod config;
pub mod search;
pub mod web;

pub use chunking::chunk_text;
pub use cli::{ClaudeCli, CliRunner, Model};
pub use config::AppConfig;
pub use search::KeywordIndex;
pub use web::DuckDuckGo;
