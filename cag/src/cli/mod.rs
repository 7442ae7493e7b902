//! Language model over the `claude` command-line tool

pub mod claude;
pub mod runner;

pub use claude::ClaudeCli;
pub use runner::{CliError, CliOptions, CliOutput, CliRunner, Model};
