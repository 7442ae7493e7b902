use std::path::PathBuf;
use std::process::{Command, Stdio};
use anyhow::{Result, Context};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Model {
    Opus,
    #[default]
    Sonnet,
    Haiku,
}

impl Model {
    pub fn as_str(&self) -> &'static str {
        match self {
            Model::Opus => "opus",
            Model::Sonnet => "sonnet",
            Model::Haiku => "haiku",
        }
    }
}

impl std::str::FromStr for Model {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "opus" => Ok(Model::Opus),
            "sonnet" => Ok(Model::Sonnet),
            "haiku" => Ok(Model::Haiku),
            other => anyhow::bail!("unknown model '{}': choose opus, sonnet or haiku", other),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CliOptions {
    pub model: Model,
    pub system_prompt: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CliOutput {
    pub response: String,
    pub stderr: String,
    pub exit_code: i32,
}

impl CliOutput {
    /// The response, or an error if the process failed
    pub fn into_response(self) -> std::result::Result<String, CliError> {
        if self.exit_code == 0 {
            Ok(self.response)
        } else {
            Err(CliError::NonZeroExit {
                code: self.exit_code,
                stderr: self.stderr.trim().to_string(),
            })
        }
    }
}

#[derive(Debug, Error)]
pub enum CliError {
    #[error("claude exited with status {code}: {stderr}")]
    NonZeroExit { code: i32, stderr: String },
}

/// Blocking runner for the `claude` CLI in print mode
#[derive(Debug, Clone)]
pub struct CliRunner {
    claude_path: PathBuf,
    working_dir: PathBuf,
}

impl CliRunner {
    pub fn new(working_dir: PathBuf) -> Self {
        Self {
            claude_path: PathBuf::from("claude"),
            working_dir,
        }
    }

    pub fn with_claude_path(mut self, path: PathBuf) -> Self {
        self.claude_path = path;
        self
    }

    /// Run claude CLI with given prompt and options
    pub fn run(&self, prompt: &str, options: &CliOptions) -> Result<CliOutput> {
        let mut cmd = Command::new(&self.claude_path);
        cmd.current_dir(&self.working_dir);

        cmd.arg("--print");
        cmd.arg("--model").arg(options.model.as_str());

        if let Some(ref system_prompt) = options.system_prompt {
            cmd.arg("--system-prompt").arg(system_prompt);
        }

        // Prompt is positional and must be last
        cmd.arg(prompt);

        // Close stdin so the CLI never waits for input
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        tracing::debug!("Running claude CLI: {:?}", cmd);

        let output = cmd
            .output()
            .with_context(|| format!("Failed to execute {:?}", self.claude_path))?;

        let response = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();

        if !stderr.is_empty() {
            tracing::warn!("claude stderr: {}", stderr);
        }

        Ok(CliOutput {
            response,
            stderr,
            exit_code: output.status.code().unwrap_or(-1),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_as_str() {
        assert_eq!(Model::Opus.as_str(), "opus");
        assert_eq!(Model::Sonnet.as_str(), "sonnet");
        assert_eq!(Model::Haiku.as_str(), "haiku");
        assert_eq!("HAIKU".parse::<Model>().unwrap(), Model::Haiku);
        assert!("gpt".parse::<Model>().is_err());
    }

    #[test]
    fn test_non_zero_exit_is_an_error() {
        let output = CliOutput {
            response: String::new(),
            stderr: "rate limited\n".to_string(),
            exit_code: 2,
        };
        let err = output.into_response().unwrap_err();
        assert_eq!(err.to_string(), "claude exited with status 2: rate limited");
    }

    #[cfg(unix)]
    #[test]
    fn test_run_passes_prompt_last() {
        let runner = CliRunner::new(std::env::temp_dir()).with_claude_path(PathBuf::from("echo"));
        let output = runner
            .run("hello", &CliOptions { model: Model::Haiku, ..Default::default() })
            .unwrap();

        assert_eq!(output.exit_code, 0);
        assert_eq!(output.response.trim(), "--print --model haiku hello");
    }

    #[test]
    fn test_missing_binary() {
        let runner = CliRunner::new(std::env::temp_dir())
            .with_claude_path(PathBuf::from("definitely-not-a-claude-binary"));
        assert!(runner.run("hi", &CliOptions::default()).is_err());
    }
}
