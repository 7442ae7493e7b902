//! [`LanguageModel`] backed by the `claude` CLI

use std::path::PathBuf;

use anyhow::Result;
use cag_core::LanguageModel;
use tracing::debug;

use super::runner::{CliOptions, CliRunner, Model};

const ANSWER_SYSTEM_PROMPT: &str =
    "You answer questions strictly from the provided context. Be concise.";
const JUDGE_SYSTEM_PROMPT: &str = "You are a strict grader. Reply with a single word: yes or no.";

/// Claude model driven through one blocking CLI call per request
#[derive(Debug, Clone)]
pub struct ClaudeCli {
    runner: CliRunner,
    model: Model,
}

impl ClaudeCli {
    pub fn new(model: Model) -> Self {
        let working_dir = std::env::current_dir().unwrap_or_else(|_| std::env::temp_dir());
        Self {
            runner: CliRunner::new(working_dir),
            model,
        }
    }

    pub fn with_claude_path(mut self, path: PathBuf) -> Self {
        self.runner = self.runner.with_claude_path(path);
        self
    }

    pub fn model(&self) -> Model {
        self.model
    }

    fn ask(&self, prompt: &str, system_prompt: &str) -> Result<String> {
        let options = CliOptions {
            model: self.model,
            system_prompt: Some(system_prompt.to_string()),
        };
        let response = self.runner.run(prompt, &options)?.into_response()?;
        Ok(response.trim().to_string())
    }
}

impl LanguageModel for ClaudeCli {
    fn generate(&self, prompt: &str) -> Result<String> {
        let response = self.runner.run(prompt, &CliOptions {
            model: self.model,
            system_prompt: None,
        })?;
        Ok(response.into_response()?.trim().to_string())
    }

    fn answer_question(&self, context: &[String], question: &str) -> Result<String> {
        self.ask(&answer_prompt(context, question), ANSWER_SYSTEM_PROMPT)
    }

    fn check_hallucination(&self, context: &[String], answer: &str) -> Result<String> {
        let verdict = self.ask(&hallucination_prompt(context, answer), JUDGE_SYSTEM_PROMPT)?;
        Ok(if is_yes(&verdict) { "yes" } else { "no" }.to_string())
    }

    fn grade_docs(&self, context: &[String], question: &str) -> Result<Vec<String>> {
        let mut relevant = Vec::new();
        for document in context {
            let verdict = self.ask(&grading_prompt(document, question), JUDGE_SYSTEM_PROMPT)?;
            if is_yes(&verdict) {
                relevant.push(document.clone());
            } else {
                debug!("Graded irrelevant: {:.60}", document);
            }
        }
        Ok(relevant)
    }
}

fn numbered(context: &[String]) -> String {
    if context.is_empty() {
        return "(no context)".to_string();
    }
    context
        .iter()
        .enumerate()
        .map(|(i, text)| format!("[{}] {}", i + 1, text))
        .collect::<Vec<_>>()
        .join("\n")
}

fn answer_prompt(context: &[String], question: &str) -> String {
    format!(
        "Context:\n{}\n\nQuestion: {}\n\nAnswer using only the context above. \
         If the context does not contain the answer, say that you don't know.",
        numbered(context),
        question
    )
}

fn hallucination_prompt(context: &[String], answer: &str) -> String {
    format!(
        "Facts:\n{}\n\nAnswer:\n{}\n\nDoes the answer contain claims that are not supported by the facts? Reply yes or no.",
        numbered(context),
        answer
    )
}

fn grading_prompt(document: &str, question: &str) -> String {
    format!(
        "Document:\n{}\n\nQuestion: {}\n\nIs the document relevant to the question? Reply yes or no.",
        document, question
    )
}

/// True when the first word of a verdict is "yes"
fn is_yes(verdict: &str) -> bool {
    verdict
        .split_whitespace()
        .next()
        .map(|word| word.trim_matches(|c: char| !c.is_alphanumeric()))
        .is_some_and(|word| word.eq_ignore_ascii_case("yes"))
}
