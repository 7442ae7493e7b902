//! Answer validation on top of the language model's grading capabilities
//!
//! Soft-degrade points report through [`Outcome`]: a step either completes,
//! or falls back to a usable value and keeps the error that caused it.
//! Fatal failures stay in `Err`.

use crate::error::{CagError, Result};
use crate::providers::LanguageModel;
use tracing::{debug, warn};

/// Result of a step that may degrade instead of failing
#[derive(Debug)]
pub enum Outcome<T> {
    /// The step ran as intended
    Complete(T),
    /// The step failed softly; `value` is the fallback that was used
    Degraded { value: T, cause: CagError },
}

impl<T> Outcome<T> {
    pub fn value(&self) -> &T {
        match self {
            Outcome::Complete(value) | Outcome::Degraded { value, .. } => value,
        }
    }

    pub fn into_value(self) -> T {
        match self {
            Outcome::Complete(value) | Outcome::Degraded { value, .. } => value,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, Outcome::Degraded { .. })
    }

    /// The error behind a degraded outcome
    pub fn cause(&self) -> Option<&CagError> {
        match self {
            Outcome::Complete(_) => None,
            Outcome::Degraded { cause, .. } => Some(cause),
        }
    }
}

/// Grading and hallucination checks backed by a [`LanguageModel`]
#[derive(Clone, Copy)]
pub struct AnswerValidator<'a> {
    llm: &'a dyn LanguageModel,
}

impl<'a> AnswerValidator<'a> {
    pub fn new(llm: &'a dyn LanguageModel) -> Self {
        Self { llm }
    }

    /// True iff the model's verdict, trimmed and case-folded, is "yes"
    pub fn is_hallucination(&self, context: &[String], answer: &str) -> Result<bool> {
        let verdict = self
            .llm
            .check_hallucination(context, answer)
            .map_err(|e| CagError::external("check_hallucination", e))?;
        let hallucinated = verdict.trim().eq_ignore_ascii_case("yes");
        debug!("Hallucination verdict {:?} -> {}", verdict.trim(), hallucinated);
        Ok(hallucinated)
    }

    /// The model's relevant subset of `context`
    pub fn grade_relevance(&self, context: &[String], query: &str) -> Result<Vec<String>> {
        self.llm
            .grade_docs(context, query)
            .map_err(|e| CagError::external("grade_docs", e))
    }

    /// Grade `context`, keeping it ungraded if grading fails
    pub fn grade_or_ungraded(&self, context: &[String], query: &str) -> Outcome<Vec<String>> {
        match self.grade_relevance(context, query) {
            Ok(graded) => {
                debug!("Grading kept {} of {} documents", graded.len(), context.len());
                Outcome::Complete(graded)
            }
            Err(cause) => {
                warn!("Error in grading documents, using ungraded context: {}", cause);
                Outcome::Degraded {
                    value: context.to_vec(),
                    cause,
                }
            }
        }
    }
}
