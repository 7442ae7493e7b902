//! Smart retrieval: local retrieval, grading, web fallback and a single
//! hallucination-triggered regeneration
//!
//! ```text
//! RETRIEVE_LOCAL --empty--> WEB_FALLBACK --empty--> DONE (no context)
//!       |                        |
//!     GRADE --empty--------------+
//!       |                     GRADE_WEB --> DONE (web context)
//!     ANSWER --> HALLUCINATION_CHECK --yes--> REGENERATE (once)
//!       |
//!     DONE (local context)
//! ```
//!
//! The flow returns context, not an answer. The draft answer only exists to
//! run the hallucination gate and is reported for inspection.

use crate::cache::CacheEntry;
use crate::error::{CagError, Result};
use crate::fallback::WebFallback;
use crate::providers::{EmbeddingModel, LanguageModel, WebSearch};
use crate::retriever::RelevanceRetriever;
use crate::similarity::SearchType;
use crate::validator::{AnswerValidator, Outcome};
use tracing::{info, warn};

/// Where the final context came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextSource {
    /// Graded local cache entries
    Local,
    /// Graded web search snippets
    Web,
    /// Neither source produced anything
    Empty,
}

/// Everything a smart retrieval run produced
#[derive(Debug)]
pub struct SmartRetrieval {
    /// Final context, at most `top_k` items
    pub context: Vec<String>,
    pub source: ContextSource,
    /// Answer drafted for the hallucination gate (local path only)
    pub draft_answer: Option<String>,
    /// True when the hallucination gate triggered a regeneration
    pub regenerated: bool,
    /// Soft failures that were logged and worked around, in order
    pub degradations: Vec<CagError>,
}

impl SmartRetrieval {
    fn new(source: ContextSource, context: Vec<String>) -> Self {
        Self {
            context,
            source,
            draft_answer: None,
            regenerated: false,
            degradations: Vec::new(),
        }
    }

    /// True when any step fell back instead of completing
    pub fn is_degraded(&self) -> bool {
        !self.degradations.is_empty()
    }

    fn absorb<T>(&mut self, outcome: Outcome<T>) -> T {
        match outcome {
            Outcome::Complete(value) => value,
            Outcome::Degraded { value, cause } => {
                self.degradations.push(cause);
                value
            }
        }
    }
}

/// Composes retriever, validator and web fallback
#[derive(Clone, Copy)]
pub struct SmartRetriever<'a> {
    llm: &'a dyn LanguageModel,
    retriever: RelevanceRetriever<'a>,
    validator: AnswerValidator<'a>,
    fallback: WebFallback<'a>,
}

impl<'a> SmartRetriever<'a> {
    pub fn new(
        llm: &'a dyn LanguageModel,
        embedder: Option<&'a dyn EmbeddingModel>,
        web_search: Option<&'a dyn WebSearch>,
    ) -> Self {
        Self {
            llm,
            retriever: RelevanceRetriever::new(embedder),
            validator: AnswerValidator::new(llm),
            fallback: WebFallback::new(web_search),
        }
    }

    /// Run the full flow over already loaded `entries`
    ///
    /// Only local retrieval failures are fatal; grading, web search and the
    /// answer/hallucination gate degrade and are recorded in the report.
    pub fn run(
        &self,
        query: &str,
        entries: &[CacheEntry],
        top_k: usize,
        threshold: f32,
        search_type: SearchType,
    ) -> Result<SmartRetrieval> {
        info!("Using smart retrieval");

        let relevant = self
            .retriever
            .retrieve(query, entries, top_k, threshold, search_type)?;
        if relevant.is_empty() {
            warn!("No relevant context found in cache");
            return Ok(self.web_fallback(query, top_k));
        }

        let mut report = SmartRetrieval::new(ContextSource::Local, Vec::new());
        let mut graded = report.absorb(self.validator.grade_or_ungraded(&relevant, query));
        if graded.is_empty() {
            info!("No relevant documents found after grading");
            return Ok(self.web_fallback(query, top_k));
        }
        graded.truncate(top_k);

        self.hallucination_gate(query, &graded, &mut report);
        report.context = graded;
        Ok(report)
    }

    fn web_fallback(&self, query: &str, top_k: usize) -> SmartRetrieval {
        let mut report = SmartRetrieval::new(ContextSource::Empty, Vec::new());

        let results = report.absorb(self.fallback.search(query));
        if results.is_empty() {
            warn!("No results from web fallback");
            return report;
        }

        let mut graded = report.absorb(self.validator.grade_or_ungraded(&results, query));
        graded.truncate(top_k);
        if !graded.is_empty() {
            report.source = ContextSource::Web;
        }
        report.context = graded;
        report
    }

    /// Draft an answer, check it, regenerate at most once
    fn hallucination_gate(&self, query: &str, context: &[String], report: &mut SmartRetrieval) {
        let answer = match self.llm.answer_question(context, query) {
            Ok(answer) => answer,
            Err(e) => {
                let cause = CagError::external("answer_question", e);
                warn!("Error in answer generation: {}", cause);
                report.degradations.push(cause);
                return;
            }
        };

        match self.validator.is_hallucination(context, &answer) {
            Ok(false) => report.draft_answer = Some(answer),
            Ok(true) => {
                info!("Hallucination detected, regenerating answer");
                report.regenerated = true;
                match self.llm.answer_question(context, query) {
                    Ok(regenerated) => report.draft_answer = Some(regenerated),
                    Err(e) => {
                        let cause = CagError::external("answer_question", e);
                        warn!("Error regenerating answer, keeping the draft: {}", cause);
                        report.degradations.push(cause);
                        report.draft_answer = Some(answer);
                    }
                }
            }
            Err(cause) => {
                warn!("Error in hallucination check, keeping the draft: {}", cause);
                report.degradations.push(cause);
                report.draft_answer = Some(answer);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Grades by dropping documents containing "noise"; always says "no"
    struct Grader {
        answers: AtomicUsize,
    }

    impl LanguageModel for Grader {
        fn generate(&self, _prompt: &str) -> anyhow::Result<String> {
            Ok(String::new())
        }

        fn answer_question(&self, _context: &[String], _question: &str) -> anyhow::Result<String> {
            self.answers.fetch_add(1, Ordering::SeqCst);
            Ok("draft".to_string())
        }

        fn check_hallucination(&self, _context: &[String], _answer: &str) -> anyhow::Result<String> {
            Ok("no".to_string())
        }

        fn grade_docs(&self, context: &[String], _question: &str) -> anyhow::Result<Vec<String>> {
            Ok(context.iter().filter(|d| !d.contains("noise")).cloned().collect())
        }
    }

    #[test]
    fn test_local_path_grades_and_drafts() {
        let llm = Grader {
            answers: AtomicUsize::new(0),
        };
        let entries = vec![
            CacheEntry::new("capital france paris"),
            CacheEntry::new("capital noise"),
        ];

        let report = SmartRetriever::new(&llm, None, None)
            .run("capital france", &entries, 5, 0.0, SearchType::Jaccard)
            .unwrap();

        assert_eq!(report.source, ContextSource::Local);
        assert_eq!(report.context, vec!["capital france paris".to_string()]);
        assert_eq!(report.draft_answer.as_deref(), Some("draft"));
        assert!(!report.regenerated);
        assert!(!report.is_degraded());
        assert_eq!(llm.answers.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_no_web_search_ends_empty() {
        let llm = Grader {
            answers: AtomicUsize::new(0),
        };
        let report = SmartRetriever::new(&llm, None, None)
            .run("q", &[], 5, 0.0, SearchType::TfIdf)
            .unwrap();

        assert_eq!(report.source, ContextSource::Empty);
        assert!(report.context.is_empty());
        assert!(report.draft_answer.is_none());
        assert_eq!(llm.answers.load(Ordering::SeqCst), 0);
    }
}
