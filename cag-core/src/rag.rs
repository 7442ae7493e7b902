//! Question answering over an opaque [`VectorStore`]
//!
//! [`QuestionAnswer`] is the plain retrieve-then-answer loop with an optional
//! relevance filter and a history of past exchanges. [`AgenticRag`] adds the
//! web fallback and the single hallucination-triggered regeneration, and
//! returns the answer itself.

use crate::error::{CagError, Result};
use crate::fallback::WebFallback;
use crate::providers::{LanguageModel, VectorStore, WebSearch};
use crate::validator::AnswerValidator;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};

/// One answered query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QaRecord {
    pub query: String,
    pub answer: String,
    pub context: Vec<String>,
    pub scores: Vec<f32>,
}

fn require_query(query: &str) -> Result<()> {
    if query.trim().is_empty() {
        error!("Query string cannot be empty.");
        return Err(CagError::InvalidConfiguration(
            "query string cannot be empty".to_string(),
        ));
    }
    Ok(())
}

/// Retrieve-then-answer over a vector store
pub struct QuestionAnswer {
    llm: Arc<dyn LanguageModel>,
    vector_store: Arc<dyn VectorStore>,
    pub top_k: usize,
    pub document_relevancy_filter: bool,
    history: Vec<QaRecord>,
}

impl QuestionAnswer {
    pub fn new(llm: Arc<dyn LanguageModel>, vector_store: Arc<dyn VectorStore>) -> Self {
        Self {
            llm,
            vector_store,
            top_k: 5,
            document_relevancy_filter: false,
            history: Vec::new(),
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    /// Grade retrieved documents before answering
    pub fn with_relevancy_filter(mut self, enabled: bool) -> Self {
        self.document_relevancy_filter = enabled;
        self
    }

    /// Answer `query` and record the exchange
    pub fn invoke(&mut self, query: &str) -> Result<String> {
        require_query(query)?;

        info!("Retrieving context and scores from the vector store");
        let (mut context, scores) = self
            .vector_store
            .retrieve(query, self.top_k)
            .map_err(|e| CagError::external("retrieve", e))?;

        if self.document_relevancy_filter {
            info!("Generating answer with document relevancy filter");
            context = AnswerValidator::new(self.llm.as_ref()).grade_relevance(&context, query)?;
        } else {
            info!("Generating answer without document relevancy filter");
        }

        let answer = self
            .llm
            .answer_question(&context, query)
            .map_err(|e| CagError::external("answer_question", e))?;

        self.history.push(QaRecord {
            query: query.to_string(),
            answer: answer.clone(),
            context,
            scores,
        });
        info!("Query answered successfully");
        Ok(answer)
    }

    /// Past exchanges, oldest first
    pub fn history(&self) -> &[QaRecord] {
        &self.history
    }

    /// Context used for the most recent answer
    pub fn last_context(&self) -> Option<&[String]> {
        self.history.last().map(|record| record.context.as_slice())
    }
}

/// Retrieval with grading, web fallback and a hallucination gate
pub struct AgenticRag {
    llm: Arc<dyn LanguageModel>,
    vector_store: Option<Arc<dyn VectorStore>>,
    web_search: Option<Arc<dyn WebSearch>>,
    pub top_k: usize,
}

impl AgenticRag {
    pub fn new(llm: Arc<dyn LanguageModel>) -> Self {
        Self {
            llm,
            vector_store: None,
            web_search: None,
            top_k: 5,
        }
    }

    pub fn with_vector_store(mut self, store: Arc<dyn VectorStore>) -> Self {
        self.vector_store = Some(store);
        self
    }

    pub fn with_web_search(mut self, search: Arc<dyn WebSearch>) -> Self {
        self.web_search = Some(search);
        self
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    /// Answer `query`, searching the web when no stored document is relevant
    pub fn run(&self, query: &str) -> Result<String> {
        require_query(query)?;
        let validator = AnswerValidator::new(self.llm.as_ref());

        let mut context = Vec::new();
        if let Some(store) = &self.vector_store {
            let (documents, _scores) = store
                .retrieve(query, self.top_k)
                .map_err(|e| CagError::external("retrieve", e))?;
            if !documents.is_empty() {
                context = validator.grade_or_ungraded(&documents, query).into_value();
            }
        }

        if context.is_empty() {
            info!("No relevant document found, searching the web");
            context = WebFallback::new(self.web_search.as_deref())
                .search(query)
                .into_value();
        }

        let answer = self
            .llm
            .answer_question(&context, query)
            .map_err(|e| CagError::external("answer_question", e))?;

        match validator.is_hallucination(&context, &answer) {
            Ok(false) => {
                info!("Not hallucinated");
                Ok(answer)
            }
            Ok(true) => {
                info!("Hallucination detected, regenerating the answer");
                match self.llm.answer_question(&context, query) {
                    Ok(regenerated) => Ok(regenerated),
                    Err(e) => {
                        warn!(
                            "Error regenerating answer, keeping the draft: {}",
                            CagError::external("answer_question", e)
                        );
                        Ok(answer)
                    }
                }
            }
            Err(e) => {
                warn!("Error in hallucination check, keeping the answer: {}", e);
                Ok(answer)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Echo;

    impl LanguageModel for Echo {
        fn generate(&self, prompt: &str) -> anyhow::Result<String> {
            Ok(prompt.to_string())
        }

        fn answer_question(&self, context: &[String], _question: &str) -> anyhow::Result<String> {
            Ok(context.join(" | "))
        }

        fn check_hallucination(&self, _context: &[String], _answer: &str) -> anyhow::Result<String> {
            Ok("no".to_string())
        }

        fn grade_docs(&self, context: &[String], _question: &str) -> anyhow::Result<Vec<String>> {
            Ok(context.iter().filter(|d| d.starts_with("good")).cloned().collect())
        }
    }

    struct Fixed;

    impl VectorStore for Fixed {
        fn retrieve(&self, _query: &str, top_k: usize) -> anyhow::Result<(Vec<String>, Vec<f32>)> {
            let docs = vec!["good one".to_string(), "bad two".to_string()];
            let scores = vec![0.9, 0.4];
            Ok((
                docs.into_iter().take(top_k).collect(),
                scores.into_iter().take(top_k).collect(),
            ))
        }
    }

    #[test]
    fn test_question_answer_records_history() {
        let mut qa = QuestionAnswer::new(Arc::new(Echo), Arc::new(Fixed)).with_relevancy_filter(true);

        let answer = qa.invoke("anything").unwrap();
        assert_eq!(answer, "good one");
        assert_eq!(qa.history().len(), 1);
        assert_eq!(qa.history()[0].scores, vec![0.9, 0.4]);
        assert_eq!(qa.last_context(), Some(&["good one".to_string()][..]));
    }

    #[test]
    fn test_question_answer_without_filter() {
        let mut qa = QuestionAnswer::new(Arc::new(Echo), Arc::new(Fixed)).with_top_k(1);
        assert_eq!(qa.invoke("anything").unwrap(), "good one");

        let mut qa = QuestionAnswer::new(Arc::new(Echo), Arc::new(Fixed));
        assert_eq!(qa.invoke("anything").unwrap(), "good one | bad two");
    }

    #[test]
    fn test_empty_query_rejected() {
        let mut qa = QuestionAnswer::new(Arc::new(Echo), Arc::new(Fixed));
        assert!(matches!(qa.invoke("  "), Err(CagError::InvalidConfiguration(_))));
        assert!(qa.history().is_empty());

        let agentic = AgenticRag::new(Arc::new(Echo));
        assert!(matches!(agentic.run(""), Err(CagError::InvalidConfiguration(_))));
    }

    #[test]
    fn test_agentic_uses_graded_store_context() {
        let agentic = AgenticRag::new(Arc::new(Echo)).with_vector_store(Arc::new(Fixed));
        assert_eq!(agentic.run("q").unwrap(), "good one");
    }
}
