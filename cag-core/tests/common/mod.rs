//! Stub collaborators shared by the integration tests

#![allow(dead_code)]

use anyhow::{anyhow, Result};
use cag_core::{EmbeddingModel, LanguageModel, WebSearch};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// How the stub model grades documents
#[derive(Debug, Clone, Copy)]
pub enum Grading {
    KeepAll,
    KeepNone,
    Fail,
}

/// Language model with scripted behaviour that records every call
pub struct StubLlm {
    pub grading: Grading,
    /// Verdicts returned by successive hallucination checks; "fail" errors
    pub verdicts: Mutex<Vec<&'static str>>,
    pub generated: &'static str,
    pub fail_answers: bool,

    pub answer_contexts: Mutex<Vec<Vec<String>>>,
    pub generate_calls: AtomicUsize,
    pub grade_calls: AtomicUsize,
    pub check_calls: AtomicUsize,
}

impl StubLlm {
    pub fn new() -> Self {
        Self {
            grading: Grading::KeepAll,
            verdicts: Mutex::new(Vec::new()),
            generated: "",
            fail_answers: false,
            answer_contexts: Mutex::new(Vec::new()),
            generate_calls: AtomicUsize::new(0),
            grade_calls: AtomicUsize::new(0),
            check_calls: AtomicUsize::new(0),
        }
    }

    pub fn grading(mut self, grading: Grading) -> Self {
        self.grading = grading;
        self
    }

    pub fn verdicts(self, verdicts: &[&'static str]) -> Self {
        *self.verdicts.lock().unwrap() = verdicts.iter().rev().copied().collect();
        self
    }

    pub fn generating(mut self, response: &'static str) -> Self {
        self.generated = response;
        self
    }

    pub fn failing_answers(mut self) -> Self {
        self.fail_answers = true;
        self
    }

    pub fn answer_calls(&self) -> usize {
        self.answer_contexts.lock().unwrap().len()
    }

    pub fn last_answer_context(&self) -> Option<Vec<String>> {
        self.answer_contexts.lock().unwrap().last().cloned()
    }
}

impl LanguageModel for StubLlm {
    fn generate(&self, _prompt: &str) -> Result<String> {
        self.generate_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.generated.to_string())
    }

    fn answer_question(&self, context: &[String], question: &str) -> Result<String> {
        self.answer_contexts.lock().unwrap().push(context.to_vec());
        if self.fail_answers {
            return Err(anyhow!("model unavailable"));
        }
        Ok(format!("answer to {}", question))
    }

    fn check_hallucination(&self, _context: &[String], _answer: &str) -> Result<String> {
        self.check_calls.fetch_add(1, Ordering::SeqCst);
        match self.verdicts.lock().unwrap().pop() {
            Some("fail") => Err(anyhow!("checker unavailable")),
            Some(verdict) => Ok(verdict.to_string()),
            None => Ok("no".to_string()),
        }
    }

    fn grade_docs(&self, context: &[String], _question: &str) -> Result<Vec<String>> {
        self.grade_calls.fetch_add(1, Ordering::SeqCst);
        match self.grading {
            Grading::KeepAll => Ok(context.to_vec()),
            Grading::KeepNone => Ok(Vec::new()),
            Grading::Fail => Err(anyhow!("grader unavailable")),
        }
    }
}

/// Two-dimensional embedder keyed on marker words
///
/// Texts mentioning any of `first_axis` map to `[1, 0]`, everything else to
/// `[0, 1]`.
pub struct StubEmbedder {
    pub first_axis: Vec<&'static str>,
    pub fail: bool,
    pub short_batch: bool,
    pub non_finite: bool,
    pub query_calls: AtomicUsize,
    pub document_calls: AtomicUsize,
}

impl StubEmbedder {
    pub fn new(first_axis: &[&'static str]) -> Self {
        Self {
            first_axis: first_axis.to_vec(),
            fail: false,
            short_batch: false,
            non_finite: false,
            query_calls: AtomicUsize::new(0),
            document_calls: AtomicUsize::new(0),
        }
    }

    fn vector(&self, text: &str) -> Vec<f32> {
        if self.first_axis.iter().any(|word| text.contains(word)) {
            vec![1.0, 0.0]
        } else {
            vec![0.0, 1.0]
        }
    }
}

impl EmbeddingModel for StubEmbedder {
    fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        self.query_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.vector(text))
    }

    fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.document_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(anyhow!("embedding model offline"));
        }
        let mut vectors: Vec<Vec<f32>> = texts.iter().map(|t| self.vector(t)).collect();
        if self.short_batch {
            vectors.pop();
        }
        if self.non_finite {
            if let Some(first) = vectors.first_mut() {
                first[0] = f32::NAN;
            }
        }
        Ok(vectors)
    }
}

/// Web search returning fixed snippets
pub struct StubWeb {
    pub results: Vec<String>,
    pub fail: bool,
    pub calls: AtomicUsize,
}

impl StubWeb {
    pub fn new(results: &[&str]) -> Self {
        Self {
            results: results.iter().map(|r| r.to_string()).collect(),
            fail: false,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new(&[])
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl WebSearch for StubWeb {
    fn search(&self, _query: &str) -> Result<Vec<String>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(anyhow!("search engine unreachable"));
        }
        Ok(self.results.clone())
    }
}

pub fn geo_chunks() -> Vec<String> {
    vec![
        "Paris is the capital of France.".to_string(),
        "Berlin is the capital of Germany.".to_string(),
    ]
}
