//! Multi-query retrieval: ask the model for alternative phrasings and pool
//! what each one retrieves

use crate::cache::CacheEntry;
use crate::error::{CagError, Result};
use crate::providers::LanguageModel;
use crate::retriever::{rank, RelevanceRetriever};
use crate::similarity::SearchType;
use std::collections::HashSet;
use tracing::{debug, info};

/// Number of alternative queries requested from the model
pub const GENERATED_QUERIES: usize = 3;

/// Multi-query retrieval over loaded cache entries
#[derive(Clone, Copy)]
pub struct MultiQueryRetriever<'a> {
    llm: &'a dyn LanguageModel,
    retriever: RelevanceRetriever<'a>,
}

impl<'a> MultiQueryRetriever<'a> {
    pub fn new(llm: &'a dyn LanguageModel, retriever: RelevanceRetriever<'a>) -> Self {
        Self { llm, retriever }
    }

    /// Alternative queries for `query`, falling back to `query` itself
    pub fn generate_queries(&self, query: &str) -> Result<Vec<String>> {
        let prompt = format!(
            "Generate {} different queries to gather information for answering the following question: {}",
            GENERATED_QUERIES, query
        );
        let response = self
            .llm
            .generate(&prompt)
            .map_err(|e| CagError::external("generate", e))?;

        let queries = parse_queries(&response);
        if queries.is_empty() {
            info!("No alternative queries generated, using the original query");
            return Ok(vec![query.to_string()]);
        }
        debug!("Generated queries: {:?}", queries);
        Ok(queries)
    }

    /// Retrieve for every generated query and pool the results
    ///
    /// Each query contributes up to `top_k` texts; the first occurrence of a
    /// text wins.
    pub fn retrieve(
        &self,
        query: &str,
        entries: &[CacheEntry],
        top_k: usize,
        threshold: f32,
        search_type: SearchType,
    ) -> Result<Vec<String>> {
        let queries = self.generate_queries(query)?;

        let mut seen = HashSet::new();
        let mut pooled = Vec::new();
        for generated in &queries {
            if entries.is_empty() || top_k == 0 {
                break;
            }
            let mode = self.retriever.scoring_mode(generated, search_type)?;
            for text in rank(generated, entries, top_k, threshold, &mode) {
                if seen.insert(text.clone()) {
                    pooled.push(text);
                }
            }
        }

        info!(
            "Multi-query retrieval pooled {} texts from {} queries",
            pooled.len(),
            queries.len()
        );
        Ok(pooled)
    }
}

/// One query per non-empty line, list markers stripped
fn parse_queries(response: &str) -> Vec<String> {
    response
        .lines()
        .map(strip_list_marker)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

fn strip_list_marker(line: &str) -> &str {
    let line = line.trim();
    if let Some(rest) = line.strip_prefix(['-', '*']) {
        return rest.trim_start();
    }

    let digits = line.chars().take_while(char::is_ascii_digit).count();
    if digits > 0 {
        if let Some(rest) = line[digits..].strip_prefix(['.', ')']) {
            return rest.trim_start();
        }
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct Rephraser {
        response: &'static str,
        prompts: Mutex<Vec<String>>,
    }

    impl Rephraser {
        fn new(response: &'static str) -> Self {
            Self {
                response,
                prompts: Mutex::new(Vec::new()),
            }
        }
    }

    impl LanguageModel for Rephraser {
        fn generate(&self, prompt: &str) -> anyhow::Result<String> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            Ok(self.response.to_string())
        }

        fn answer_question(&self, _context: &[String], _question: &str) -> anyhow::Result<String> {
            Ok(String::new())
        }

        fn check_hallucination(&self, _context: &[String], _answer: &str) -> anyhow::Result<String> {
            Ok("no".to_string())
        }

        fn grade_docs(&self, context: &[String], _question: &str) -> anyhow::Result<Vec<String>> {
            Ok(context.to_vec())
        }
    }

    #[test]
    fn test_parse_queries() {
        let parsed = parse_queries("1. capital of France\n\n- French capital city\n* Paris\n2) where is Paris\nplain");
        assert_eq!(
            parsed,
            vec![
                "capital of France",
                "French capital city",
                "Paris",
                "where is Paris",
                "plain"
            ]
        );
    }

    #[test]
    fn test_marker_only_lines_are_dropped() {
        assert!(parse_queries("1.\n-\n   \n").is_empty());
        assert_eq!(strip_list_marker("2024 was a year"), "2024 was a year");
    }

    #[test]
    fn test_prompt_and_fallback() {
        let llm = Rephraser::new("\n  \n");
        let multi = MultiQueryRetriever::new(&llm, RelevanceRetriever::lexical());

        let queries = multi.generate_queries("What is CAG?").unwrap();
        assert_eq!(queries, vec!["What is CAG?".to_string()]);

        let prompts = llm.prompts.lock().unwrap();
        assert_eq!(
            prompts[0],
            "Generate 3 different queries to gather information for answering the following question: What is CAG?"
        );
    }

    #[test]
    fn test_pooled_results_are_deduplicated() {
        let llm = Rephraser::new("paris france\nfrance capital\nberlin");
        let multi = MultiQueryRetriever::new(&llm, RelevanceRetriever::lexical());
        let entries = vec![
            CacheEntry::new("paris is in france"),
            CacheEntry::new("berlin is in germany"),
        ];

        let pooled = multi
            .retrieve("q", &entries, 1, 0.1, SearchType::Jaccard)
            .unwrap();
        assert_eq!(
            pooled,
            vec!["paris is in france".to_string(), "berlin is in germany".to_string()]
        );
    }
}
