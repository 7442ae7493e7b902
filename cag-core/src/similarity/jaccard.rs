//! Jaccard index over whitespace token sets

use super::{whitespace_tokens, SimilarityScorer};
use std::collections::HashSet;

/// Jaccard scorer: `|q ∩ d| / |q ∪ d|`, or 0 when both sets are empty
#[derive(Debug, Clone, Copy, Default)]
pub struct JaccardScorer;

impl SimilarityScorer for JaccardScorer {
    fn name(&self) -> &'static str {
        "jaccard"
    }

    fn score(&self, query: &str, documents: &[&str]) -> Vec<f32> {
        let query_tokens: HashSet<&str> = whitespace_tokens(query).collect();

        documents
            .iter()
            .map(|doc| {
                let doc_tokens: HashSet<&str> = whitespace_tokens(doc).collect();
                let union = query_tokens.union(&doc_tokens).count();
                if union == 0 {
                    return 0.0;
                }
                let intersection = query_tokens.intersection(&doc_tokens).count();
                intersection as f32 / union as f32
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_query_and_document() {
        assert_eq!(JaccardScorer.score("", &[""]), vec![0.0]);
    }

    #[test]
    fn test_partial_overlap() {
        let scores = JaccardScorer.score("a b c", &["b c d", "x y", "a b c"]);
        assert_eq!(scores, vec![0.5, 0.0, 1.0]);
    }

    #[test]
    fn test_duplicate_tokens_count_once() {
        let scores = JaccardScorer.score("a a a", &["a"]);
        assert_eq!(scores, vec![1.0]);
    }

    #[test]
    fn test_case_sensitive_tokens() {
        let scores = JaccardScorer.score("Paris", &["paris"]);
        assert_eq!(scores, vec![0.0]);
    }
}
