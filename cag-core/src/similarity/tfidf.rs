//! TF-IDF cosine similarity
//!
//! The query and the documents are vectorized together: document frequency
//! is counted over `{query} ∪ documents`, idf is smoothed as
//! `ln((1 + n) / (1 + df)) + 1`, and every row is L2-normalized, so the dot
//! product of two rows is their cosine similarity.

use super::{word_tokens, SimilarityScorer};
use std::collections::{BTreeMap, HashMap, HashSet};

/// TF-IDF scorer
#[derive(Debug, Clone, Copy, Default)]
pub struct TfIdfScorer;

impl SimilarityScorer for TfIdfScorer {
    fn name(&self) -> &'static str {
        "tfidf"
    }

    fn score(&self, query: &str, documents: &[&str]) -> Vec<f32> {
        if documents.is_empty() {
            return Vec::new();
        }

        let corpus: Vec<Vec<String>> = std::iter::once(query)
            .chain(documents.iter().copied())
            .map(word_tokens)
            .collect();

        let mut document_frequency: HashMap<&str, usize> = HashMap::new();
        for tokens in &corpus {
            let unique: HashSet<&str> = tokens.iter().map(String::as_str).collect();
            for token in unique {
                *document_frequency.entry(token).or_insert(0) += 1;
            }
        }

        let n = corpus.len() as f64;
        let idf = |token: &str| -> f64 {
            let df = document_frequency.get(token).copied().unwrap_or(0) as f64;
            ((1.0 + n) / (1.0 + df)).ln() + 1.0
        };

        let vectors: Vec<BTreeMap<&str, f64>> = corpus
            .iter()
            .map(|tokens| {
                let mut term_counts: BTreeMap<&str, f64> = BTreeMap::new();
                for token in tokens {
                    *term_counts.entry(token.as_str()).or_insert(0.0) += 1.0;
                }
                for (token, weight) in term_counts.iter_mut() {
                    *weight *= idf(*token);
                }
                normalize(term_counts)
            })
            .collect();

        let Some((query_vector, document_vectors)) = vectors.split_first() else {
            return vec![0.0; documents.len()];
        };

        document_vectors
            .iter()
            .map(|doc_vector| dot(query_vector, doc_vector) as f32)
            .collect()
    }
}

fn normalize(mut vector: BTreeMap<&str, f64>) -> BTreeMap<&str, f64> {
    let norm = vector.values().map(|w| w * w).sum::<f64>().sqrt();
    if norm > 0.0 {
        for weight in vector.values_mut() {
            *weight /= norm;
        }
    }
    vector
}

fn dot(a: &BTreeMap<&str, f64>, b: &BTreeMap<&str, f64>) -> f64 {
    let (small, large) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    small
        .iter()
        .filter_map(|(token, weight)| large.get(token).map(|other| weight * other))
        .sum()
}
