//! Okapi BM25 over whitespace tokens
//!
//! Matches the classic `BM25Okapi` formulation: idf is
//! `ln(N - df + 0.5) - ln(df + 0.5)`, and terms whose idf comes out negative
//! are floored to `epsilon * mean(idf)`. Query terms absent from the corpus
//! contribute nothing.

use super::{whitespace_tokens, SimilarityScorer};
use std::collections::{BTreeMap, HashMap};

/// BM25 scorer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bm25Scorer {
    /// Term-frequency saturation
    pub k1: f64,
    /// Length normalization
    pub b: f64,
    /// Floor for negative idf, as a fraction of the mean idf
    pub epsilon: f64,
}

impl Bm25Scorer {
    /// The usual Okapi parameters
    pub const OKAPI: Bm25Scorer = Bm25Scorer {
        k1: 1.5,
        b: 0.75,
        epsilon: 0.25,
    };
}

impl Default for Bm25Scorer {
    fn default() -> Self {
        Self::OKAPI
    }
}

impl SimilarityScorer for Bm25Scorer {
    fn name(&self) -> &'static str {
        "bm25"
    }

    fn score(&self, query: &str, documents: &[&str]) -> Vec<f32> {
        if documents.is_empty() {
            return Vec::new();
        }

        let term_frequencies: Vec<HashMap<&str, f64>> = documents
            .iter()
            .map(|doc| {
                let mut frequencies = HashMap::new();
                for token in whitespace_tokens(doc) {
                    *frequencies.entry(token).or_insert(0.0) += 1.0;
                }
                frequencies
            })
            .collect();
        let doc_lengths: Vec<f64> = documents
            .iter()
            .map(|doc| whitespace_tokens(doc).count() as f64)
            .collect();

        let corpus_size = documents.len() as f64;
        let avg_doc_length = doc_lengths.iter().sum::<f64>() / corpus_size;
        let idf = self.inverse_document_frequencies(&term_frequencies, corpus_size);

        term_frequencies
            .iter()
            .zip(&doc_lengths)
            .map(|(frequencies, &doc_length)| {
                let mut score = 0.0;
                for term in whitespace_tokens(query) {
                    let tf = frequencies.get(term).copied().unwrap_or(0.0);
                    if tf == 0.0 {
                        continue;
                    }
                    let term_idf = idf.get(term).copied().unwrap_or(0.0);
                    let length_norm = 1.0 - self.b + self.b * doc_length / avg_doc_length;
                    score += term_idf * (tf * (self.k1 + 1.0)) / (tf + self.k1 * length_norm);
                }
                score as f32
            })
            .collect()
    }
}

impl Bm25Scorer {
    fn inverse_document_frequencies<'a>(
        &self,
        term_frequencies: &[HashMap<&'a str, f64>],
        corpus_size: f64,
    ) -> BTreeMap<&'a str, f64> {
        let mut document_frequency: BTreeMap<&str, f64> = BTreeMap::new();
        for frequencies in term_frequencies {
            for term in frequencies.keys() {
                *document_frequency.entry(*term).or_insert(0.0) += 1.0;
            }
        }

        let mut idf = BTreeMap::new();
        let mut idf_sum = 0.0;
        let mut negative = Vec::new();
        for (term, df) in document_frequency {
            let value = (corpus_size - df + 0.5).ln() - (df + 0.5).ln();
            idf_sum += value;
            if value < 0.0 {
                negative.push(term);
            }
            idf.insert(term, value);
        }

        if !idf.is_empty() {
            let floor = self.epsilon * idf_sum / idf.len() as f64;
            for term in negative {
                idf.insert(term, floor);
            }
        }

        idf
    }
}
