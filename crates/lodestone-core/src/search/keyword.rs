//! BM25 inverted index for keyword ranking.
//!
//! A hand-maintained Okapi BM25 index: postings per term with term
//! frequencies, per-document token counts, and document frequencies, all
//! kept symmetric under add and remove so the index can mirror a mutating
//! document store.
//!
//! # Algorithm
//!
//! Documents are scored per query term by
//! `idf(t) * tf * (k1 + 1) / (tf + k1 * (1 - b + b * dl / avgdl))` with
//! `idf(t) = ln((N - df + 0.5) / (df + 0.5) + 1)`, summed over terms.
//! `k1` controls term-frequency saturation and `b` document-length
//! normalization.

use crate::config::{BM25_B, BM25_K1};
use std::collections::{HashMap, HashSet};

/// Splits text into lowercase word tokens.
///
/// Runs of characters that are neither word characters (alphanumeric or
/// `_`) nor whitespace become separators, and tokens of length ≤ 1 are
/// dropped. Shared by the keyword index and the built-in embedder so both
/// see the same vocabulary.
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '_' || c.is_whitespace() {
                c
            } else {
                ' '
            }
        })
        .collect::<String>()
        .split_whitespace()
        .filter(|token| token.chars().count() > 1)
        .map(str::to_string)
        .collect()
}

/// In-memory BM25 inverted index keyed by document id.
#[derive(Debug, Default)]
pub struct KeywordIndex {
    /// term → (doc id → term frequency)
    term_index: HashMap<String, HashMap<String, usize>>,
    /// doc id → unique terms, for fast removal
    doc_terms: HashMap<String, HashSet<String>>,
    /// doc id → token count
    doc_lengths: HashMap<String, usize>,
    /// term → number of documents containing it
    doc_freq: HashMap<String, usize>,
    /// Σ doc_lengths
    total_doc_length: usize,
    k1: f32,
    b: f32,
}

impl KeywordIndex {
    /// Creates an empty index with the default `k1`/`b` parameters.
    pub fn new() -> Self {
        Self::with_params(BM25_K1, BM25_B)
    }

    /// Creates an empty index with explicit `k1`/`b` parameters.
    pub fn with_params(k1: f32, b: f32) -> Self {
        Self {
            term_index: HashMap::new(),
            doc_terms: HashMap::new(),
            doc_lengths: HashMap::new(),
            doc_freq: HashMap::new(),
            total_doc_length: 0,
            k1,
            b,
        }
    }

    /// Number of indexed documents.
    pub fn len(&self) -> usize {
        self.doc_lengths.len()
    }

    /// Returns `true` if nothing is indexed.
    pub fn is_empty(&self) -> bool {
        self.doc_lengths.is_empty()
    }

    /// Indexes a document's content under `id` (upsert semantics).
    ///
    /// Re-adding an existing id first removes the old postings so the
    /// frequency bookkeeping never double-counts.
    pub fn add(&mut self, id: &str, content: &str) {
        self.remove(id);

        let tokens = tokenize(content);
        let mut frequencies: HashMap<String, usize> = HashMap::new();
        for token in &tokens {
            *frequencies.entry(token.clone()).or_insert(0) += 1;
        }

        self.doc_lengths.insert(id.to_string(), tokens.len());
        self.total_doc_length += tokens.len();
        self.doc_terms
            .insert(id.to_string(), frequencies.keys().cloned().collect());

        for (term, tf) in frequencies {
            *self.doc_freq.entry(term.clone()).or_insert(0) += 1;
            self.term_index
                .entry(term)
                .or_default()
                .insert(id.to_string(), tf);
        }
    }

    /// Removes a document, dropping empty postings lists and zero document
    /// frequencies. Returns `false` if the id was not indexed.
    pub fn remove(&mut self, id: &str) -> bool {
        let Some(terms) = self.doc_terms.remove(id) else {
            return false;
        };
        if let Some(length) = self.doc_lengths.remove(id) {
            self.total_doc_length -= length;
        }
        for term in terms {
            if let Some(postings) = self.term_index.get_mut(&term) {
                postings.remove(id);
                if postings.is_empty() {
                    self.term_index.remove(&term);
                }
            }
            if let Some(df) = self.doc_freq.get_mut(&term) {
                *df -= 1;
                if *df == 0 {
                    self.doc_freq.remove(&term);
                }
            }
        }
        true
    }

    /// Resets the index to empty.
    pub fn clear(&mut self) {
        self.term_index.clear();
        self.doc_terms.clear();
        self.doc_lengths.clear();
        self.doc_freq.clear();
        self.total_doc_length = 0;
    }

    /// Scores the corpus against `query` and returns the top `k` documents
    /// as `(id, score)` sorted by score descending (ties by id, so the
    /// ranking is deterministic).
    pub fn search(&self, query: &str, k: usize) -> Vec<(String, f32)> {
        let n = self.doc_lengths.len();
        if n == 0 {
            return Vec::new();
        }
        let avg_dl = (self.total_doc_length as f32 / n as f32).max(1.0);

        let mut scores: HashMap<&str, f32> = HashMap::new();
        for term in tokenize(query) {
            let Some(&df) = self.doc_freq.get(&term) else {
                continue;
            };
            let idf = ((n as f32 - df as f32 + 0.5) / (df as f32 + 0.5) + 1.0).ln();
            let Some(postings) = self.term_index.get(&term) else {
                continue;
            };
            for (doc_id, &tf) in postings {
                let dl = self.doc_lengths.get(doc_id).copied().unwrap_or(0) as f32;
                let tf = tf as f32;
                let norm = tf * (self.k1 + 1.0)
                    / (tf + self.k1 * (1.0 - self.b + self.b * dl / avg_dl));
                *scores.entry(doc_id.as_str()).or_insert(0.0) += idf * norm;
            }
        }

        let mut ranked: Vec<(String, f32)> = scores
            .into_iter()
            .map(|(id, score)| (id.to_string(), score))
            .collect();
        ranked.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });
        ranked.truncate(k);
        ranked
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Bookkeeping consistency: Σ doc_lengths == total_doc_length and
    /// doc_freq matches the postings lists exactly.
    fn assert_consistent(index: &KeywordIndex) {
        let length_sum: usize = index.doc_lengths.values().sum();
        assert_eq!(length_sum, index.total_doc_length);
        assert_eq!(index.doc_freq.len(), index.term_index.len());
        for (term, postings) in &index.term_index {
            assert!(!postings.is_empty());
            assert_eq!(index.doc_freq.get(term), Some(&postings.len()));
        }
    }

    #[test]
    fn test_tokenize_lowercases_and_strips_punctuation() {
        assert_eq!(
            tokenize("Hello, World! This-is a test: 42"),
            vec!["hello", "world", "this", "is", "test", "42"]
        );
    }

    #[test]
    fn test_tokenize_drops_single_char_tokens() {
        assert_eq!(tokenize("a b cd e fg"), vec!["cd", "fg"]);
        assert!(tokenize("! ? .").is_empty());
    }

    #[test]
    fn test_tokenize_keeps_underscores() {
        assert_eq!(tokenize("snake_case value"), vec!["snake_case", "value"]);
    }

    #[test]
    fn test_term_frequency_ranks_higher() {
        let mut index = KeywordIndex::new();
        index.add("1", "rust programming");
        index.add("2", "rust rust rust is a programming language");
        index.add("3", "python programming");

        let results = index.search("rust", 3);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].0, "2");
        assert_eq!(results[1].0, "1");
        assert!(results[0].1 > results[1].1);
    }

    #[test]
    fn test_rare_terms_outweigh_common() {
        let mut index = KeywordIndex::new();
        index.add("1", "shared zygote shared shared");
        index.add("2", "shared words shared everywhere");
        index.add("3", "shared again shared");

        // "zygote" appears in one document; it dominates the shared term.
        let results = index.search("zygote", 3);
        assert_eq!(results[0].0, "1");
    }

    #[test]
    fn test_remove_restores_bookkeeping() {
        let mut index = KeywordIndex::new();
        index.add("1", "the quick brown fox");
        index.add("2", "the lazy dog");
        assert_consistent(&index);

        assert!(index.remove("1"));
        assert!(!index.remove("1"));
        assert_consistent(&index);
        assert_eq!(index.len(), 1);
        assert!(index.search("quick", 10).is_empty());

        assert!(index.remove("2"));
        assert_consistent(&index);
        assert!(index.is_empty());
        assert_eq!(index.total_doc_length, 0);
        assert!(index.term_index.is_empty());
    }

    #[test]
    fn test_upsert_does_not_double_count() {
        let mut index = KeywordIndex::new();
        index.add("1", "alpha beta gamma");
        index.add("1", "alpha delta");
        assert_consistent(&index);
        assert_eq!(index.len(), 1);
        assert_eq!(index.doc_freq.get("alpha"), Some(&1));
        assert!(index.doc_freq.get("beta").is_none());
    }

    #[test]
    fn test_empty_query_and_empty_index() {
        let mut index = KeywordIndex::new();
        assert!(index.search("anything", 10).is_empty());
        index.add("1", "some content");
        assert!(index.search("", 10).is_empty());
        assert!(index.search("?!", 10).is_empty());
    }

    #[test]
    fn test_top_k_truncation() {
        let mut index = KeywordIndex::new();
        for i in 0..10 {
            index.add(&format!("d{}", i), &format!("common token number{}", i));
        }
        let results = index.search("common token", 3);
        assert_eq!(results.len(), 3);
    }

    #[test]
    fn test_scores_descending() {
        let mut index = KeywordIndex::new();
        index.add("1", "apple banana cherry");
        index.add("2", "apple banana");
        index.add("3", "apple");
        let results = index.search("apple banana cherry", 3);
        for pair in results.windows(2) {
            assert!(pair[0].1 >= pair[1].1);
        }
    }

    #[test]
    fn test_clear() {
        let mut index = KeywordIndex::new();
        index.add("1", "alpha beta");
        index.clear();
        assert!(index.is_empty());
        assert_eq!(index.total_doc_length, 0);
        assert!(index.search("alpha", 5).is_empty());
        assert_consistent(&index);
    }
}
