//! Hybrid keyword/semantic fusion power.

use super::{Power, SearchContext};
use crate::error::EngineError;
use crate::search::fusion::{weighted_reciprocal_rank_fusion, RRF_K};
use crate::search::keyword::KeywordIndex;
use crate::search::types::{Document, Metadata, SearchResult};
use std::collections::HashMap;
use tracing::warn;

/// Fuses the engine's semantic ranking with BM25 keyword ranking.
///
/// The power maintains its own BM25 inverted index and a captured copy of
/// each document's content and metadata, kept in sync through the add,
/// delete, and clear hooks. `after_search` runs BM25 for the query and
/// merges both rankings with weighted reciprocal rank fusion:
///
/// - `alpha = 1.0` reproduces the pure semantic ranking
/// - `alpha = 0.0` lets exact keyword matches take over
/// - the default `0.5` weighs both equally
///
/// The keyword side retrieves `max(top_k, 10) * 3` candidates so documents
/// outside the semantic short-list can still surface; fused results missing
/// from the semantic list are hydrated from the captured copy.
pub struct HybridSearch {
    alpha: f32,
    index: KeywordIndex,
    captured: HashMap<String, (String, Metadata)>,
}

impl HybridSearch {
    /// Creates the power with `alpha = 0.5` and default BM25 parameters.
    pub fn new() -> Self {
        Self {
            alpha: 0.5,
            index: KeywordIndex::new(),
            captured: HashMap::new(),
        }
    }

    /// Sets the semantic weight. Clamped to `[0, 1]`.
    #[must_use]
    pub fn with_alpha(mut self, alpha: f32) -> Self {
        self.alpha = alpha.clamp(0.0, 1.0);
        self
    }

    /// Sets the BM25 `k1` and `b` parameters.
    ///
    /// Only meaningful before any documents are indexed.
    #[must_use]
    pub fn with_bm25_params(mut self, k1: f32, b: f32) -> Self {
        self.index = KeywordIndex::with_params(k1, b);
        self
    }

    /// Number of documents in the keyword index.
    pub fn indexed_len(&self) -> usize {
        self.index.len()
    }
}

impl Default for HybridSearch {
    fn default() -> Self {
        Self::new()
    }
}

impl Power for HybridSearch {
    fn name(&self) -> &str {
        "hybrid-search"
    }

    fn after_add(&mut self, docs: &[Document]) -> Result<(), EngineError> {
        for doc in docs {
            self.index.add(&doc.id, &doc.content);
            self.captured
                .insert(doc.id.clone(), (doc.content.clone(), doc.metadata.clone()));
        }
        Ok(())
    }

    fn after_search(
        &mut self,
        ctx: &SearchContext,
        results: Vec<SearchResult>,
    ) -> Result<Vec<SearchResult>, EngineError> {
        let candidate_k = ctx.top_k.max(10) * 3;
        let keyword: Vec<(String, f32)> = self.index.search(&ctx.query, candidate_k);
        let semantic: Vec<(String, f32)> = results
            .iter()
            .map(|result| (result.id.clone(), result.score))
            .collect();

        let fused = weighted_reciprocal_rank_fusion(&semantic, &keyword, RRF_K, self.alpha);

        let by_id: HashMap<&str, &SearchResult> = results
            .iter()
            .map(|result| (result.id.as_str(), result))
            .collect();

        let mut merged = Vec::with_capacity(ctx.top_k);
        for (id, score) in fused.into_iter().take(ctx.top_k) {
            if let Some(&semantic_hit) = by_id.get(id.as_str()) {
                merged.push(SearchResult {
                    id,
                    content: semantic_hit.content.clone(),
                    metadata: semantic_hit.metadata.clone(),
                    score,
                });
            } else if let Some((content, metadata)) = self.captured.get(&id) {
                merged.push(SearchResult {
                    id,
                    content: content.clone(),
                    metadata: metadata.clone(),
                    score,
                });
            } else {
                warn!(id = %id, "fused result has no stored copy, skipping");
            }
        }
        Ok(merged)
    }

    fn on_delete(&mut self, id: &str) -> Result<(), EngineError> {
        self.index.remove(id);
        self.captured.remove(id);
        Ok(())
    }

    fn on_clear(&mut self) -> Result<(), EngineError> {
        self.index.clear();
        self.captured.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(id: &str, content: &str) -> Document {
        Document::new(id, content)
    }

    fn semantic_result(id: &str, content: &str, score: f32) -> SearchResult {
        SearchResult {
            id: id.to_string(),
            content: content.to_string(),
            metadata: Metadata::new(),
            score,
        }
    }

    #[test]
    fn test_alpha_zero_promotes_exact_keyword_match() {
        let mut hybrid = HybridSearch::new().with_alpha(0.0);
        hybrid
            .after_add(&[
                doc("match", "zygote cell biology embryo fertilisation"),
                doc("nomatch", "machine learning neural network transformer"),
            ])
            .unwrap();

        // Semantic ranking puts the wrong document first.
        let ctx = SearchContext::new("zygote", 2);
        let results = vec![
            semantic_result("nomatch", "machine learning neural network transformer", 0.9),
            semantic_result("match", "zygote cell biology embryo fertilisation", 0.1),
        ];
        let fused = hybrid.after_search(&ctx, results).unwrap();
        assert_eq!(fused[0].id, "match");
    }

    #[test]
    fn test_alpha_one_preserves_semantic_ranking() {
        let mut hybrid = HybridSearch::new().with_alpha(1.0);
        hybrid
            .after_add(&[doc("a", "alpha content"), doc("b", "beta content")])
            .unwrap();

        let ctx = SearchContext::new("content", 2);
        let results = vec![
            semantic_result("a", "alpha content", 0.9),
            semantic_result("b", "beta content", 0.5),
        ];
        let fused = hybrid.after_search(&ctx, results).unwrap();
        assert_eq!(fused[0].id, "a");
        assert_eq!(fused[1].id, "b");
    }

    #[test]
    fn test_keyword_only_hits_hydrate_from_captured_copy() {
        let mut hybrid = HybridSearch::new().with_alpha(0.0);
        hybrid
            .after_add(&[doc("kw", "unique sesquipedalian token")])
            .unwrap();

        // The semantic list never saw "kw".
        let ctx = SearchContext::new("sesquipedalian", 5);
        let fused = hybrid.after_search(&ctx, vec![]).unwrap();
        assert_eq!(fused.len(), 1);
        assert_eq!(fused[0].id, "kw");
        assert_eq!(fused[0].content, "unique sesquipedalian token");
    }

    #[test]
    fn test_delete_and_clear_reset_state() {
        let mut hybrid = HybridSearch::new();
        hybrid
            .after_add(&[doc("1", "first entry"), doc("2", "second entry")])
            .unwrap();
        assert_eq!(hybrid.indexed_len(), 2);

        hybrid.on_delete("1").unwrap();
        assert_eq!(hybrid.indexed_len(), 1);
        assert!(!hybrid.captured.contains_key("1"));

        hybrid.on_clear().unwrap();
        assert_eq!(hybrid.indexed_len(), 0);
        assert!(hybrid.captured.is_empty());
    }

    #[test]
    fn test_result_count_capped_at_top_k() {
        let mut hybrid = HybridSearch::new();
        let docs: Vec<Document> = (0..8)
            .map(|i| doc(&format!("d{}", i), &format!("shared words item{}", i)))
            .collect();
        hybrid.after_add(&docs).unwrap();

        let ctx = SearchContext::new("shared words", 3);
        let results: Vec<SearchResult> = (0..8)
            .map(|i| {
                semantic_result(
                    &format!("d{}", i),
                    &format!("shared words item{}", i),
                    1.0 - i as f32 * 0.1,
                )
            })
            .collect();
        let fused = hybrid.after_search(&ctx, results).unwrap();
        assert_eq!(fused.len(), 3);
        for pair in fused.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
    }
}
