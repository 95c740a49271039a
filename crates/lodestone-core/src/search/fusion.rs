//! Weighted Reciprocal Rank Fusion (RRF).

use std::collections::HashMap;
use std::hash::Hash;

/// Standard RRF k parameter value from the literature.
///
/// The recommended value (60) comes from "Reciprocal Rank Fusion
/// outperforms Condorcet and individual Rank Learning Methods" by Cormack,
/// Clarke, and Buettcher (SIGIR 2009). Smaller k emphasizes top ranks;
/// larger k flattens the weighting.
pub const RRF_K: usize = 60;

/// Fuses a semantic ranking and a keyword ranking by weighted RRF.
///
/// Formula: `fused(d) = alpha / (k + rank_sem(d)) + (1 - alpha) / (k +
/// rank_kw(d))` with 1-indexed ranks; an item absent from a list simply
/// contributes nothing for that list. `alpha = 1.0` reproduces the semantic
/// ordering, `alpha = 0.0` the keyword ordering.
///
/// The input scores are ignored — RRF is rank-based by design, which makes
/// it robust to the incomparable score scales of the two retrievers.
/// Returns every item seen in either list, sorted by fused score descending
/// with ties broken by id so the output is deterministic.
pub fn weighted_reciprocal_rank_fusion<T: Clone + Eq + Hash + Ord>(
    semantic: &[(T, f32)],
    keyword: &[(T, f32)],
    k: usize,
    alpha: f32,
) -> Vec<(T, f32)> {
    let k_param = k as f32;
    let mut fused: HashMap<T, f32> = HashMap::new();

    for (rank, (item, _score)) in semantic.iter().enumerate() {
        let contribution = alpha / (k_param + (rank + 1) as f32);
        *fused.entry(item.clone()).or_insert(0.0) += contribution;
    }
    for (rank, (item, _score)) in keyword.iter().enumerate() {
        let contribution = (1.0 - alpha) / (k_param + (rank + 1) as f32);
        *fused.entry(item.clone()).or_insert(0.0) += contribution;
    }

    let mut combined: Vec<(T, f32)> = fused.into_iter().collect();
    combined.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.0.cmp(&b.0))
    });
    combined
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_items_in_both_lists_rank_highest() {
        let semantic = vec![(1, 0.9), (2, 0.8), (3, 0.7)];
        let keyword = vec![(3, 10.0), (1, 8.0), (4, 5.0)];

        let fused = weighted_reciprocal_rank_fusion(&semantic, &keyword, RRF_K, 0.5);

        let top: Vec<i32> = fused.iter().take(2).map(|(id, _)| *id).collect();
        assert!(top.contains(&1));
        assert!(top.contains(&3));
    }

    #[test]
    fn test_alpha_one_preserves_semantic_order() {
        let semantic = vec![(1, 0.9), (2, 0.8), (3, 0.7)];
        let keyword = vec![(3, 10.0), (2, 8.0), (1, 5.0)];

        let fused = weighted_reciprocal_rank_fusion(&semantic, &keyword, RRF_K, 1.0);

        let order: Vec<i32> = fused.iter().take(3).map(|(id, _)| *id).collect();
        assert_eq!(order, vec![1, 2, 3]);
    }

    #[test]
    fn test_alpha_zero_preserves_keyword_order() {
        let semantic = vec![(1, 0.9), (2, 0.8)];
        let keyword = vec![(2, 10.0), (5, 8.0), (1, 5.0)];

        let fused = weighted_reciprocal_rank_fusion(&semantic, &keyword, RRF_K, 0.0);

        let order: Vec<i32> = fused.iter().take(3).map(|(id, _)| *id).collect();
        assert_eq!(order, vec![2, 5, 1]);
    }

    #[test]
    fn test_symmetric_ranks_tie() {
        let semantic = vec![(1, 0.9), (2, 0.8)];
        let keyword = vec![(2, 10.0), (1, 8.0)];

        let fused = weighted_reciprocal_rank_fusion(&semantic, &keyword, RRF_K, 0.5);

        let score1 = fused.iter().find(|(id, _)| *id == 1).map(|(_, s)| *s).unwrap();
        let score2 = fused.iter().find(|(id, _)| *id == 2).map(|(_, s)| *s).unwrap();
        assert!((score1 - score2).abs() < 1e-6);
    }

    #[test]
    fn test_empty_inputs() {
        let empty: Vec<(i32, f32)> = vec![];
        let keyword = vec![(1, 1.0), (2, 0.9)];

        let fused = weighted_reciprocal_rank_fusion(&empty, &keyword, RRF_K, 0.5);
        assert_eq!(fused.len(), 2);
        assert_eq!(fused[0].0, 1);

        let fused = weighted_reciprocal_rank_fusion(&empty, &empty, RRF_K, 0.5);
        assert!(fused.is_empty());
    }

    #[test]
    fn test_scores_ignored_ranks_used() {
        // Wildly different score scales must not influence the fusion.
        let semantic = vec![(1, 100.0), (2, 0.01)];
        let keyword = vec![(2, 0.99), (1, 0.01)];

        let fused = weighted_reciprocal_rank_fusion(&semantic, &keyword, RRF_K, 0.5);
        let score1 = fused.iter().find(|(id, _)| *id == 1).map(|(_, s)| *s).unwrap();
        let score2 = fused.iter().find(|(id, _)| *id == 2).map(|(_, s)| *s).unwrap();
        assert!((score1 - score2).abs() < 1e-6);
    }
}
