//! Hand-written HNSW (Hierarchical Navigable Small World) graph index.
//!
//! A multi-layer proximity graph over unit-norm vectors supporting
//! incremental insertion, sublinear approximate nearest-neighbor search,
//! and true deletion. Nodes are held in a map keyed by external string id;
//! per-node edges are per-layer lists of ids, so the cyclic graph needs no
//! pointer bookkeeping and deletion is a symmetric set operation.
//!
//! # Parameters
//!
//! - **M**: max bidirectional links per node on layers above 0. The layer-0
//!   cap is `2 * M` per standard practice (denser base layer).
//! - **ef_construction**: beam width while inserting.
//! - **ef_search**: beam width on layer 0 while querying (passed per call).
//!
//! Levels are drawn from a geometric distribution with multiplier
//! `mL = 1 / ln(M)`; the entry point is always a node of the highest level.
//!
//! Reference: "Efficient and robust approximate nearest neighbor search
//! using Hierarchical Navigable Small World graphs" by Malkov & Yashunin
//! (2018). arXiv:1603.09320

use crate::error::{validate_dimension, EngineError};
use crate::search::vector::cosine_distance;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet};
use std::sync::Arc;
use tracing::debug;

/// Default RNG seed for level assignment.
///
/// A fixed seed makes graph construction, and therefore retrieval, fully
/// reproducible for a fixed insertion order.
const DEFAULT_RNG_SEED: u64 = 0x10d3_570e;

/// `f32` distance wrapper with a total order for use in binary heaps.
#[derive(Debug, Clone, Copy, PartialEq)]
struct OrderedDist(f32);

impl Eq for OrderedDist {}

impl PartialOrd for OrderedDist {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OrderedDist {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0
            .partial_cmp(&other.0)
            .unwrap_or(std::cmp::Ordering::Equal)
    }
}

/// A single graph node: its vector, top layer, and per-layer neighbor lists.
///
/// The vector is shared with the document store through `Arc`, never copied
/// per layer. `neighbors[l]` is the edge list on layer `l` for
/// `l in 0..=level`.
#[derive(Debug, Clone)]
struct HnswNode {
    vector: Arc<[f32]>,
    level: usize,
    neighbors: Vec<Vec<String>>,
}

/// HNSW graph index over unit-norm vectors keyed by external string id.
#[derive(Debug)]
pub struct HnswIndex {
    nodes: HashMap<String, HnswNode>,
    /// Id of the node with the highest level; `None` when the graph is empty.
    entry_point: Option<String>,
    /// Level of the entry point; 0 when the graph is empty.
    max_layer: usize,
    dimension: usize,
    /// Neighbor cap on layers above 0.
    m_max: usize,
    /// Neighbor cap on layer 0 (`2 * M`).
    m_max0: usize,
    /// Level multiplier `1 / ln(M)`.
    ml: f64,
    ef_construction: usize,
    rng: StdRng,
}

impl HnswIndex {
    /// Creates an empty graph with default parameters.
    pub fn new(dimension: usize) -> Self {
        Self::with_params(
            dimension,
            crate::config::DEFAULT_M,
            crate::config::DEFAULT_EF_CONSTRUCTION,
        )
    }

    /// Creates an empty graph with explicit `M` and `ef_construction`.
    ///
    /// `m` must be at least 2 (the level multiplier is `1 / ln(m)`).
    pub fn with_params(dimension: usize, m: usize, ef_construction: usize) -> Self {
        debug_assert!(m >= 2, "M must be at least 2");
        Self {
            nodes: HashMap::new(),
            entry_point: None,
            max_layer: 0,
            dimension,
            m_max: m,
            m_max0: 2 * m,
            ml: 1.0 / (m as f64).ln(),
            ef_construction,
            rng: StdRng::seed_from_u64(DEFAULT_RNG_SEED),
        }
    }

    /// Replaces the level-assignment RNG seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Number of nodes in the graph.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` if the graph holds no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Returns `true` if `id` is present in the graph.
    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    /// The vector dimension this graph was created with.
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Draws a level from the geometric distribution: `⌊-ln(U) * mL⌋` with
    /// `U` uniform on `(0, 1]`.
    fn random_level(&mut self) -> usize {
        let u: f64 = 1.0 - self.rng.random::<f64>();
        (-u.ln() * self.ml).floor() as usize
    }

    /// Beam search on a single layer.
    ///
    /// Returns up to `ef` nearest neighbors of `query` as `(id, distance)`
    /// sorted by distance ascending. Distance ties are broken by insertion
    /// order into the working set, so results are stable for a fixed graph.
    fn search_layer(
        &self,
        query: &[f32],
        entry_points: &[String],
        ef: usize,
        layer: usize,
    ) -> Vec<(String, f32)> {
        let mut visited: HashSet<&str> = HashSet::new();
        // Min-heap of candidates to expand; max-heap of the working set.
        // The sequence number makes heap order deterministic under ties and
        // lets the working set evict later insertions first.
        let mut candidates: BinaryHeap<Reverse<(OrderedDist, u64, &str)>> = BinaryHeap::new();
        let mut found: BinaryHeap<(OrderedDist, u64, &str)> = BinaryHeap::new();
        let mut seq: u64 = 0;

        for ep in entry_points {
            let Some((id, node)) = self.nodes.get_key_value(ep.as_str()) else {
                continue;
            };
            if !visited.insert(id.as_str()) {
                continue;
            }
            let dist = OrderedDist(cosine_distance(query, &node.vector));
            candidates.push(Reverse((dist, seq, id.as_str())));
            found.push((dist, seq, id.as_str()));
            seq += 1;
        }
        while found.len() > ef {
            found.pop();
        }

        while let Some(Reverse((c_dist, _, c_id))) = candidates.pop() {
            let farthest = found.peek().map(|(d, _, _)| *d).unwrap_or(OrderedDist(f32::INFINITY));
            if c_dist > farthest {
                break;
            }
            let Some(node) = self.nodes.get(c_id) else {
                continue;
            };
            let Some(neighbors) = node.neighbors.get(layer) else {
                continue;
            };
            for n in neighbors {
                let Some((id, neighbor)) = self.nodes.get_key_value(n.as_str()) else {
                    continue;
                };
                if !visited.insert(id.as_str()) {
                    continue;
                }
                let dist = OrderedDist(cosine_distance(query, &neighbor.vector));
                let farthest = found.peek().map(|(d, _, _)| *d).unwrap_or(OrderedDist(f32::INFINITY));
                if found.len() < ef || dist < farthest {
                    candidates.push(Reverse((dist, seq, id.as_str())));
                    found.push((dist, seq, id.as_str()));
                    seq += 1;
                    while found.len() > ef {
                        found.pop();
                    }
                }
            }
        }

        found
            .into_sorted_vec()
            .into_iter()
            .map(|(dist, _, id)| (id.to_string(), dist.0))
            .collect()
    }

    /// Inserts a vector under `id`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::DimensionMismatch`] if the vector has the
    /// wrong dimension and [`EngineError::DuplicateNode`] if the id is
    /// already present.
    pub fn insert(&mut self, id: &str, vector: Arc<[f32]>) -> Result<(), EngineError> {
        validate_dimension(self.dimension, vector.len())?;
        if self.nodes.contains_key(id) {
            return Err(EngineError::DuplicateNode(id.to_string()));
        }

        let level = self.random_level();

        let Some(entry) = self.entry_point.clone() else {
            // First node: it becomes the entry point at its drawn level.
            self.nodes.insert(
                id.to_string(),
                HnswNode {
                    vector,
                    level,
                    neighbors: vec![Vec::new(); level + 1],
                },
            );
            self.entry_point = Some(id.to_string());
            self.max_layer = level;
            return Ok(());
        };

        let top = self.max_layer;

        // Phase 1: greedy descent from the top layer to one above the new
        // node's level, narrowing to the single closest node per layer.
        let mut ep = vec![entry];
        for layer in (level + 1..=top).rev() {
            if let Some((best, _)) = self.search_layer(&vector, &ep, 1, layer).into_iter().next() {
                ep = vec![best];
            }
        }

        // Phase 2: on each layer from min(level, top) down to 0, run the
        // construction beam and connect to the nearest candidates.
        let mut selected_per_layer: Vec<(usize, Vec<String>)> = Vec::new();
        for layer in (0..=level.min(top)).rev() {
            let max_conn = if layer == 0 { self.m_max0 } else { self.m_max };
            let candidates = self.search_layer(&vector, &ep, self.ef_construction, layer);
            let selected: Vec<String> = candidates
                .into_iter()
                .take(max_conn)
                .map(|(nid, _)| nid)
                .collect();
            ep = selected.clone();
            selected_per_layer.push((layer, selected));
        }

        let mut neighbors = vec![Vec::new(); level + 1];
        for (layer, selected) in &selected_per_layer {
            neighbors[*layer] = selected.clone();
        }
        self.nodes.insert(
            id.to_string(),
            HnswNode {
                vector,
                level,
                neighbors,
            },
        );

        // Back-edges, pruning any neighbor that overflows its layer cap.
        for (layer, selected) in selected_per_layer {
            let max_conn = if layer == 0 { self.m_max0 } else { self.m_max };
            for n in selected {
                let Some(node) = self.nodes.get_mut(&n) else {
                    continue;
                };
                let Some(list) = node.neighbors.get_mut(layer) else {
                    continue;
                };
                if !list.iter().any(|x| x.as_str() == id) {
                    list.push(id.to_string());
                    if list.len() > max_conn {
                        self.prune_neighbors(&n, layer, max_conn);
                    }
                }
            }
        }

        if level > top {
            debug!(id, level, "new entry point");
            self.entry_point = Some(id.to_string());
            self.max_layer = level;
        }
        Ok(())
    }

    /// Trims a node's layer edge list to its `max_conn` nearest neighbors.
    ///
    /// Dropped edges are removed from both endpoints so every edge in the
    /// graph stays bidirectional.
    fn prune_neighbors(&mut self, id: &str, layer: usize, max_conn: usize) {
        let Some(node) = self.nodes.get(id) else {
            return;
        };
        let anchor = node.vector.clone();
        let Some(list) = node.neighbors.get(layer) else {
            return;
        };

        let mut scored: Vec<(String, f32)> = list
            .iter()
            .filter_map(|n| {
                self.nodes
                    .get(n)
                    .map(|other| (n.clone(), cosine_distance(&anchor, &other.vector)))
            })
            .collect();
        // Stable sort keeps earlier-inserted edges ahead on distance ties.
        scored.sort_by(|a, b| {
            a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal)
        });

        let retained: Vec<String> = scored
            .iter()
            .take(max_conn)
            .map(|(n, _)| n.clone())
            .collect();
        let dropped: Vec<String> = scored
            .iter()
            .skip(max_conn)
            .map(|(n, _)| n.clone())
            .collect();

        if let Some(node) = self.nodes.get_mut(id) {
            if let Some(list) = node.neighbors.get_mut(layer) {
                *list = retained;
            }
        }
        for d in dropped {
            if let Some(other) = self.nodes.get_mut(&d) {
                if let Some(list) = other.neighbors.get_mut(layer) {
                    list.retain(|x| x.as_str() != id);
                }
            }
        }
    }

    /// Approximate k-nearest-neighbor search.
    ///
    /// Descends greedily from the entry point to layer 1, then runs a
    /// `max(ef_search, k)`-wide beam on layer 0. Returns up to `k`
    /// `(id, similarity)` pairs sorted by similarity descending, where
    /// `similarity = 1 - cosine_distance`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::DimensionMismatch`] for a wrong-sized query.
    pub fn search(
        &self,
        query: &[f32],
        k: usize,
        ef_search: usize,
    ) -> Result<Vec<(String, f32)>, EngineError> {
        validate_dimension(self.dimension, query.len())?;
        let Some(entry) = self.entry_point.clone() else {
            return Ok(Vec::new());
        };

        let mut ep = vec![entry];
        for layer in (1..=self.max_layer).rev() {
            if let Some((best, _)) = self.search_layer(query, &ep, 1, layer).into_iter().next() {
                ep = vec![best];
            }
        }

        let mut results = self.search_layer(query, &ep, ef_search.max(k), 0);
        results.truncate(k);
        Ok(results
            .into_iter()
            .map(|(id, dist)| (id, 1.0 - dist))
            .collect())
    }

    /// Removes `id` from the graph, unlinking it from every layer.
    ///
    /// Returns `false` if the id was not present. If the removed node was
    /// the entry point, a surviving node of the highest level becomes the
    /// new entry point (smallest id among ties, so re-election is
    /// deterministic).
    pub fn remove(&mut self, id: &str) -> bool {
        let Some(node) = self.nodes.remove(id) else {
            return false;
        };

        for (layer, neighbors) in node.neighbors.iter().enumerate() {
            for n in neighbors {
                if let Some(other) = self.nodes.get_mut(n) {
                    if let Some(list) = other.neighbors.get_mut(layer) {
                        list.retain(|x| x.as_str() != id);
                    }
                }
            }
        }

        if self.entry_point.as_deref() == Some(id) {
            let mut best: Option<(&String, usize)> = None;
            for (nid, n) in &self.nodes {
                let better = match best {
                    None => true,
                    Some((bid, blevel)) => {
                        n.level > blevel || (n.level == blevel && nid < bid)
                    }
                };
                if better {
                    best = Some((nid, n.level));
                }
            }
            match best {
                Some((nid, level)) => {
                    debug!(old = id, new = %nid, "entry point re-elected");
                    self.entry_point = Some(nid.clone());
                    self.max_layer = level;
                }
                None => {
                    self.entry_point = None;
                    self.max_layer = 0;
                }
            }
        }
        true
    }

    /// Drops every node and resets the entry point.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.entry_point = None;
        self.max_layer = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit(values: &[f32]) -> Arc<[f32]> {
        let norm: f32 = values.iter().map(|x| x * x).sum::<f32>().sqrt();
        values.iter().map(|x| x / norm).collect::<Vec<_>>().into()
    }

    fn random_unit(rng: &mut StdRng, dim: usize) -> Arc<[f32]> {
        let v: Vec<f32> = (0..dim).map(|_| rng.random::<f32>() - 0.5).collect();
        unit(&v)
    }

    /// Checks the structural invariants: bidirectional edges, per-layer
    /// cardinality caps, edges pointing at live nodes, no self-loops, and
    /// entry-point consistency.
    fn assert_invariants(index: &HnswIndex) {
        for (id, node) in &index.nodes {
            assert_eq!(node.neighbors.len(), node.level + 1);
            for (layer, neighbors) in node.neighbors.iter().enumerate() {
                let cap = if layer == 0 { index.m_max0 } else { index.m_max };
                assert!(
                    neighbors.len() <= cap,
                    "layer {} of '{}' exceeds cap: {} > {}",
                    layer,
                    id,
                    neighbors.len(),
                    cap
                );
                for n in neighbors {
                    assert_ne!(n, id, "self-loop at '{}'", id);
                    let other = index.nodes.get(n).expect("edge to missing node");
                    assert!(
                        other.neighbors[layer].contains(id),
                        "edge {}->{} on layer {} is not bidirectional",
                        id,
                        n,
                        layer
                    );
                }
            }
        }
        match &index.entry_point {
            Some(ep) => {
                let node = index.nodes.get(ep).expect("entry point missing");
                assert_eq!(node.level, index.max_layer);
                assert!(index.nodes.values().all(|n| n.level <= index.max_layer));
            }
            None => {
                assert!(index.nodes.is_empty());
                assert_eq!(index.max_layer, 0);
            }
        }
    }

    #[test]
    fn test_insert_and_search() {
        let mut index = HnswIndex::new(3);
        index.insert("a", unit(&[1.0, 0.0, 0.0])).unwrap();
        index.insert("b", unit(&[0.0, 1.0, 0.0])).unwrap();
        index.insert("c", unit(&[0.9, 0.1, 0.0])).unwrap();

        let results = index.search(&[1.0, 0.0, 0.0], 2, 64).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].0, "a");
        assert_eq!(results[1].0, "c");
        assert!(results[0].1 > 0.99);
    }

    #[test]
    fn test_search_empty() {
        let index = HnswIndex::new(3);
        assert!(index.search(&[1.0, 0.0, 0.0], 5, 64).unwrap().is_empty());
    }

    #[test]
    fn test_duplicate_insert_rejected() {
        let mut index = HnswIndex::new(3);
        index.insert("a", unit(&[1.0, 0.0, 0.0])).unwrap();
        let err = index.insert("a", unit(&[0.0, 1.0, 0.0])).unwrap_err();
        assert!(matches!(err, EngineError::DuplicateNode(_)));
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_dimension_mismatch() {
        let mut index = HnswIndex::new(3);
        let err = index.insert("a", unit(&[1.0, 0.0])).unwrap_err();
        assert!(matches!(err, EngineError::DimensionMismatch { expected: 3, actual: 2 }));

        index.insert("a", unit(&[1.0, 0.0, 0.0])).unwrap();
        assert!(index.search(&[1.0, 0.0], 1, 64).is_err());
    }

    #[test]
    fn test_remove_unlinks_node() {
        let mut index = HnswIndex::new(3);
        index.insert("a", unit(&[1.0, 0.0, 0.0])).unwrap();
        index.insert("b", unit(&[0.9, 0.1, 0.0])).unwrap();
        index.insert("c", unit(&[0.0, 1.0, 0.0])).unwrap();

        assert!(index.remove("b"));
        assert!(!index.remove("b"));
        assert_eq!(index.len(), 2);
        assert!(!index.contains("b"));
        assert_invariants(&index);

        let results = index.search(&[0.9, 0.1, 0.0], 3, 64).unwrap();
        assert!(results.iter().all(|(id, _)| id != "b"));
    }

    #[test]
    fn test_remove_entry_point_re_elects() {
        let mut index = HnswIndex::new(4);
        let mut rng = StdRng::seed_from_u64(7);
        for i in 0..30 {
            index
                .insert(&format!("n{}", i), random_unit(&mut rng, 4))
                .unwrap();
        }
        let entry = index.entry_point.clone().unwrap();
        assert!(index.remove(&entry));
        assert_invariants(&index);
        assert_eq!(index.len(), 29);
        // The graph stays searchable through the new entry point.
        let results = index.search(&[0.5, 0.5, 0.5, 0.5], 5, 64).unwrap();
        assert_eq!(results.len(), 5);
    }

    #[test]
    fn test_invariants_under_churn() {
        let mut index = HnswIndex::with_params(8, 4, 20);
        let mut rng = StdRng::seed_from_u64(11);
        for i in 0..200 {
            index
                .insert(&format!("d{}", i), random_unit(&mut rng, 8))
                .unwrap();
        }
        assert_invariants(&index);

        for i in (0..200).step_by(3) {
            assert!(index.remove(&format!("d{}", i)));
        }
        assert_invariants(&index);
        assert_eq!(index.len(), 200 - 67);

        // Insertions after deletions keep the structure sound.
        for i in 200..240 {
            index
                .insert(&format!("d{}", i), random_unit(&mut rng, 8))
                .unwrap();
        }
        assert_invariants(&index);
    }

    #[test]
    fn test_self_recall() {
        let mut index = HnswIndex::new(16);
        let mut rng = StdRng::seed_from_u64(3);
        let mut vectors = Vec::new();
        for i in 0..50 {
            let v = random_unit(&mut rng, 16);
            index.insert(&format!("v{}", i), v.clone()).unwrap();
            vectors.push(v);
        }
        for (i, v) in vectors.iter().enumerate() {
            let results = index.search(v, 1, 64).unwrap();
            assert_eq!(results[0].0, format!("v{}", i));
            assert!(results[0].1 > 0.99);
        }
    }

    #[test]
    fn test_scores_sorted_descending_and_in_range() {
        let mut index = HnswIndex::new(8);
        let mut rng = StdRng::seed_from_u64(5);
        for i in 0..100 {
            index
                .insert(&format!("x{}", i), random_unit(&mut rng, 8))
                .unwrap();
        }
        let query = random_unit(&mut rng, 8);
        let results = index.search(&query, 10, 64).unwrap();
        assert_eq!(results.len(), 10);
        for pair in results.windows(2) {
            assert!(pair[0].1 >= pair[1].1);
        }
        for (_, score) in &results {
            assert!(*score >= -1.0 - 1e-5 && *score <= 1.0 + 1e-5);
        }
    }

    #[test]
    fn test_deterministic_construction() {
        let build = || {
            let mut index = HnswIndex::new(8);
            let mut rng = StdRng::seed_from_u64(9);
            for i in 0..120 {
                index
                    .insert(&format!("k{}", i), random_unit(&mut rng, 8))
                    .unwrap();
            }
            index
        };
        let a = build();
        let b = build();
        let mut rng = StdRng::seed_from_u64(21);
        for _ in 0..10 {
            let query = random_unit(&mut rng, 8);
            assert_eq!(
                a.search(&query, 5, 64).unwrap(),
                b.search(&query, 5, 64).unwrap()
            );
        }
    }

    #[test]
    fn test_clear() {
        let mut index = HnswIndex::new(3);
        index.insert("a", unit(&[1.0, 0.0, 0.0])).unwrap();
        index.insert("b", unit(&[0.0, 1.0, 0.0])).unwrap();
        index.clear();
        assert!(index.is_empty());
        assert!(index.entry_point.is_none());
        assert_eq!(index.max_layer, 0);
        assert!(index.search(&[1.0, 0.0, 0.0], 1, 64).unwrap().is_empty());
    }
}
