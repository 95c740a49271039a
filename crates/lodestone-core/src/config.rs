//! Engine configuration and tuning constants.
//!
//! The constants here define the default operating point of the engine and
//! are shared by the library, the tests, and the benchmarks so all three
//! measure the same configuration.

// =============================================================================
// Embedding
// =============================================================================

/// Embedding vector dimension.
///
/// Every stored vector and every query vector has this length. The built-in
/// token-hash embedder produces vectors of this dimension; swapped embedders
/// must match it.
pub const EMBEDDING_DIM: usize = 384;

/// Tolerance for the unit-norm contract on stored vectors.
///
/// Embedders are required to produce L2-normalized output (`Σv² = 1`). The
/// engine relies on this to use the dot product as cosine similarity and
/// does not renormalize.
pub const UNIT_NORM_TOLERANCE: f32 = 1e-4;

// =============================================================================
// HNSW graph
// =============================================================================

/// Max bidirectional links per node on layers above 0 (the `M` parameter).
///
/// Range 12-48 is typical; 16 is the recommendation from the HNSW paper
/// (Malkov & Yashunin, 2018) for balanced recall/memory.
pub const DEFAULT_M: usize = 16;

/// Beam width while inserting into the graph.
pub const DEFAULT_EF_CONSTRUCTION: usize = 40;

/// Beam width on layer 0 while querying the graph.
///
/// Searches use `max(ef_search, k)` so large `k` never starves the beam.
pub const DEFAULT_EF_SEARCH: usize = 64;

/// Store size above which queries route to the graph instead of exact scan.
///
/// Below this size a brute-force pass over every stored vector is both exact
/// and fast enough; above it the graph's sublinear search wins.
pub const DEFAULT_ANN_THRESHOLD: usize = 2000;

// =============================================================================
// BM25
// =============================================================================

/// BM25 term-frequency saturation parameter.
pub const BM25_K1: f32 = 1.5;

/// BM25 document-length normalization parameter.
pub const BM25_B: f32 = 0.75;

/// Engine construction parameters.
///
/// All fields have production defaults; override individual values with the
/// `with_*` builders.
///
/// # Example
///
/// ```
/// use lodestone_core::config::EngineConfig;
///
/// let config = EngineConfig::default()
///     .with_ann_threshold(100)
///     .with_ef_search(128);
/// assert_eq!(config.ann_threshold, 100);
/// ```
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Maintain the HNSW graph and route large-store queries to it.
    pub use_ann: bool,
    /// Store size above which queries use the graph.
    pub ann_threshold: usize,
    /// HNSW `M` parameter (layer-0 cap is `2 * m`).
    pub m: usize,
    /// HNSW insertion beam width.
    pub ef_construction: usize,
    /// HNSW query beam width.
    pub ef_search: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            use_ann: true,
            ann_threshold: DEFAULT_ANN_THRESHOLD,
            m: DEFAULT_M,
            ef_construction: DEFAULT_EF_CONSTRUCTION,
            ef_search: DEFAULT_EF_SEARCH,
        }
    }
}

impl EngineConfig {
    /// Enable or disable the ANN graph entirely.
    ///
    /// With `use_ann = false` every query is an exact scan and no graph is
    /// maintained.
    #[must_use]
    pub fn with_use_ann(mut self, use_ann: bool) -> Self {
        self.use_ann = use_ann;
        self
    }

    /// Set the store size above which queries route to the graph.
    #[must_use]
    pub fn with_ann_threshold(mut self, threshold: usize) -> Self {
        self.ann_threshold = threshold;
        self
    }

    /// Set the HNSW `M` parameter. Must be at least 2.
    #[must_use]
    pub fn with_m(mut self, m: usize) -> Self {
        self.m = m;
        self
    }

    /// Set the insertion beam width.
    #[must_use]
    pub fn with_ef_construction(mut self, ef: usize) -> Self {
        self.ef_construction = ef;
        self
    }

    /// Set the query beam width.
    #[must_use]
    pub fn with_ef_search(mut self, ef: usize) -> Self {
        self.ef_search = ef;
        self
    }
}
