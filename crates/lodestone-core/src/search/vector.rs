//! Dense vector primitives for unit-norm embeddings.
//!
//! All stored vectors are L2-normalized by contract (see
//! [`UNIT_NORM_TOLERANCE`](crate::config::UNIT_NORM_TOLERANCE)), so the dot
//! product *is* the cosine similarity and no magnitudes are computed on the
//! query path.

/// Dot product of two equal-length vectors.
///
/// For unit-norm inputs this equals their cosine similarity, in `[-1, 1]`.
#[inline]
pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len());
    a.iter().zip(b.iter()).map(|(&x, &y)| x * y).sum()
}

/// Cosine distance between two unit-norm vectors: `1 - dot(a, b)`.
///
/// Ranges over `[0, 2]`; 0 means identical direction.
#[inline]
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    1.0 - dot(a, b)
}
