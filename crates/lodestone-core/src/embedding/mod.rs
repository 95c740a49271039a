//! Embedding abstractions and the built-in token-hash embedder.
//!
//! The [`Embedder`] trait is the seam through which embedding
//! implementations are swapped without changing dependent code: the engine
//! resolves one embedder per operation (a registered power's, or the
//! built-in default) and calls it with the whole batch at once.

use crate::error::EngineError;
use crate::search::keyword::tokenize;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Trait for text embedding.
///
/// # Contract
///
/// Implementations must return one vector per input text, each of
/// [`dimension()`](Embedder::dimension) length and L2-normalized (unit
/// norm). The engine relies on unit-norm output to use the dot product as
/// cosine similarity and does not renormalize.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`; a caller may guard a whole engine
/// behind one reader/writer lock and move it across threads.
pub trait Embedder: Send + Sync {
    /// Returns the embedding dimension (vector length).
    fn dimension(&self) -> usize;

    /// Embeds a batch of texts, one vector per input in input order.
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EngineError>;

    /// Embeds a single text.
    fn embed(&self, text: &str) -> Result<Vec<f32>, EngineError> {
        let mut batch = self.embed_batch(&[text])?;
        batch
            .pop()
            .ok_or_else(|| EngineError::Embedding("embedder returned no vectors".to_string()))
    }
}

/// Deterministic hash-based embedder used when no power supplies one.
///
/// Each word token is hashed; the low bits pick a position and the high
/// bits a value, accumulated and L2-normalized. It captures exact-word
/// overlap rather than meaning, which is enough for a pluggable default:
/// swap in a model-backed embedder for semantic quality.
#[derive(Debug, Clone)]
pub struct TokenHashEmbedder {
    dimension: usize,
}

impl TokenHashEmbedder {
    /// Creates an embedder producing vectors of `dimension` length.
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut embedding = vec![0.0f32; self.dimension];

        for token in tokenize(text) {
            let mut hasher = DefaultHasher::new();
            token.hash(&mut hasher);
            let hash = hasher.finish();

            let position = (hash as usize) % self.dimension;
            let value = ((hash >> 32) as f32) / (u32::MAX as f32);
            embedding[position] += value;
        }

        let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut embedding {
                *x /= norm;
            }
        } else {
            // No tokens survived tokenization; a fixed basis vector keeps
            // the unit-norm contract.
            embedding[0] = 1.0;
        }
        embedding
    }
}

impl Default for TokenHashEmbedder {
    fn default() -> Self {
        Self::new(crate::config::EMBEDDING_DIM)
    }
}

impl Embedder for TokenHashEmbedder {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EngineError> {
        Ok(texts.iter().map(|text| self.embed_one(text)).collect())
    }
}
