//! Embedder override power.

use super::Power;
use crate::embedding::Embedder;
use crate::error::EngineError;

struct FnEmbedder {
    dimension: usize,
    embed: Box<dyn Fn(&[&str]) -> Result<Vec<Vec<f32>>, EngineError> + Send + Sync>,
}

impl Embedder for FnEmbedder {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EngineError> {
        (self.embed)(texts)
    }
}

/// Wraps a caller-supplied embedding function as a power.
///
/// The engine resolves embedders last-writer-wins: the most recently
/// registered power that supplies one is used, falling back to the built-in
/// embedder when none does. To register several overrides at once (only the
/// latest takes effect), give each a distinct name via [`named`](Self::named).
///
/// The function must honor the [`Embedder`] contract: one unit-norm vector
/// of the engine dimension per input text.
pub struct EmbeddingSwap {
    name: String,
    embedder: FnEmbedder,
}

impl EmbeddingSwap {
    /// Wraps `embed` under the default power name `embedding-swap`.
    pub fn new(
        dimension: usize,
        embed: impl Fn(&[&str]) -> Result<Vec<Vec<f32>>, EngineError> + Send + Sync + 'static,
    ) -> Self {
        Self::named("embedding-swap", dimension, embed)
    }

    /// Wraps `embed` under an explicit power name.
    pub fn named(
        name: impl Into<String>,
        dimension: usize,
        embed: impl Fn(&[&str]) -> Result<Vec<Vec<f32>>, EngineError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            embedder: FnEmbedder {
                dimension,
                embed: Box::new(embed),
            },
        }
    }
}

impl Power for EmbeddingSwap {
    fn name(&self) -> &str {
        &self.name
    }

    fn embedder(&self) -> Option<&dyn Embedder> {
        Some(&self.embedder)
    }
}
