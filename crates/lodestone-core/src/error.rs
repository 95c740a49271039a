//! Error types for lodestone-core.

use thiserror::Error;

/// Errors raised by the search engine and its indexes.
#[derive(Debug, Clone, Error)]
pub enum EngineError {
    /// Vector dimension mismatch (expected vs actual)
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Expected vector dimension
        expected: usize,
        /// Actual vector dimension received
        actual: usize,
    },
    /// A node with this id is already present in the graph
    #[error("Node '{0}' already exists in the graph")]
    DuplicateNode(String),
    /// A power with this name is already registered
    #[error("Power '{0}' is already registered")]
    DuplicatePower(String),
    /// Embedder failure; propagated unchanged to the caller
    #[error("Embedding failed: {0}")]
    Embedding(String),
    /// A power hook failed; aborts the triggering operation
    #[error("Power hook failed: {0}")]
    Hook(String),
}

/// Validates that a vector has the expected dimension.
///
/// Returns `Err(EngineError::DimensionMismatch)` otherwise.
pub fn validate_dimension(expected: usize, actual: usize) -> Result<(), EngineError> {
    if actual == expected {
        Ok(())
    } else {
        Err(EngineError::DimensionMismatch { expected, actual })
    }
}
