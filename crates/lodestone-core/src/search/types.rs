//! Core data-model types.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Arbitrary per-document metadata.
pub type Metadata = HashMap<String, serde_json::Value>;

/// A document to be indexed.
///
/// `id` is caller-supplied and unique across the store; adding a document
/// under an existing id overwrites the stored entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Caller-supplied unique identifier
    pub id: String,
    /// Text content (embedded for vector search, tokenized for keyword search)
    pub content: String,
    /// Associated metadata
    #[serde(default)]
    pub metadata: Metadata,
}

impl Document {
    /// Creates a document with empty metadata.
    pub fn new(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            metadata: Metadata::new(),
        }
    }

    /// Creates a document with metadata.
    pub fn with_metadata(
        id: impl Into<String>,
        content: impl Into<String>,
        metadata: Metadata,
    ) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            metadata,
        }
    }
}

/// A single ranked search hit.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    /// Document identifier
    pub id: String,
    /// Document text content
    pub content: String,
    /// Document metadata
    pub metadata: Metadata,
    /// Relevance score; cosine similarity for plain semantic search, a
    /// fused rank score when a fusion power is registered
    pub score: f32,
}

/// One entry of the export sequence.
///
/// The embedding is serialized as a plain numeric list to stay
/// transport-agnostic; imported vectors are trusted to be unit-norm.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportedDocument {
    /// Document identifier
    pub id: String,
    /// Document text content
    pub content: String,
    /// Document metadata
    #[serde(default)]
    pub metadata: Metadata,
    /// Stored embedding vector
    pub embedding: Vec<f32>,
}
