//! Hybrid search engine combining vector and keyword retrieval.
//!
//! # Architecture
//!
//! - `types`: core types (Document, Metadata, SearchResult, ExportedDocument)
//! - `engine`: [`SearchEngine`] coordinating storage, indexes, and powers
//! - `hnsw`: hierarchical navigable small world graph for approximate
//!   nearest-neighbor search
//! - `keyword`: BM25 inverted index and the shared word tokenizer
//! - `vector`: dot product / cosine distance primitives
//! - `fusion`: weighted reciprocal rank fusion for merging rankings
//!
//! # Usage
//!
//! ```
//! use lodestone_core::powers::HybridSearch;
//! use lodestone_core::search::{Document, SearchEngine};
//!
//! let mut engine = SearchEngine::new();
//! engine.use_power(Box::new(HybridSearch::new())).unwrap();
//!
//! engine.add(vec![
//!     Document::new("1", "Rust is a systems programming language"),
//!     Document::new("2", "Python is a scripting language"),
//! ]).unwrap();
//!
//! let results = engine.search("systems programming", 10).unwrap();
//! assert_eq!(results[0].id, "1");
//! ```
//!
//! # Algorithm Details
//!
//! **Vector search (HNSW)**: a multi-layer proximity graph searched with a
//! greedy descent plus a layer-0 beam, giving sublinear approximate
//! nearest-neighbor lookup with high recall. Small stores skip the graph
//! entirely and use an exact scan (see
//! [`EngineConfig::ann_threshold`](crate::config::EngineConfig)).
//!
//! **Keyword search (BM25)**: term frequency and inverse document frequency
//! scoring with document-length normalization (k1 = 1.5, b = 0.75).
//!
//! **Reciprocal rank fusion**: `alpha / (k + rank)` per ranking with k = 60;
//! rank-based, so the incomparable score scales of the two retrievers never
//! need normalizing.

pub mod engine;
pub mod fusion;
pub mod hnsw;
pub mod keyword;
pub mod types;
pub mod vector;

pub use engine::SearchEngine;
pub use types::{Document, ExportedDocument, Metadata, SearchResult};
