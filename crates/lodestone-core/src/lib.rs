//! # Lodestone Core
//!
//! Process-resident hybrid search over text documents: dense vector
//! similarity through a hierarchical navigable small world (HNSW) graph,
//! BM25 keyword ranking, weighted reciprocal rank fusion, and an extension
//! pipeline ("powers") that can hook every engine operation or swap the
//! embedder.
//!
//! ## Modules
//!
//! - [`search`] - The search engine: HNSW graph, BM25 index, rank fusion,
//!   and the retrieval coordinator
//! - [`storage`] - Insertion-ordered in-memory document store
//! - [`embedding`] - Embedder trait and the built-in token-hash embedder
//! - [`powers`] - Extension pipeline: hook trait and the built-in powers
//! - [`config`] - Engine configuration and tuning constants
//! - [`error`] - Error types
//!
//! ## Example
//!
//! ```
//! use lodestone_core::search::{Document, SearchEngine};
//!
//! let mut engine = SearchEngine::new();
//! engine.add(vec![
//!     Document::new("1", "How to reset your password"),
//!     Document::new("2", "Changing your account email address"),
//! ]).unwrap();
//!
//! let results = engine.search("forgot my login credentials", 2).unwrap();
//! assert!(results.len() <= 2);
//! ```

pub mod config;
pub mod embedding;
pub mod error;
pub mod powers;
pub mod search;
pub mod storage;
