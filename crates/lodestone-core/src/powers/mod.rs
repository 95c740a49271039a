//! Extension pipeline for the search engine.
//!
//! A *power* hooks into engine operations: transforming documents before
//! they are added, observing adds and deletes, rewriting queries, caching
//! or re-ranking results, or supplying the embedder. The engine keeps
//! powers in registration order and dispatches each phase down the
//! sequence; a `before_search` hook can short-circuit the whole search by
//! filling [`SearchContext::short_circuit`].
//!
//! Rather than a dispatch hierarchy, [`Power`] is a flat trait whose
//! methods all have pass-through default bodies — implement only the hooks
//! a power needs. Each power owns its own state; no state is shared across
//! power instances, and engine-owned state (document store, vector index)
//! is maintained by the engine, never by hooks.
//!
//! Hook failures propagate to the caller of the triggering operation and
//! abort it; mutations already applied by earlier phases are not rolled
//! back.
//!
//! ## Built-in powers
//!
//! - [`QueryCache`] - caches results per exact query string with TTL
//! - [`MetadataFilter`] - drops results failing a metadata predicate
//! - [`EmbeddingSwap`] - replaces the embedder with a caller-supplied fn
//! - [`HybridSearch`] - BM25 companion index fused with the semantic
//!   ranking by weighted RRF

mod embedding_swap;
mod hybrid;
mod metadata_filter;
mod query_cache;

pub use embedding_swap::EmbeddingSwap;
pub use hybrid::HybridSearch;
pub use metadata_filter::MetadataFilter;
pub use query_cache::QueryCache;

use crate::embedding::Embedder;
use crate::error::EngineError;
use crate::search::types::{Document, SearchResult};

/// Per-search state threaded through the hook pipeline.
#[derive(Debug)]
pub struct SearchContext {
    /// The query text; `before_search` hooks may rewrite it, and every
    /// later stage (embedding, keyword matching, caching) sees the
    /// rewritten form.
    pub query: String,
    /// Number of results requested by the caller.
    pub top_k: usize,
    /// When set by a `before_search` hook, the engine stops iterating the
    /// chain and returns these results without embedding or retrieval.
    pub short_circuit: Option<Vec<SearchResult>>,
}

impl SearchContext {
    /// Creates a context for a query.
    pub fn new(query: impl Into<String>, top_k: usize) -> Self {
        Self {
            query: query.into(),
            top_k,
            short_circuit: None,
        }
    }
}

/// An engine extension: a named bundle of optional hooks.
///
/// Every hook has a pass-through default. Hooks within a phase run in
/// registration order. Powers must not mutate result lists handed to later
/// hooks other than by returning a new list.
pub trait Power: Send {
    /// Unique name within the registry; registration fails on duplicates
    /// and [`eject`](crate::search::SearchEngine::eject) removes by name.
    fn name(&self) -> &str;

    /// Transforms the document list before embedding and indexing. The
    /// returned list is what gets added.
    fn before_add(&mut self, docs: Vec<Document>) -> Result<Vec<Document>, EngineError> {
        Ok(docs)
    }

    /// Observes documents after they are in the store and vector index.
    fn after_add(&mut self, docs: &[Document]) -> Result<(), EngineError> {
        let _ = docs;
        Ok(())
    }

    /// Inspects or rewrites the query; may fill
    /// [`SearchContext::short_circuit`] to answer the search directly.
    fn before_search(&mut self, ctx: &mut SearchContext) -> Result<(), EngineError> {
        let _ = ctx;
        Ok(())
    }

    /// Transforms the result list after retrieval (re-rank, filter,
    /// hydrate). Receives the post-hook query via `ctx`.
    fn after_search(
        &mut self,
        ctx: &SearchContext,
        results: Vec<SearchResult>,
    ) -> Result<Vec<SearchResult>, EngineError> {
        let _ = ctx;
        Ok(results)
    }

    /// Supplies an embedder. The engine scans the registry in reverse and
    /// uses the first embedder found, so the most recently registered
    /// override wins.
    fn embedder(&self) -> Option<&dyn Embedder> {
        None
    }

    /// Observes a document deletion.
    fn on_delete(&mut self, id: &str) -> Result<(), EngineError> {
        let _ = id;
        Ok(())
    }

    /// Observes the store being cleared.
    fn on_clear(&mut self) -> Result<(), EngineError> {
        Ok(())
    }
}
