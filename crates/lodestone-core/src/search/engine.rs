//! The retrieval coordinator.
//!
//! [`SearchEngine`] owns all engine state — the document store, the HNSW
//! graph, the default embedder, and the power registry — and routes every
//! public operation through the hook pipeline:
//!
//! - `add`: beforeAdd hooks → one batch embed → store + graph → afterAdd
//! - `search`: beforeSearch hooks (may short-circuit) → embed → exact scan
//!   or graph search → hydrate → afterSearch hooks
//! - `delete` / `clear`: state removal, then the matching hooks
//!
//! All operations are atomic with respect to one another: the engine is
//! synchronous and single-threaded, and callers that share one engine
//! serialize their calls (a single reader/writer lock around the engine
//! matches the contract for multi-threaded use).

use crate::config::EngineConfig;
use crate::embedding::{Embedder, TokenHashEmbedder};
use crate::error::{validate_dimension, EngineError};
use crate::powers::{Power, SearchContext};
use crate::search::hnsw::HnswIndex;
use crate::search::types::{Document, ExportedDocument, SearchResult};
use crate::search::vector::dot;
use crate::storage::{DocumentRecord, DocumentStore};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// In-memory hybrid search engine with an extension pipeline.
///
/// Multiple independent engines may coexist in one process; nothing is
/// shared between instances.
pub struct SearchEngine {
    config: EngineConfig,
    store: DocumentStore,
    graph: HnswIndex,
    default_embedder: Box<dyn Embedder>,
    powers: Vec<Box<dyn Power>>,
}

impl SearchEngine {
    /// Creates an engine with the default configuration and the built-in
    /// token-hash embedder.
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    /// Creates an engine with an explicit configuration.
    pub fn with_config(config: EngineConfig) -> Self {
        let default_embedder: Box<dyn Embedder> = Box::new(TokenHashEmbedder::default());
        let graph = HnswIndex::with_params(
            default_embedder.dimension(),
            config.m,
            config.ef_construction,
        );
        Self {
            config,
            store: DocumentStore::new(),
            graph,
            default_embedder,
            powers: Vec::new(),
        }
    }

    /// Replaces the built-in default embedder at construction time.
    ///
    /// The graph is re-created at the embedder's dimension, so this must be
    /// called before any documents are added. Prefer registering an
    /// [`EmbeddingSwap`](crate::powers::EmbeddingSwap) power to override
    /// the embedder on a live engine.
    #[must_use]
    pub fn with_embedder(mut self, embedder: Box<dyn Embedder>) -> Self {
        debug_assert!(self.store.is_empty(), "swap the default embedder before adding documents");
        self.graph = HnswIndex::with_params(
            embedder.dimension(),
            self.config.m,
            self.config.ef_construction,
        );
        self.default_embedder = embedder;
        self
    }

    /// The engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Number of stored documents.
    pub fn len(&self) -> usize {
        self.store.len()
    }

    /// Returns `true` if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Number of nodes in the ANN graph (0 when `use_ann` is off).
    pub fn ann_index_len(&self) -> usize {
        self.graph.len()
    }

    /// Looks up a document by id.
    pub fn get(&self, id: &str) -> Option<Document> {
        self.store.get(id).map(|record| Document {
            id: id.to_string(),
            content: record.content.clone(),
            metadata: record.metadata.clone(),
        })
    }

    /// Resolves the active embedder: the most recently registered power
    /// that supplies one, else the built-in default.
    fn resolve_embedder(&self) -> &dyn Embedder {
        self.powers
            .iter()
            .rev()
            .find_map(|power| power.embedder())
            .unwrap_or_else(|| self.default_embedder.as_ref())
    }

    /// Adds documents to the engine.
    ///
    /// Documents flow through the beforeAdd hooks, are embedded in a single
    /// batch call, written to the store and (when enabled) the graph, and
    /// finally handed to the afterAdd hooks. Within one call documents are
    /// inserted in input order.
    ///
    /// An existing id overwrites the stored entry; the graph skips
    /// re-insertion and keeps the old vector until the id is deleted and
    /// re-added.
    ///
    /// # Errors
    ///
    /// Embedder and hook failures propagate unchanged; earlier phases are
    /// not rolled back.
    #[instrument(skip_all, fields(count = docs.len()))]
    pub fn add(&mut self, docs: Vec<Document>) -> Result<(), EngineError> {
        let mut docs = docs;
        for power in &mut self.powers {
            docs = power.before_add(docs)?;
        }

        let contents: Vec<&str> = docs.iter().map(|doc| doc.content.as_str()).collect();
        let embeddings = self.resolve_embedder().embed_batch(&contents)?;
        if embeddings.len() != docs.len() {
            return Err(EngineError::Embedding(format!(
                "expected {} vectors, got {}",
                docs.len(),
                embeddings.len()
            )));
        }

        for (doc, embedding) in docs.iter().zip(embeddings) {
            validate_dimension(self.graph.dimension(), embedding.len())?;
            let vector: Arc<[f32]> = embedding.into();
            self.store.insert(
                &doc.id,
                DocumentRecord {
                    content: doc.content.clone(),
                    metadata: doc.metadata.clone(),
                    embedding: vector.clone(),
                },
            );
            if self.config.use_ann && !self.graph.contains(&doc.id) {
                self.graph.insert(&doc.id, vector)?;
            }
        }

        for power in &mut self.powers {
            power.after_add(&docs)?;
        }
        debug!(total = self.store.len(), "documents added");
        Ok(())
    }

    /// Searches for the top `k` documents matching `query`.
    ///
    /// beforeSearch hooks run first and may rewrite the query or
    /// short-circuit the search with a ready result list. Otherwise the
    /// (possibly rewritten) query is embedded and routed: stores larger
    /// than `ann_threshold` use the graph, smaller stores an exact scan.
    /// afterSearch hooks then transform the ranked list in registration
    /// order.
    ///
    /// Results are sorted by score descending; an empty store yields an
    /// empty list.
    #[instrument(skip_all, fields(top_k = k))]
    pub fn search(&mut self, query: &str, k: usize) -> Result<Vec<SearchResult>, EngineError> {
        let mut ctx = SearchContext::new(query, k);
        for power in &mut self.powers {
            power.before_search(&mut ctx)?;
            if ctx.short_circuit.is_some() {
                break;
            }
        }
        if let Some(results) = ctx.short_circuit.take() {
            debug!(results = results.len(), "search short-circuited");
            return Ok(results);
        }

        let query_vector = self.resolve_embedder().embed(&ctx.query)?;
        validate_dimension(self.graph.dimension(), query_vector.len())?;

        let use_graph = self.config.use_ann && self.store.len() > self.config.ann_threshold;
        let ranked = if use_graph {
            self.graph
                .search(&query_vector, k, self.config.ef_search)?
        } else {
            self.scan(&query_vector, k)
        };
        debug!(candidates = ranked.len(), use_graph, "retrieval complete");

        let mut results = Vec::with_capacity(ranked.len());
        for (id, score) in ranked {
            match self.store.get(&id) {
                Some(record) => results.push(SearchResult {
                    id,
                    content: record.content.clone(),
                    metadata: record.metadata.clone(),
                    score,
                }),
                None => warn!(id = %id, "ranked id missing from store, skipping"),
            }
        }

        for power in &mut self.powers {
            results = power.after_search(&ctx, results)?;
        }
        Ok(results)
    }

    /// Exact top-`k` scan over every stored vector.
    ///
    /// Stable sort on an insertion-ordered walk, so score ties resolve to
    /// the earlier-added document.
    fn scan(&self, query: &[f32], k: usize) -> Vec<(String, f32)> {
        let mut scored: Vec<(String, f32)> = self
            .store
            .iter()
            .map(|(id, record)| (id.to_string(), dot(&record.embedding, query)))
            .collect();
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);
        scored
    }

    /// Deletes a document by id.
    ///
    /// Removes the store entry and the graph node, then fires the onDelete
    /// hooks. Returns `Ok(false)` (without firing hooks) when the id was
    /// not present.
    pub fn delete(&mut self, id: &str) -> Result<bool, EngineError> {
        if self.store.remove(id).is_none() {
            return Ok(false);
        }
        self.graph.remove(id);
        for power in &mut self.powers {
            power.on_delete(id)?;
        }
        Ok(true)
    }

    /// Removes every document, then fires the onClear hooks.
    pub fn clear(&mut self) -> Result<(), EngineError> {
        self.store.clear();
        self.graph.clear();
        for power in &mut self.powers {
            power.on_clear()?;
        }
        info!("engine cleared");
        Ok(())
    }

    /// Exports the full store as an ordered sequence (insertion order).
    ///
    /// The sequence is `Serialize`, so `serde_json::to_string(&export)`
    /// gives a transport-ready snapshot.
    pub fn export(&self) -> Vec<ExportedDocument> {
        self.store
            .iter()
            .map(|(id, record)| ExportedDocument {
                id: id.to_string(),
                content: record.content.clone(),
                metadata: record.metadata.clone(),
                embedding: record.embedding.to_vec(),
            })
            .collect()
    }

    /// Replaces the engine state with a previously exported sequence.
    ///
    /// Clears through the normal path (onClear hooks fire), loads every
    /// entry into the store and graph trusting the exported vectors to be
    /// unit-norm, then fires the afterAdd hooks once over the imported
    /// documents so stateful powers rebuild from scratch.
    #[instrument(skip_all, fields(count = exported.len()))]
    pub fn import(&mut self, exported: Vec<ExportedDocument>) -> Result<(), EngineError> {
        self.clear()?;

        let mut restored = Vec::with_capacity(exported.len());
        for entry in exported {
            validate_dimension(self.graph.dimension(), entry.embedding.len())?;
            let vector: Arc<[f32]> = entry.embedding.into();
            self.store.insert(
                &entry.id,
                DocumentRecord {
                    content: entry.content.clone(),
                    metadata: entry.metadata.clone(),
                    embedding: vector.clone(),
                },
            );
            if self.config.use_ann && !self.graph.contains(&entry.id) {
                self.graph.insert(&entry.id, vector)?;
            }
            restored.push(Document {
                id: entry.id,
                content: entry.content,
                metadata: entry.metadata,
            });
        }

        for power in &mut self.powers {
            power.after_add(&restored)?;
        }
        info!(count = restored.len(), "import complete");
        Ok(())
    }

    /// Registers a power at the end of the pipeline.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::DuplicatePower`] when a power with the same
    /// name is already registered.
    pub fn use_power(&mut self, power: Box<dyn Power>) -> Result<(), EngineError> {
        if self.powers.iter().any(|p| p.name() == power.name()) {
            return Err(EngineError::DuplicatePower(power.name().to_string()));
        }
        debug!(name = power.name(), "power registered");
        self.powers.push(power);
        Ok(())
    }

    /// Removes a power by name. Returns `false` when no such power exists.
    pub fn eject(&mut self, name: &str) -> bool {
        match self.powers.iter().position(|p| p.name() == name) {
            Some(index) => {
                self.powers.remove(index);
                true
            }
            None => false,
        }
    }

    /// Names of the registered powers, in registration order.
    pub fn powers(&self) -> Vec<&str> {
        self.powers.iter().map(|p| p.name()).collect()
    }
}

impl Default for SearchEngine {
    fn default() -> Self {
        Self::new()
    }
}
