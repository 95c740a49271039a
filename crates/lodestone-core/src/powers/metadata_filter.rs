//! Metadata predicate filter for search results.

use super::{Power, SearchContext};
use crate::error::EngineError;
use crate::search::types::{Metadata, SearchResult};

/// Drops search results whose metadata fails a predicate.
///
/// Runs in `after_search`; surviving results keep their order, and the
/// returned list may hold fewer than `top_k` entries.
pub struct MetadataFilter {
    predicate: Box<dyn Fn(&Metadata) -> bool + Send + Sync>,
}

impl MetadataFilter {
    /// Creates a filter from a metadata predicate.
    ///
    /// ```
    /// use lodestone_core::powers::MetadataFilter;
    /// use serde_json::json;
    ///
    /// let published_only =
    ///     MetadataFilter::new(|meta| meta.get("published") == Some(&json!(true)));
    /// ```
    pub fn new(predicate: impl Fn(&Metadata) -> bool + Send + Sync + 'static) -> Self {
        Self {
            predicate: Box::new(predicate),
        }
    }
}

impl Power for MetadataFilter {
    fn name(&self) -> &str {
        "metadata-filter"
    }

    fn after_search(
        &mut self,
        _ctx: &SearchContext,
        results: Vec<SearchResult>,
    ) -> Result<Vec<SearchResult>, EngineError> {
        Ok(results
            .into_iter()
            .filter(|result| (self.predicate)(&result.metadata))
            .collect())
    }
}
