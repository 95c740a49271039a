//! Result cache keyed by exact query string.

use super::{Power, SearchContext};
use crate::error::EngineError;
use crate::search::types::SearchResult;
use instant::Instant;
use std::collections::{HashMap, VecDeque};
use std::time::Duration;

/// Default maximum number of cached queries.
const DEFAULT_MAX_SIZE: usize = 100;

/// Default entry time-to-live.
const DEFAULT_TTL: Duration = Duration::from_millis(60_000);

struct CacheEntry {
    results: Vec<SearchResult>,
    inserted_at: Instant,
}

/// Caches search results per exact query string.
///
/// `before_search` answers from the cache (short-circuiting embedding and
/// retrieval) when a fresh entry exists; `after_search` inserts one;
/// `on_clear` wipes the cache. Eviction is by insertion order once
/// `max_size` entries are held, and entries expire after `ttl`.
///
/// Keys are exact query strings — semantically equivalent queries are not
/// unified. The cache does not observe adds or deletes, so freshness is
/// bounded only by the TTL and by clears.
pub struct QueryCache {
    max_size: usize,
    ttl: Duration,
    entries: HashMap<String, CacheEntry>,
    order: VecDeque<String>,
}

impl QueryCache {
    /// Creates a cache with the default capacity (100) and TTL (60 s).
    pub fn new() -> Self {
        Self {
            max_size: DEFAULT_MAX_SIZE,
            ttl: DEFAULT_TTL,
            entries: HashMap::new(),
            order: VecDeque::new(),
        }
    }

    /// Sets the maximum number of cached queries.
    #[must_use]
    pub fn with_max_size(mut self, max_size: usize) -> Self {
        self.max_size = max_size;
        self
    }

    /// Sets the entry time-to-live.
    #[must_use]
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Number of live entries (expired entries count until touched).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn evict(&mut self, query: &str) {
        self.entries.remove(query);
        self.order.retain(|q| q.as_str() != query);
    }
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new()
    }
}

impl Power for QueryCache {
    fn name(&self) -> &str {
        "query-cache"
    }

    fn before_search(&mut self, ctx: &mut SearchContext) -> Result<(), EngineError> {
        let fresh = match self.entries.get(&ctx.query) {
            Some(entry) => entry.inserted_at.elapsed() < self.ttl,
            None => return Ok(()),
        };
        if fresh {
            let entry = &self.entries[&ctx.query];
            ctx.short_circuit = Some(entry.results.clone());
        } else {
            let query = ctx.query.clone();
            self.evict(&query);
        }
        Ok(())
    }

    fn after_search(
        &mut self,
        ctx: &SearchContext,
        results: Vec<SearchResult>,
    ) -> Result<Vec<SearchResult>, EngineError> {
        let entry = CacheEntry {
            results: results.clone(),
            inserted_at: Instant::now(),
        };
        if self.entries.insert(ctx.query.clone(), entry).is_none() {
            if self.entries.len() > self.max_size {
                if let Some(oldest) = self.order.pop_front() {
                    self.entries.remove(&oldest);
                }
            }
            self.order.push_back(ctx.query.clone());
        }
        Ok(results)
    }

    fn on_clear(&mut self) -> Result<(), EngineError> {
        self.entries.clear();
        self.order.clear();
        Ok(())
    }
}
