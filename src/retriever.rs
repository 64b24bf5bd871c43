//! Hybrid retrieval entry point for the search tool.
//!
//! # Pipeline
//!
//! 1. Validate the query, clamp `top_k` (default 20, max 100) and `offset`.
//! 2. Merge request-level context over filter-level [`WorkContext`].
//! 3. Build the vector-store [`FilterMap`].
//! 4. Cache hit → reuse the stored results and `query_time_ms`; no
//!    embedding or store call is made.
//! 5. Cache miss → embed, hybrid search, rerank, count, then cache.
//! 6. Apply context boosting and compute pagination fields.
//!
//! Embedding or search failure fails the request. A failing `count` only
//! narrows `total_count` to the number of results returned.

use std::sync::Arc;
use std::time::Instant;

use serde::Deserialize;
use serde_json::json;

use context_scout_core::embedding::Embedder;
use context_scout_core::models::{
    FilterMap, RequestContext, SearchFilters, SearchResponse, WorkContext,
};
use context_scout_core::rank::{ContextBooster, Reranker};
use context_scout_core::store::{SearchOptions, VectorStore};
use context_scout_core::{ScoutError, ScoutResult};

use crate::cache::{CacheEntry, SearchCache};
use crate::config::RetrievalConfig;

/// One search call as received from a tool or CLI invocation.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SearchRequest {
    pub query: String,
    pub top_k: Option<i64>,
    pub offset: Option<i64>,
    pub filters: Option<SearchFilters>,
    pub context: Option<RequestContext>,
}

impl SearchRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Default::default()
        }
    }
}

pub struct HybridRetriever {
    store: Arc<dyn VectorStore>,
    embedder: Arc<dyn Embedder>,
    cache: Arc<SearchCache>,
    reranker: Reranker,
    booster: ContextBooster,
    default_top_k: usize,
    max_top_k: usize,
}

impl HybridRetriever {
    pub fn new(
        store: Arc<dyn VectorStore>,
        embedder: Arc<dyn Embedder>,
        cache: Arc<SearchCache>,
        config: &RetrievalConfig,
    ) -> Self {
        Self {
            store,
            embedder,
            cache,
            reranker: Reranker::new(config.rerank_weight),
            booster: ContextBooster::new(config.boost_factor),
            default_top_k: config.default_top_k,
            max_top_k: config.max_top_k,
        }
    }

    /// `top_k` ≤ 0 or absent → default; above the cap → cap.
    pub fn effective_limit(&self, top_k: Option<i64>) -> usize {
        match top_k {
            Some(k) if k > 0 => (k as usize).min(self.max_top_k),
            _ => self.default_top_k,
        }
    }

    pub async fn search(&self, req: &SearchRequest) -> ScoutResult<SearchResponse> {
        let query = req.query.trim();
        if query.is_empty() {
            return Err(ScoutError::InvalidInput("query must not be empty".into()));
        }

        let limit = self.effective_limit(req.top_k);
        let offset = req.offset.unwrap_or(0).max(0) as usize;
        let work_context = effective_work_context(req.filters.as_ref(), req.context.as_ref());
        let filters = build_filter_map(req.filters.as_ref(), work_context.as_ref());

        let mut cache_filters = filters.clone();
        cache_filters.insert("_page".into(), json!({ "limit": limit, "offset": offset }));

        let entry = match self.cache.get(query, &cache_filters) {
            Some(hit) => {
                tracing::debug!(query, "search cache hit");
                hit.as_ref().clone()
            }
            None => {
                tracing::debug!(query, "search cache miss");
                let entry = self.retrieve(query, limit, offset, filters).await?;
                self.cache.set(query, &cache_filters, entry.clone());
                entry
            }
        };

        let results = self.booster.boost(entry.results, work_context.as_ref());
        let has_more = ((offset + results.len()) as i64) < entry.total_count;

        tracing::info!(
            query,
            results = results.len(),
            total = entry.total_count,
            query_time_ms = entry.query_time_ms,
            "search complete"
        );

        Ok(SearchResponse {
            results,
            total_count: entry.total_count,
            query_time_ms: entry.query_time_ms,
            offset,
            limit,
            has_more,
        })
    }

    async fn retrieve(
        &self,
        query: &str,
        limit: usize,
        offset: usize,
        filters: FilterMap,
    ) -> ScoutResult<CacheEntry> {
        let started = Instant::now();

        let query_vec = self
            .embedder
            .embed(query)
            .await
            .map_err(|e| ScoutError::upstream("query embedding", e))?;

        let options = SearchOptions {
            limit,
            offset,
            filters,
        };
        let results = self
            .store
            .search_hybrid(query, &query_vec, &options)
            .await
            .map_err(|e| ScoutError::upstream("hybrid search", e))?;

        let results = self.reranker.rerank(results, Some(&query_vec));

        let total_count = match self.store.count().await {
            Ok(n) => n,
            Err(e) => {
                tracing::warn!(error = %e, "document count failed; using returned result count");
                results.len() as i64
            }
        };

        Ok(CacheEntry {
            results,
            total_count,
            query_time_ms: started.elapsed().as_millis() as u64,
        })
    }
}

/// Filter-level work context with request-level fields layered on top.
pub fn effective_work_context(
    filters: Option<&SearchFilters>,
    request: Option<&RequestContext>,
) -> Option<WorkContext> {
    let base = filters.and_then(|f| f.work_context.clone());
    let merged = match (base, request) {
        (Some(ctx), Some(req)) => ctx.with_overrides(req),
        (Some(ctx), None) => ctx,
        (None, Some(req)) => WorkContext::default().with_overrides(req),
        (None, None) => return None,
    };
    (!merged.is_empty()).then_some(merged)
}

/// Translate filters and work context into the vector-store filter map.
pub fn build_filter_map(
    filters: Option<&SearchFilters>,
    work_context: Option<&WorkContext>,
) -> FilterMap {
    let mut map = FilterMap::new();

    if let Some(filters) = filters {
        if !filters.source_types.is_empty() {
            let types: Vec<&str> = filters.source_types.iter().map(|t| t.as_str()).collect();
            map.insert("source_types".into(), json!(types));
        }
        if let Some(range) = &filters.date_range {
            map.insert("date_range".into(), json!(range));
        }
    }

    if let Some(ctx) = work_context {
        if let Some(file) = ctx.active_file.as_deref().filter(|s| !s.is_empty()) {
            map.insert("related_files".into(), json!([file]));
        }
        if let Some(branch) = ctx.git_branch.as_deref().filter(|s| !s.is_empty()) {
            map.insert("git_branch".into(), json!(branch));
        }
        if !ctx.open_tickets.is_empty() {
            map.insert("ticket_ids".into(), json!(ctx.open_tickets));
        }
        if let Some(story) = ctx.current_story_id.as_deref().filter(|s| !s.is_empty()) {
            map.insert("story_ids".into(), json!([story]));
        }
    }

    map
}
