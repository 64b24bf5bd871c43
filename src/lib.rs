//! # Context Scout
//!
//! Context retrieval for AI coding agents: given a question, a file or a
//! ticket, return the code, documentation, pull requests, issues and
//! discussions most likely to help.
//!
//! ## Architecture
//!
//! ```text
//!            ┌──────────────┐      ┌──────────────────┐
//! search ───▶│   Hybrid     │─────▶│  Vector store    │
//!            │  Retriever   │      │  (+ embedder)    │
//!            └──────┬───────┘      └────────▲─────────┘
//!                   │ cache                 │
//!            ┌──────▼───────┐               │
//!            │ SearchCache  │               │
//!            └──────────────┘               │
//!            ┌──────────────┐      ┌────────┴─────────┐
//! related ──▶│  Related     │─────▶│  Git history     │
//!            │  Aggregator  │      │  miner (git2)    │
//!            └──────────────┘      └──────────────────┘
//! ```
//!
//! Pure ranking, relation detection and the collaborator traits live in
//! `context-scout-core`; this crate wires them to config, git, HTTP
//! embedders, the cache, the HTTP server and the `scout` CLI.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`cache`] | TTL + LRU search cache |
//! | [`retriever`] | Search pipeline |
//! | [`related`] | File and ticket related-info flows |
//! | [`git`] | Bounded ticket mining over git history |
//! | [`embedding`] | HTTP embedding providers |
//! | [`corpus`] | JSON corpus loading |
//! | [`server`] | HTTP tool server |

pub mod cache;
pub mod cancel;
pub mod config;
pub mod corpus;
pub mod embedding;
pub mod git;
pub mod related;
pub mod retriever;
pub mod server;

use std::sync::Arc;

use anyhow::Result;

use context_scout_core::embedding::Embedder;
use context_scout_core::store::VectorStore;

use crate::cache::SearchCache;
use crate::config::Config;
use crate::related::RelatedInfoAggregator;
use crate::retriever::HybridRetriever;

/// The two entry points, sharing one store and embedder.
#[derive(Clone)]
pub struct Services {
    pub retriever: Arc<HybridRetriever>,
    pub related: Arc<RelatedInfoAggregator>,
}

impl Services {
    pub fn new(
        config: &Config,
        store: Arc<dyn VectorStore>,
        embedder: Arc<dyn Embedder>,
    ) -> Self {
        let cache = Arc::new(SearchCache::from_config(&config.cache));
        let retriever = HybridRetriever::new(
            Arc::clone(&store),
            Arc::clone(&embedder),
            cache,
            &config.retrieval,
        );
        let related = RelatedInfoAggregator::new(store, embedder, &config.related, &config.git);
        Self {
            retriever: Arc::new(retriever),
            related: Arc::new(related),
        }
    }

    /// Build services from configuration: corpus store plus configured embedder.
    pub fn from_config(config: &Config) -> Result<Self> {
        let store = corpus::load_store(config.store.corpus_path.as_deref())?;
        let embedder = embedding::create_embedder(&config.embedding)?;
        Ok(Self::new(config, Arc::new(store), embedder))
    }
}
