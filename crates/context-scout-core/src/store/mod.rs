//! Vector store abstraction for Context Scout.
//!
//! The [`VectorStore`] trait is the call contract the retrieval engine
//! needs from whatever index holds the corpus. Hybrid fusion (dense +
//! lexical) happens inside the store; the engine only post-processes.
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{Document, FilterMap, SearchResult};

/// Pagination and filtering for one hybrid search call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchOptions {
    pub limit: usize,
    pub offset: usize,
    pub filters: FilterMap,
}

/// Abstract storage backend.
///
/// # Operations
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`search_hybrid`](VectorStore::search_hybrid) | Fused keyword + vector search |
/// | [`get_file_chunks`](VectorStore::get_file_chunks) | All chunks indexed for one file |
/// | [`list_indexed_files`](VectorStore::list_indexed_files) | Every distinct file path |
/// | [`count`](VectorStore::count) | Total indexed documents |
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Hybrid search, results ordered by fused score descending.
    async fn search_hybrid(
        &self,
        query: &str,
        vector: &[f32],
        options: &SearchOptions,
    ) -> Result<Vec<SearchResult>>;

    /// Chunks belonging to `path`, ordered by start line.
    async fn get_file_chunks(&self, path: &str) -> Result<Vec<Document>>;

    /// Distinct file paths present in the index.
    async fn list_indexed_files(&self) -> Result<Vec<String>>;

    /// Number of indexed documents.
    async fn count(&self) -> Result<i64>;
}
