//! Corpus loading for the in-memory vector store.
//!
//! A corpus file is a JSON array of [`Document`]s as produced by an
//! external indexer, embeddings included.

use std::path::Path;

use anyhow::{Context, Result};

use context_scout_core::models::Document;
use context_scout_core::store::memory::InMemoryVectorStore;

pub fn load_documents(path: &Path) -> Result<Vec<Document>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read corpus file: {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse corpus file: {}", path.display()))
}

/// Build a store from `path`, or an empty one when no corpus is configured.
pub fn load_store(path: Option<&Path>) -> Result<InMemoryVectorStore> {
    let Some(path) = path else {
        tracing::warn!("no corpus configured; serving from an empty store");
        return Ok(InMemoryVectorStore::new());
    };
    let docs = load_documents(path)?;
    tracing::info!(path = %path.display(), documents = docs.len(), "corpus loaded");
    Ok(InMemoryVectorStore::from_documents(docs))
}
