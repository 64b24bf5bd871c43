//! In-memory [`VectorStore`] implementation for tests, demos and small corpora.
//!
//! Documents live in a `Vec` behind `std::sync::RwLock`. Hybrid search is
//! brute force: term coverage of the query blended with cosine similarity.
//! `source_types`, `date_range` and `file_path` filters are applied
//! strictly; the work-context keys (`related_files`, `git_branch`, `ticket_ids`,
//! `story_ids`) are hints this backend ignores.
//!
//! Documents with a zero fused score are dropped unless a `file_path`
//! filter already pinned the candidate set to one file.

use std::collections::BTreeSet;
use std::sync::RwLock;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;

use crate::embedding::cosine_similarity;
use crate::models::{DateRange, Document, FilterMap, SearchResult, SourceType};

use super::{SearchOptions, VectorStore};

/// Share of the fused score given to vector similarity.
const VECTOR_WEIGHT: f64 = 0.5;

/// In-memory store.
pub struct InMemoryVectorStore {
    docs: RwLock<Vec<Document>>,
}

impl InMemoryVectorStore {
    pub fn new() -> Self {
        Self {
            docs: RwLock::new(Vec::new()),
        }
    }

    pub fn from_documents(docs: Vec<Document>) -> Self {
        Self {
            docs: RwLock::new(docs),
        }
    }

    /// Insert or replace a document by ID.
    pub fn upsert(&self, doc: Document) -> Result<()> {
        let mut docs = self.docs.write().map_err(|_| anyhow!("store lock poisoned"))?;
        match docs.iter_mut().find(|d| d.id == doc.id) {
            Some(existing) => *existing = doc,
            None => docs.push(doc),
        }
        Ok(())
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, Vec<Document>>> {
        self.docs.read().map_err(|_| anyhow!("store lock poisoned"))
    }
}

impl Default for InMemoryVectorStore {
    fn default() -> Self {
        Self::new()
    }
}

struct StrictFilters {
    source_types: Option<Vec<SourceType>>,
    date_range: Option<DateRange>,
    file_path: Option<String>,
}

impl StrictFilters {
    fn parse(filters: &FilterMap) -> Result<Self> {
        let source_types = filters
            .get("source_types")
            .map(|v| serde_json::from_value(v.clone()))
            .transpose()
            .context("invalid source_types filter")?;
        let date_range = filters
            .get("date_range")
            .map(|v| serde_json::from_value(v.clone()))
            .transpose()
            .context("invalid date_range filter")?;
        let file_path = filters
            .get("file_path")
            .map(|v| serde_json::from_value(v.clone()))
            .transpose()
            .context("invalid file_path filter")?;
        Ok(Self {
            source_types,
            date_range,
            file_path,
        })
    }

    fn admits(&self, doc: &Document) -> bool {
        if let Some(types) = &self.source_types {
            if !types.is_empty() && !types.contains(&doc.metadata.source_type) {
                return false;
            }
        }
        if let Some(path) = &self.file_path {
            if doc.metadata.file_path.as_deref() != Some(path.as_str()) {
                return false;
            }
        }
        self.date_range
            .map_or(true, |range| range.contains(doc.updated_at))
    }
}

fn keyword_score(terms: &[String], content: &str) -> f64 {
    if terms.is_empty() {
        return 0.0;
    }
    let text = content.to_lowercase();
    let hits = terms.iter().filter(|t| text.contains(t.as_str())).count();
    hits as f64 / terms.len() as f64
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn search_hybrid(
        &self,
        query: &str,
        vector: &[f32],
        options: &SearchOptions,
    ) -> Result<Vec<SearchResult>> {
        let strict = StrictFilters::parse(&options.filters)?;
        let terms: Vec<String> = query
            .to_lowercase()
            .split_whitespace()
            .map(str::to_string)
            .collect();

        let keep_zero = strict.file_path.is_some();
        let docs = self.read()?;
        let mut results: Vec<SearchResult> = docs
            .iter()
            .filter(|doc| strict.admits(doc))
            .filter_map(|doc| {
                let kw = keyword_score(&terms, &doc.content);
                let sem = f64::from(cosine_similarity(vector, &doc.embedding)).max(0.0);
                let score = (1.0 - VECTOR_WEIGHT) * kw + VECTOR_WEIGHT * sem;
                (keep_zero || score > 0.0).then(|| SearchResult {
                    document: doc.clone(),
                    score,
                })
            })
            .collect();

        results.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.document.id.cmp(&b.document.id))
        });

        Ok(results
            .into_iter()
            .skip(options.offset)
            .take(options.limit)
            .collect())
    }

    async fn get_file_chunks(&self, path: &str) -> Result<Vec<Document>> {
        let docs = self.read()?;
        let mut chunks: Vec<Document> = docs
            .iter()
            .filter(|d| d.metadata.file_path.as_deref() == Some(path))
            .cloned()
            .collect();
        chunks.sort_by_key(|d| (d.metadata.start_line.unwrap_or(0), d.id.clone()));
        Ok(chunks)
    }

    async fn list_indexed_files(&self) -> Result<Vec<String>> {
        let docs = self.read()?;
        let files: BTreeSet<&str> = docs
            .iter()
            .filter_map(|d| d.metadata.file_path.as_deref())
            .filter(|p| !p.is_empty())
            .collect();
        Ok(files.into_iter().map(str::to_string).collect())
    }

    async fn count(&self) -> Result<i64> {
        Ok(self.read()?.len() as i64)
    }
}
