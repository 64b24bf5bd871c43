//! Post-retrieval rescoring stages.
//!
//! Both stages take ownership of a result list, rescore in place, and
//! re-sort by score descending. Sorting is stable, so equal scores keep
//! the order the previous stage produced.
//!
//! - [`Reranker`] — blends the store's hybrid score with the cosine
//!   similarity between the query and document embeddings:
//!   `score = score × (1 − w) + cosine × w` (default `w = 0.3`).
//! - [`ContextBooster`] — multiplies the score by a factor (default `1.2`)
//!   once per matching work-context signal. Factors compound with no cap.

use std::cmp::Ordering;

use crate::embedding::cosine_similarity;
use crate::models::{SearchResult, WorkContext};

pub const DEFAULT_RERANK_WEIGHT: f64 = 0.3;
pub const DEFAULT_BOOST_FACTOR: f64 = 1.2;

/// Stable sort by score, highest first.
pub fn sort_by_score_desc(results: &mut [SearchResult]) {
    results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
}

/// Cosine-similarity reranker.
#[derive(Debug, Clone, Copy)]
pub struct Reranker {
    weight: f64,
}

impl Default for Reranker {
    fn default() -> Self {
        Self::new(DEFAULT_RERANK_WEIGHT)
    }
}

impl Reranker {
    /// `weight` is the share of the final score given to cosine similarity.
    pub fn new(weight: f64) -> Self {
        Self {
            weight: weight.clamp(0.0, 1.0),
        }
    }

    /// Rescore and re-sort `results` against the query embedding.
    ///
    /// Without a query embedding the list is returned untouched. Results
    /// whose document embedding is empty or of a different dimension keep
    /// their score.
    pub fn rerank(
        &self,
        mut results: Vec<SearchResult>,
        query_vec: Option<&[f32]>,
    ) -> Vec<SearchResult> {
        if results.len() <= 1 {
            return results;
        }
        let Some(query_vec) = query_vec.filter(|v| !v.is_empty()) else {
            return results;
        };

        for result in &mut results {
            let doc_vec = &result.document.embedding;
            if doc_vec.is_empty() || doc_vec.len() != query_vec.len() {
                continue;
            }
            let cosine = f64::from(cosine_similarity(query_vec, doc_vec));
            result.score = result.score * (1.0 - self.weight) + cosine * self.weight;
        }

        sort_by_score_desc(&mut results);
        results
    }
}

/// Work-context booster.
#[derive(Debug, Clone, Copy)]
pub struct ContextBooster {
    factor: f64,
}

impl Default for ContextBooster {
    fn default() -> Self {
        Self::new(DEFAULT_BOOST_FACTOR)
    }
}

impl ContextBooster {
    pub fn new(factor: f64) -> Self {
        Self { factor }
    }

    /// Number of work-context signals a result matches (0..=3).
    pub fn matches(result: &SearchResult, ctx: &WorkContext) -> i32 {
        let meta = &result.document.metadata;
        let same = |a: &Option<String>, b: &Option<String>| match (a.as_deref(), b.as_deref()) {
            (Some(a), Some(b)) => !a.is_empty() && a == b,
            _ => false,
        };

        let file_hit = same(&meta.file_path, &ctx.active_file);
        let ticket_hit = meta
            .ticket_id
            .as_ref()
            .is_some_and(|id| !id.is_empty() && ctx.open_tickets.iter().any(|t| t == id));
        let branch_hit = same(&meta.git_branch, &ctx.git_branch);

        i32::from(file_hit) + i32::from(ticket_hit) + i32::from(branch_hit)
    }

    /// Apply one multiplicative factor per matching signal, then re-sort.
    pub fn boost(
        &self,
        mut results: Vec<SearchResult>,
        ctx: Option<&WorkContext>,
    ) -> Vec<SearchResult> {
        let Some(ctx) = ctx else {
            return results;
        };

        for result in &mut results {
            let hits = Self::matches(result, ctx);
            if hits > 0 {
                result.score *= self.factor.powi(hits);
            }
        }

        sort_by_score_desc(&mut results);
        results
    }
}
