//! Error taxonomy shared by every Context Scout entry point.
//!
//! Collaborator traits ([`Embedder`](crate::embedding::Embedder),
//! [`VectorStore`](crate::store::VectorStore)) return `anyhow::Result`.
//! The service layer wraps those failures into [`ScoutError`] so callers
//! can distinguish bad input from upstream outages and timeouts.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Boxed source error carried by upstream and git failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors surfaced by search and related-info requests.
///
/// Degradable failures (pagination count, per-item embedding inside an
/// enrichment loop, missing repository for soft context) never appear
/// here; they are logged and the request continues.
#[derive(Debug, Error)]
pub enum ScoutError {
    /// The request itself is malformed. Never retried.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Embedding or primary vector-store search failed.
    #[error("{operation} failed: {source}")]
    Upstream {
        operation: &'static str,
        #[source]
        source: BoxError,
    },

    /// No git repository at or above the given path.
    #[error("no git repository found at or above {}", .0.display())]
    RepositoryNotFound(PathBuf),

    /// A git read failed mid-traversal.
    #[error("git {operation} failed: {source}")]
    Git {
        operation: &'static str,
        #[source]
        source: BoxError,
    },

    /// The caller's deadline expired.
    #[error("operation timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    /// The caller cancelled the operation.
    #[error("operation cancelled")]
    Cancelled,
}

impl ScoutError {
    /// Wrap an embedding or vector-store failure.
    pub fn upstream(operation: &'static str, err: impl Into<BoxError>) -> Self {
        ScoutError::Upstream {
            operation,
            source: err.into(),
        }
    }

    /// Wrap a git library failure.
    pub fn git(operation: &'static str, err: impl Into<BoxError>) -> Self {
        ScoutError::Git {
            operation,
            source: err.into(),
        }
    }

    /// Machine-readable error code for wire responses.
    pub fn code(&self) -> &'static str {
        match self {
            ScoutError::InvalidInput(_) => "bad_request",
            ScoutError::Upstream { .. } => "upstream",
            ScoutError::RepositoryNotFound(_) => "not_found",
            ScoutError::Git { .. } => "git",
            ScoutError::Timeout(_) => "timeout",
            ScoutError::Cancelled => "cancelled",
        }
    }
}

pub type ScoutResult<T> = std::result::Result<T, ScoutError>;
