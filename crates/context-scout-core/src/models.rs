//! Core data models used throughout Context Scout.
//!
//! Documents are owned by the external vector store; the engine only reads
//! them. Search results, related items and responses are built per request.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Where a document came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    #[default]
    Code,
    Documentation,
    Ticket,
    Issue,
    PullRequest,
    Chat,
    Other,
}

impl SourceType {
    pub fn as_str(self) -> &'static str {
        match self {
            SourceType::Code => "code",
            SourceType::Documentation => "documentation",
            SourceType::Ticket => "ticket",
            SourceType::Issue => "issue",
            SourceType::PullRequest => "pull_request",
            SourceType::Chat => "chat",
            SourceType::Other => "other",
        }
    }
}

/// Typed per-document metadata, populated once at ingestion.
///
/// Connector-specific keys that have no dedicated field land in `extra`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentMetadata {
    pub source_type: SourceType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_line: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_line: Option<u32>,
    /// Parser chunk kind: `function`, `class`, `struct`, `module`, ...
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chunk_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbol_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ticket_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub git_branch: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pr_number: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// An indexed chunk of code, ticket, chat or pull-request text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub embedding: Vec<f32>,
    #[serde(default)]
    pub metadata: DocumentMetadata,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub story_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pr_numbers: Vec<u64>,
}

/// A document paired with its relevance score for one request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub document: Document,
    pub score: f64,
}

/// What the agent is working on right now.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkContext {
    pub active_file: Option<String>,
    pub git_branch: Option<String>,
    pub open_tickets: Vec<String>,
    pub current_story_id: Option<String>,
}

impl WorkContext {
    /// Apply request-level overrides on top of this context.
    ///
    /// Every field present on the request wins over the filter-level value.
    pub fn with_overrides(mut self, request: &RequestContext) -> Self {
        if let Some(file) = non_empty(&request.boost_file) {
            self.active_file = Some(file.to_string());
        }
        if let Some(branch) = non_empty(&request.git_branch) {
            self.git_branch = Some(branch.to_string());
        }
        if !request.boost_tickets.is_empty() {
            self.open_tickets = request.boost_tickets.clone();
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        non_empty(&self.active_file).is_none()
            && non_empty(&self.git_branch).is_none()
            && self.open_tickets.is_empty()
            && non_empty(&self.current_story_id).is_none()
    }
}

/// Request-level context hints supplied directly on a search call.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestContext {
    pub boost_file: Option<String>,
    pub git_branch: Option<String>,
    pub boost_tickets: Vec<String>,
}

impl RequestContext {
    pub fn is_empty(&self) -> bool {
        non_empty(&self.boost_file).is_none()
            && non_empty(&self.git_branch).is_none()
            && self.boost_tickets.is_empty()
    }
}

/// Inclusive date window on `updated_at`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DateRange {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl DateRange {
    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        self.from.map_or(true, |from| ts >= from) && self.to.map_or(true, |to| ts <= to)
    }
}

/// Caller-supplied search filters.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchFilters {
    pub source_types: Vec<SourceType>,
    pub date_range: Option<DateRange>,
    pub work_context: Option<WorkContext>,
}

/// Filter map handed to the vector store. Keys are sorted.
pub type FilterMap = BTreeMap<String, serde_json::Value>;

/// Paginated search response.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResponse {
    pub results: Vec<SearchResult>,
    pub total_count: i64,
    pub query_time_ms: u64,
    pub offset: usize,
    pub limit: usize,
    pub has_more: bool,
}

/// One commit that mentions a ticket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommitInfo {
    pub hash: String,
    pub message: String,
    pub author: String,
    pub date: DateTime<Utc>,
    pub files: Vec<String>,
}

/// Git evidence gathered for one ticket.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GitTicketInfo {
    pub ticket_id: String,
    pub branches: Vec<String>,
    pub commits: Vec<CommitInfo>,
    /// Deduplicated, in first-seen order.
    pub modified_files: Vec<String>,
    pub pr_descriptions: Vec<String>,
    pub commits_scanned: usize,
    /// True when the walk stopped at the commit cap.
    pub truncated: bool,
}

impl GitTicketInfo {
    pub fn has_evidence(&self) -> bool {
        !self.branches.is_empty() || !self.commits.is_empty()
    }
}

/// The unit returned to related-info callers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RelatedItem {
    pub id: String,
    pub content: String,
    pub score: f64,
    pub source_type: SourceType,
    pub file_path: String,
    pub relation_type: crate::relation::RelationType,
    pub start_line: Option<u32>,
    pub end_line: Option<u32>,
    pub metadata: DocumentMetadata,
}

impl RelatedItem {
    pub fn from_document(
        doc: Document,
        score: f64,
        relation_type: crate::relation::RelationType,
    ) -> Self {
        let meta = doc.metadata;
        RelatedItem {
            id: doc.id,
            content: doc.content,
            score,
            source_type: meta.source_type,
            file_path: meta.file_path.clone().unwrap_or_default(),
            relation_type,
            start_line: meta.start_line,
            end_line: meta.end_line,
            metadata: meta,
        }
    }
}

/// A pull request, issue or discussion surfaced for a ticket.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RelatedReference {
    pub id: String,
    pub title: Option<String>,
    pub url: Option<String>,
    pub source_type: SourceType,
    pub score: f64,
    pub snippet: String,
}

/// Unified response of the related-info entry point.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct RelatedInfo {
    pub summary: String,
    pub related_prs: Vec<RelatedReference>,
    pub related_issues: Vec<RelatedReference>,
    pub discussions: Vec<RelatedReference>,
    pub related_items: Vec<RelatedItem>,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}
