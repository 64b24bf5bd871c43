//! Related-information aggregation.
//!
//! Two flows share one response shape ([`RelatedInfo`]):
//!
//! - **File path**: list indexed files, classify each against the target,
//!   fetch chunks of every related file concurrently, reclassify per chunk
//!   and score from the relation table. Sorted by score then relation
//!   priority, capped at `related.max_items`.
//! - **Ticket ID**: mine git for branches and commits mentioning the
//!   ticket (on a blocking thread, under `git.timeout_secs`), search the
//!   vector store around every modified file with a flat provenance
//!   bonus, and run one broad query for the ticket ID to surface pull
//!   requests, issues and discussions.
//!
//! Per-item upstream failures inside either flow are logged and skipped.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::sync::Arc;

use serde_json::json;
use tokio::task::JoinSet;

use context_scout_core::embedding::Embedder;
use context_scout_core::models::{
    Document, DocumentMetadata, FilterMap, GitTicketInfo, RelatedInfo, RelatedItem,
    RelatedReference, SearchResult, SourceType,
};
use context_scout_core::relation::{
    compare_by_score_then_priority, detect_relation_type, RelationType,
};
use context_scout_core::store::{SearchOptions, VectorStore};
use context_scout_core::ticket::validate_ticket_id;
use context_scout_core::{ScoutError, ScoutResult};

use crate::cancel::CancellationToken;
use crate::config::{GitConfig, RelatedConfig};
use crate::git::{get_repo_root, GitHistoryMiner};

const SUMMARY_MESSAGE_CHARS: usize = 80;
const SNIPPET_CHARS: usize = 200;
const HASH_PREFIX: usize = 8;

pub struct RelatedInfoAggregator {
    store: Arc<dyn VectorStore>,
    embedder: Arc<dyn Embedder>,
    related: RelatedConfig,
    git: GitConfig,
    miner: GitHistoryMiner,
}

impl RelatedInfoAggregator {
    pub fn new(
        store: Arc<dyn VectorStore>,
        embedder: Arc<dyn Embedder>,
        related: &RelatedConfig,
        git: &GitConfig,
    ) -> Self {
        Self {
            store,
            embedder,
            related: related.clone(),
            git: git.clone(),
            miner: GitHistoryMiner::new(git.max_commits),
        }
    }

    /// Related context for a file path or a ticket ID.
    ///
    /// The file path wins when both are given. Blank identifiers count as
    /// absent.
    pub async fn get_related_info(
        &self,
        file_path: Option<&str>,
        ticket_id: Option<&str>,
    ) -> ScoutResult<RelatedInfo> {
        let file_path = file_path.map(str::trim).filter(|s| !s.is_empty());
        let ticket_id = ticket_id.map(str::trim).filter(|s| !s.is_empty());

        match (file_path, ticket_id) {
            (Some(path), _) => self.for_file(path).await,
            (None, Some(ticket)) => self.for_ticket(ticket).await,
            (None, None) => Err(ScoutError::InvalidInput(
                "either file_path or ticket_id is required".into(),
            )),
        }
    }

    async fn for_file(&self, target: &str) -> ScoutResult<RelatedInfo> {
        let files = self
            .store
            .list_indexed_files()
            .await
            .map_err(|e| ScoutError::upstream("list indexed files", e))?;

        let empty = DocumentMetadata::default();
        let candidates: Vec<String> = files
            .into_iter()
            .filter(|f| f != target)
            .filter(|f| detect_relation_type(target, f, "", &empty) != RelationType::Unknown)
            .collect();

        tracing::debug!(file = target, candidates = candidates.len(), "classified indexed files");

        let chunks = self.fetch_chunks(&candidates).await;

        let mut items: Vec<RelatedItem> = Vec::new();
        for (path, docs) in candidates.iter().zip(chunks) {
            for doc in docs {
                let relation = detect_relation_type(
                    target,
                    path,
                    doc.metadata.chunk_type.as_deref().unwrap_or(""),
                    &doc.metadata,
                );
                if relation == RelationType::Unknown {
                    continue;
                }
                items.push(RelatedItem::from_document(doc, relation.base_score(), relation));
            }
        }

        sort_items(&mut items);
        items.truncate(self.related.max_items);

        tracing::info!(file = target, items = items.len(), "file relations resolved");

        Ok(RelatedInfo {
            summary: file_summary(target, &items),
            related_items: items,
            ..Default::default()
        })
    }

    /// Chunks per path, in `paths` order. A failed fetch yields no chunks.
    async fn fetch_chunks(&self, paths: &[String]) -> Vec<Vec<Document>> {
        let mut set = JoinSet::new();
        for (index, path) in paths.iter().enumerate() {
            let store = Arc::clone(&self.store);
            let path = path.clone();
            set.spawn(async move {
                let result = store.get_file_chunks(&path).await;
                (index, path, result)
            });
        }

        let mut out: Vec<Vec<Document>> = vec![Vec::new(); paths.len()];
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((index, _, Ok(docs))) => out[index] = docs,
                Ok((_, path, Err(e))) => {
                    tracing::warn!(file = %path, error = %e, "chunk fetch failed; skipping file");
                }
                Err(e) => tracing::warn!(error = %e, "chunk fetch task failed"),
            }
        }
        out
    }

    async fn for_ticket(&self, ticket_id: &str) -> ScoutResult<RelatedInfo> {
        validate_ticket_id(ticket_id)?;

        let evidence = match self.mine(ticket_id).await {
            Ok(info) => info,
            Err(e @ ScoutError::RepositoryNotFound(_)) => {
                tracing::warn!(ticket_id, error = %e, "no git repository; continuing without history");
                GitTicketInfo {
                    ticket_id: ticket_id.to_string(),
                    ..Default::default()
                }
            }
            Err(e) => return Err(e),
        };

        let related_items = if evidence.has_evidence() {
            self.enrich_from_commits(&evidence).await
        } else {
            Vec::new()
        };

        let mut info = RelatedInfo {
            summary: ticket_summary(&evidence, self.related.summary_commits),
            related_items,
            ..Default::default()
        };
        self.collect_references(ticket_id, &mut info).await;

        tracing::info!(
            ticket_id,
            branches = evidence.branches.len(),
            commits = evidence.commits.len(),
            items = info.related_items.len(),
            prs = info.related_prs.len(),
            issues = info.related_issues.len(),
            discussions = info.discussions.len(),
            "ticket relations resolved"
        );

        Ok(info)
    }

    /// Locate the repository and walk its history on a blocking thread.
    ///
    /// The walk is cancelled when the deadline expires or when this future
    /// is dropped by its caller.
    async fn mine(&self, ticket_id: &str) -> ScoutResult<GitTicketInfo> {
        let token = CancellationToken::new();
        let worker_token = token.clone();
        let _cancel_on_drop = token.drop_guard();
        let miner = self.miner;
        let id = ticket_id.to_string();
        let start = self.git.repo_path.clone();

        let task = tokio::task::spawn_blocking(move || {
            let root = get_repo_root(&start)?;
            miner.find_ticket_in_git(&id, &root, &worker_token)
        });

        let deadline = self.git.timeout();
        match tokio::time::timeout(deadline, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => Err(ScoutError::git("mine git history", e)),
            Err(_) => Err(ScoutError::Timeout(deadline)),
        }
    }

    /// Vector-store hits around each modified file, with the commit bonus.
    async fn enrich_from_commits(&self, evidence: &GitTicketInfo) -> Vec<RelatedItem> {
        let mut items: Vec<RelatedItem> = Vec::new();
        let mut by_id: HashMap<String, usize> = HashMap::new();

        for path in &evidence.modified_files {
            let vector = match self.embedder.embed(path).await {
                Ok(v) => v,
                Err(e) => {
                    tracing::warn!(file = %path, error = %e, "embedding failed; skipping file");
                    continue;
                }
            };

            let mut filters = FilterMap::new();
            filters.insert("file_path".into(), json!(path));
            let options = SearchOptions {
                limit: self.related.results_per_modified_file,
                offset: 0,
                filters,
            };
            let hits = match self.store.search_hybrid(path, &vector, &options).await {
                Ok(hits) => hits,
                Err(e) => {
                    tracing::warn!(file = %path, error = %e, "search failed; skipping file");
                    continue;
                }
            };

            for hit in hits {
                let score = hit.score + self.related.commit_boost;
                match by_id.get(&hit.document.id) {
                    Some(&i) => {
                        if score > items[i].score {
                            items[i].score = score;
                        }
                    }
                    None => {
                        by_id.insert(hit.document.id.clone(), items.len());
                        items.push(RelatedItem::from_document(
                            hit.document,
                            score,
                            RelationType::CommitHistory,
                        ));
                    }
                }
            }
        }

        sort_items(&mut items);
        items.truncate(self.related.max_items);
        items
    }

    /// Broad ticket-ID query for pull requests, issues and discussions.
    async fn collect_references(&self, ticket_id: &str, info: &mut RelatedInfo) {
        let vector = match self.embedder.embed(ticket_id).await {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(ticket_id, error = %e, "embedding failed; skipping reference lookup");
                return;
            }
        };

        let mut filters = FilterMap::new();
        filters.insert(
            "source_types".into(),
            json!([
                SourceType::PullRequest.as_str(),
                SourceType::Ticket.as_str(),
                SourceType::Issue.as_str(),
                SourceType::Chat.as_str(),
            ]),
        );
        let options = SearchOptions {
            limit: self.related.reference_limit,
            offset: 0,
            filters,
        };

        let hits = match self.store.search_hybrid(ticket_id, &vector, &options).await {
            Ok(hits) => hits,
            Err(e) => {
                tracing::warn!(ticket_id, error = %e, "reference search failed");
                return;
            }
        };

        for hit in hits {
            let source_type = hit.document.metadata.source_type;
            let reference = to_reference(hit);
            match source_type {
                SourceType::PullRequest => info.related_prs.push(reference),
                SourceType::Ticket | SourceType::Issue => info.related_issues.push(reference),
                SourceType::Chat => info.discussions.push(reference),
                _ => {}
            }
        }
    }
}

fn sort_items(items: &mut [RelatedItem]) {
    items.sort_by(|a, b| {
        compare_by_score_then_priority(a.score, a.relation_type, b.score, b.relation_type)
    });
}

fn to_reference(hit: SearchResult) -> RelatedReference {
    let doc = hit.document;
    RelatedReference {
        snippet: truncate_chars(doc.content.trim(), SNIPPET_CHARS),
        title: doc.metadata.title,
        url: doc.metadata.url,
        source_type: doc.metadata.source_type,
        score: hit.score,
        id: doc.id,
    }
}

/// At most `max` characters of `s`, never splitting a code point.
fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((end, _)) => format!("{}...", &s[..end]),
        None => s.to_string(),
    }
}

fn file_summary(target: &str, items: &[RelatedItem]) -> String {
    if items.is_empty() {
        return format!("No related items found for {target}.");
    }
    let counts: Vec<String> = RelationType::ALL
        .iter()
        .filter_map(|rel| {
            let n = items.iter().filter(|i| i.relation_type == *rel).count();
            (n > 0).then(|| format!("{n} {}", rel.as_str()))
        })
        .collect();
    format!(
        "Found {} related items for {target}: {}.",
        items.len(),
        counts.join(", ")
    )
}

fn ticket_summary(evidence: &GitTicketInfo, max_commits: usize) -> String {
    let ticket = &evidence.ticket_id;
    if !evidence.has_evidence() {
        return format!("No git history found for ticket {ticket}.");
    }

    let mut out = format!("Ticket {ticket}");
    if evidence.branches.is_empty() {
        out.push_str("\nBranches: none");
    } else {
        let _ = write!(out, "\nBranches: {}", evidence.branches.join(", "));
    }

    let mut commits: Vec<_> = evidence.commits.iter().collect();
    commits.sort_by(|a, b| b.date.cmp(&a.date));
    if !commits.is_empty() {
        let shown = commits.len().min(max_commits);
        let _ = write!(out, "\nRecent commits ({shown} of {}):", commits.len());
        for commit in commits.into_iter().take(max_commits) {
            let hash: String = commit.hash.chars().take(HASH_PREFIX).collect();
            let subject = commit.message.lines().next().unwrap_or("");
            let _ = write!(
                out,
                "\n  {hash} {} ({})",
                truncate_chars(subject, SUMMARY_MESSAGE_CHARS),
                commit.author
            );
        }
    }

    if !evidence.modified_files.is_empty() {
        let _ = write!(out, "\nModified files: {}", evidence.modified_files.len());
    }
    if evidence.truncated {
        let _ = write!(
            out,
            "\nHistory scan stopped after {} commits.",
            evidence.commits_scanned
        );
    }
    out
}
