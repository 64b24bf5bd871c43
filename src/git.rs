//! Bounded git-history mining for ticket evidence.
//!
//! Given a ticket ID, scans branch names and the commit log of a local
//! repository for whole-word, case-insensitive mentions and collects the
//! files those commits touched.
//!
//! Workflow:
//! 1. Validate the ticket ID (before any repository access).
//! 2. Open the repository.
//! 3. Match every local and remote-tracking branch name.
//! 4. Walk commits reachable from HEAD, every local branch and every
//!    remote-tracking branch, newest committer time first, visiting at
//!    most `max_commits`.
//! 5. For each matching commit, diff against its first parent (or the
//!    empty tree for a root commit) and accumulate modified files.
//!
//! Hitting the commit cap ends the walk normally and sets
//! [`GitTicketInfo::truncated`]. Only real git failures are errors.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use chrono::DateTime;
use git2::{Commit, Repository, Sort};

use context_scout_core::models::{CommitInfo, GitTicketInfo};
use context_scout_core::ticket::{ticket_matcher, validate_ticket_id};
use context_scout_core::{ScoutError, ScoutResult};

use crate::cancel::CancellationToken;

pub const DEFAULT_MAX_COMMITS: usize = 1000;

#[derive(Debug, Clone, Copy)]
pub struct GitHistoryMiner {
    max_commits: usize,
}

impl Default for GitHistoryMiner {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_COMMITS)
    }
}

impl GitHistoryMiner {
    pub fn new(max_commits: usize) -> Self {
        Self {
            max_commits: max_commits.max(1),
        }
    }

    /// Collect branches, commits and modified files mentioning `ticket_id`.
    ///
    /// Blocking; run it on a blocking thread and cancel `cancel` to stop
    /// the walk early.
    pub fn find_ticket_in_git(
        &self,
        ticket_id: &str,
        repo_path: &Path,
        cancel: &CancellationToken,
    ) -> ScoutResult<GitTicketInfo> {
        validate_ticket_id(ticket_id)?;

        let repo = Repository::open(repo_path)
            .map_err(|_| ScoutError::RepositoryNotFound(repo_path.to_path_buf()))?;
        let matcher = ticket_matcher(ticket_id)?;

        let mut info = GitTicketInfo {
            ticket_id: ticket_id.to_string(),
            ..Default::default()
        };

        for entry in repo
            .branches(None)
            .map_err(|e| ScoutError::git("list branches", e))?
        {
            let (branch, _) = entry.map_err(|e| ScoutError::git("read branch", e))?;
            let Ok(Some(name)) = branch.name() else {
                continue;
            };
            if matcher.is_match(name) && !info.branches.iter().any(|b| b == name) {
                info.branches.push(name.to_string());
            }
        }

        let mut walk = repo
            .revwalk()
            .map_err(|e| ScoutError::git("start revwalk", e))?;
        walk.set_sorting(Sort::TIME)
            .map_err(|e| ScoutError::git("sort revwalk", e))?;
        // Unborn HEAD (empty repository) simply contributes no commits.
        if let Some(head) = repo.head().ok().and_then(|h| h.target()) {
            walk.push(head)
                .map_err(|e| ScoutError::git("push HEAD", e))?;
        }
        walk.push_glob("refs/heads/*")
            .map_err(|e| ScoutError::git("push branches", e))?;
        walk.push_glob("refs/remotes/*")
            .map_err(|e| ScoutError::git("push remote branches", e))?;

        let mut seen_files: HashSet<String> = HashSet::new();

        for oid in walk {
            if cancel.is_cancelled() {
                return Err(ScoutError::Cancelled);
            }
            if info.commits_scanned == self.max_commits {
                info.truncated = true;
                break;
            }
            info.commits_scanned += 1;

            let oid = oid.map_err(|e| ScoutError::git("walk commits", e))?;
            let commit = repo
                .find_commit(oid)
                .map_err(|e| ScoutError::git("read commit", e))?;
            let message = String::from_utf8_lossy(commit.message_bytes()).into_owned();
            if !matcher.is_match(&message) {
                continue;
            }

            let files = changed_files(&repo, &commit)?;
            for file in &files {
                if seen_files.insert(file.clone()) {
                    info.modified_files.push(file.clone());
                }
            }
            if commit.parent_count() > 1 {
                info.pr_descriptions.push(message.trim().to_string());
            }

            info.commits.push(CommitInfo {
                hash: oid.to_string(),
                message: message.trim().to_string(),
                author: commit.author().name().unwrap_or_default().to_string(),
                date: DateTime::from_timestamp(commit.time().seconds(), 0).unwrap_or_default(),
                files,
            });
        }

        tracing::debug!(
            ticket_id,
            branches = info.branches.len(),
            commits = info.commits.len(),
            scanned = info.commits_scanned,
            truncated = info.truncated,
            "git mining finished"
        );

        Ok(info)
    }
}

/// Paths touched by `commit` relative to its first parent.
fn changed_files(repo: &Repository, commit: &Commit<'_>) -> ScoutResult<Vec<String>> {
    let tree = commit
        .tree()
        .map_err(|e| ScoutError::git("read commit tree", e))?;
    let parent_tree = if commit.parent_count() > 0 {
        let parent = commit
            .parent(0)
            .map_err(|e| ScoutError::git("read parent commit", e))?;
        Some(
            parent
                .tree()
                .map_err(|e| ScoutError::git("read parent tree", e))?,
        )
    } else {
        None
    };

    let diff = repo
        .diff_tree_to_tree(parent_tree.as_ref(), Some(&tree), None)
        .map_err(|e| ScoutError::git("diff commit", e))?;

    Ok(diff
        .deltas()
        .filter_map(|delta| delta.new_file().path().or_else(|| delta.old_file().path()))
        .map(|p| p.to_string_lossy().replace('\\', "/"))
        .collect())
}

/// Walk upward from `start` until a directory opens as a git repository.
pub fn get_repo_root(start: &Path) -> ScoutResult<PathBuf> {
    let start = std::fs::canonicalize(start).unwrap_or_else(|_| start.to_path_buf());
    for dir in start.ancestors() {
        if Repository::open(dir).is_ok() {
            return Ok(dir.to_path_buf());
        }
    }
    Err(ScoutError::RepositoryNotFound(start))
}

#[cfg(test)]
mod tests {
    use super::*;
    use git2::{Oid, Signature, Time};
    use tempfile::TempDir;

    struct Fixture {
        dir: TempDir,
        repo: Repository,
        clock: i64,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = TempDir::new().unwrap();
            let repo = Repository::init(dir.path()).unwrap();
            Self {
                dir,
                repo,
                clock: 1_700_000_000,
            }
        }

        fn path(&self) -> &Path {
            self.dir.path()
        }

        fn commit(&mut self, files: &[(&str, &str)], message: &str) -> Oid {
            for (path, body) in files {
                let full = self.dir.path().join(path);
                std::fs::create_dir_all(full.parent().unwrap()).unwrap();
                std::fs::write(&full, body).unwrap();
            }
            let mut index = self.repo.index().unwrap();
            for (path, _) in files {
                index.add_path(Path::new(path)).unwrap();
            }
            index.write().unwrap();
            let tree_id = index.write_tree().unwrap();
            self.commit_tree(tree_id, message)
        }

        fn commit_tree(&mut self, tree_id: Oid, message: &str) -> Oid {
            self.clock += 60;
            let sig = Signature::new("Ana Lee", "ana@example.com", &Time::new(self.clock, 0)).unwrap();
            let tree = self.repo.find_tree(tree_id).unwrap();
            let parent = self
                .repo
                .head()
                .ok()
                .and_then(|h| h.target())
                .map(|oid| self.repo.find_commit(oid).unwrap());
            let parents: Vec<&Commit<'_>> = parent.iter().collect();
            self.repo
                .commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)
                .unwrap()
        }

        fn branch(&self, name: &str) {
            let head = self.repo.head().unwrap().target().unwrap();
            let commit = self.repo.find_commit(head).unwrap();
            self.repo.branch(name, &commit, false).unwrap();
        }
    }

    fn mine(fx: &Fixture, ticket: &str) -> GitTicketInfo {
        GitHistoryMiner::default()
            .find_ticket_in_git(ticket, fx.path(), &CancellationToken::new())
            .unwrap()
    }

    #[test]
    fn branch_match_without_commits_is_evidence() {
        let mut fx = Fixture::new();
        fx.commit(&[("README.md", "hello")], "Initial commit");
        fx.branch("feature/PROJ-123");
        fx.branch("feature/PROJ-1234");

        let info = mine(&fx, "proj-123");
        assert_eq!(info.branches, vec!["feature/PROJ-123".to_string()]);
        assert!(info.commits.is_empty());
        assert!(info.has_evidence());
        assert!(!info.truncated);
    }

    #[test]
    fn matching_commits_accumulate_unique_files() {
        let mut fx = Fixture::new();
        fx.commit(&[("src/auth.go", "v1"), ("go.mod", "module x")], "PROJ-7: add auth");
        fx.commit(&[("src/db.go", "v1")], "unrelated change");
        fx.commit(&[("src/auth.go", "v2"), ("src/auth_test.go", "t")], "fix proj-7 token expiry");
        fx.commit(&[("src/other.go", "v1")], "PROJ-77 is different");

        let info = mine(&fx, "PROJ-7");
        assert_eq!(info.commits.len(), 2);
        assert_eq!(info.commits[0].message, "fix proj-7 token expiry");
        assert_eq!(info.commits[0].author, "Ana Lee");
        assert_eq!(
            info.commits[0].files,
            vec!["src/auth.go".to_string(), "src/auth_test.go".to_string()]
        );
        // root commit diffs against the empty tree
        assert_eq!(
            info.commits[1].files,
            vec!["go.mod".to_string(), "src/auth.go".to_string()]
        );
        assert_eq!(
            info.modified_files,
            vec![
                "src/auth.go".to_string(),
                "src/auth_test.go".to_string(),
                "go.mod".to_string()
            ]
        );
        assert_eq!(info.commits_scanned, 4);
    }

    #[test]
    fn walk_stops_at_commit_cap() {
        let mut fx = Fixture::new();
        let tree = {
            fx.commit(&[("a.txt", "a")], "PROJ-9 seed");
            fx.repo.head().unwrap().peel_to_tree().unwrap().id()
        };
        for i in 0..1005 {
            fx.commit_tree(tree, &format!("PROJ-9 step {i}"));
        }

        let info = mine(&fx, "PROJ-9");
        assert_eq!(info.commits_scanned, DEFAULT_MAX_COMMITS);
        assert_eq!(info.commits.len(), DEFAULT_MAX_COMMITS);
        assert!(info.truncated);
    }

    #[test]
    fn exact_cap_is_not_truncated() {
        let mut fx = Fixture::new();
        for i in 0..3 {
            fx.commit(&[("f.txt", &i.to_string())], &format!("PROJ-1 #{i}"));
        }
        let info = GitHistoryMiner::new(3)
            .find_ticket_in_git("PROJ-1", fx.path(), &CancellationToken::new())
            .unwrap();
        assert_eq!(info.commits_scanned, 3);
        assert!(!info.truncated);

        let info = GitHistoryMiner::new(2)
            .find_ticket_in_git("PROJ-1", fx.path(), &CancellationToken::new())
            .unwrap();
        assert_eq!(info.commits_scanned, 2);
        assert!(info.truncated);
    }

    #[test]
    fn merge_commits_feed_pr_descriptions() {
        let mut fx = Fixture::new();
        let base = fx.commit(&[("a.txt", "a")], "init");
        let main_tip = fx.commit(&[("b.txt", "b")], "main work");

        let base_commit = fx.repo.find_commit(base).unwrap();
        fx.repo.branch("feature/PROJ-5", &base_commit, false).unwrap();
        fx.clock += 60;
        let sig = Signature::new("Bo", "bo@example.com", &Time::new(fx.clock, 0)).unwrap();
        let feature_tree = fx.repo.find_commit(main_tip).unwrap().tree().unwrap();
        let feature_tip = fx
            .repo
            .commit(
                Some("refs/heads/feature/PROJ-5"),
                &sig,
                &sig,
                "PROJ-5 feature work",
                &feature_tree,
                &[&base_commit],
            )
            .unwrap();

        fx.clock += 60;
        let sig = Signature::new("Bo", "bo@example.com", &Time::new(fx.clock, 0)).unwrap();
        let main_commit = fx.repo.find_commit(main_tip).unwrap();
        let feature_commit = fx.repo.find_commit(feature_tip).unwrap();
        fx.repo
            .commit(
                Some("HEAD"),
                &sig,
                &sig,
                "Merge pull request #12 from feature/PROJ-5\n\nAdds the thing",
                &feature_tree,
                &[&main_commit, &feature_commit],
            )
            .unwrap();

        let info = mine(&fx, "PROJ-5");
        assert_eq!(info.branches, vec!["feature/PROJ-5".to_string()]);
        assert_eq!(info.commits.len(), 2);
        assert_eq!(info.pr_descriptions.len(), 1);
        assert!(info.pr_descriptions[0].starts_with("Merge pull request #12"));
    }

    #[test]
    fn remote_only_commits_are_walked() {
        let mut fx = Fixture::new();
        let base = fx.commit(&[("a.txt", "a")], "init");

        fx.clock += 60;
        let sig = Signature::new("Bo", "bo@example.com", &Time::new(fx.clock, 0)).unwrap();
        let base_commit = fx.repo.find_commit(base).unwrap();
        let tree = base_commit.tree().unwrap();
        fx.repo
            .commit(
                Some("refs/remotes/origin/feature/PROJ-4"),
                &sig,
                &sig,
                "PROJ-4 pushed from another clone",
                &tree,
                &[&base_commit],
            )
            .unwrap();

        let info = mine(&fx, "PROJ-4");
        assert_eq!(info.branches, vec!["origin/feature/PROJ-4".to_string()]);
        assert_eq!(info.commits.len(), 1);
        assert_eq!(info.commits[0].author, "Bo");
        assert_eq!(info.commits_scanned, 2);
    }

    #[test]
    fn invalid_ticket_rejected_before_repo_access() {
        let err = GitHistoryMiner::default()
            .find_ticket_in_git("../../etc", Path::new("/nonexistent/repo"), &CancellationToken::new())
            .unwrap_err();
        assert!(matches!(err, ScoutError::InvalidInput(_)));
    }

    #[test]
    fn non_repository_path_fails() {
        let dir = TempDir::new().unwrap();
        let err = GitHistoryMiner::default()
            .find_ticket_in_git("PROJ-1", dir.path(), &CancellationToken::new())
            .unwrap_err();
        assert!(matches!(err, ScoutError::RepositoryNotFound(_)));
    }

    #[test]
    fn cancelled_walk_stops() {
        let mut fx = Fixture::new();
        fx.commit(&[("a.txt", "a")], "PROJ-2 init");
        let token = CancellationToken::new();
        token.cancel();
        let err = GitHistoryMiner::default()
            .find_ticket_in_git("PROJ-2", fx.path(), &token)
            .unwrap_err();
        assert!(matches!(err, ScoutError::Cancelled));
    }

    #[test]
    fn empty_repository_has_no_evidence() {
        let fx = Fixture::new();
        let info = mine(&fx, "PROJ-3");
        assert!(!info.has_evidence());
        assert_eq!(info.commits_scanned, 0);
    }

    #[test]
    fn repo_root_found_from_nested_directory() {
        let mut fx = Fixture::new();
        fx.commit(&[("src/deep/mod.rs", "x")], "init");
        let nested = fx.path().join("src/deep");
        let root = get_repo_root(&nested).unwrap();
        assert_eq!(root, std::fs::canonicalize(fx.path()).unwrap());
    }

    #[test]
    fn repo_root_missing_is_an_error() {
        let dir = TempDir::new().unwrap();
        let inner = dir.path().join("a/b");
        std::fs::create_dir_all(&inner).unwrap();
        // Only meaningful when the temp dir itself is not inside a repository.
        if Repository::discover(dir.path()).is_err() {
            assert!(matches!(
                get_repo_root(&inner),
                Err(ScoutError::RepositoryNotFound(_))
            ));
        }
    }
}
