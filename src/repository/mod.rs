//! # Repository Capabilities
//!
//! The reconciliation core never talks to git directly. Everything it needs
//! from a working tree goes through the [`GitOperations`] trait:
//!
//! - read-only queries (head commit, active branch, branch and tag names,
//!   dirty flag with a renderable diff, revision resolution), and
//! - the two mutations it performs (check out a revision, return to the
//!   previous branch).
//!
//! [`DefaultGitOperations`] implements the trait with the system `git`
//! binary (see [`crate::git`]). Tests substitute an in-memory mock so the
//! engine can be exercised without creating repositories.
//!
//! [`RepoState`] bundles the queries into one value. It is fetched fresh on
//! every run and never cached across runs.

#[cfg(test)]
pub(crate) mod mock;

use std::collections::BTreeSet;
use std::path::Path;

use serde::Serialize;

use crate::error::Result;

/// Trait for repository operations - allows mocking in tests
pub trait GitOperations: Send + Sync {
    /// Commit id of HEAD.
    fn head_commit(&self, repo: &Path) -> Result<String>;

    /// Checked out branch, `None` when detached.
    fn active_branch(&self, repo: &Path) -> Result<Option<String>>;

    /// Local and remote branch names (remote names without the remote
    /// prefix).
    fn branch_names(&self, repo: &Path) -> Result<BTreeSet<String>>;

    fn tag_names(&self, repo: &Path) -> Result<BTreeSet<String>>;

    /// Tags pointing at HEAD.
    fn tags_at_head(&self, repo: &Path) -> Result<Vec<String>>;

    /// Whether tracked files have staged or unstaged changes.
    fn is_dirty(&self, repo: &Path) -> Result<bool>;

    /// Unstaged and staged changes, rendered for operator review.
    fn diff(&self, repo: &Path) -> Result<String>;

    /// Resolve a version or commit string to a commit id.
    ///
    /// `Ok(None)` means the revision does not exist in the repository;
    /// `Err` means the repository could not be queried at all.
    fn resolve(&self, repo: &Path, rev: &str) -> Result<Option<String>>;

    /// Commit a checkout of `branch` would land on: the local branch, else a
    /// remote-tracking branch of that name. `Ok(None)` when neither exists.
    fn resolve_branch(&self, repo: &Path, branch: &str) -> Result<Option<String>>;

    /// Check out a branch, tag or commit.
    fn checkout(&self, repo: &Path, rev: &str) -> Result<()>;

    /// Return to the previously checked out branch (`git checkout -`).
    fn checkout_previous(&self, repo: &Path) -> Result<()>;

    /// The last `count` commits, one line each.
    fn recent_commits(&self, repo: &Path, count: usize) -> Result<String>;

    /// Query the full state of a repository.
    fn state(&self, repo: &Path) -> Result<RepoState> {
        Ok(RepoState {
            head: self.head_commit(repo)?,
            branch: self.active_branch(repo)?,
            branches: self.branch_names(repo)?,
            tags: self.tag_names(repo)?,
            dirty: self.is_dirty(repo)?,
        })
    }

    /// Short description of what is checked out: the branch, else a tag at
    /// HEAD, else the detached commit.
    fn checkout_info(&self, repo: &Path) -> Result<String> {
        if let Some(branch) = self.active_branch(repo)? {
            return Ok(format!("branch {}", branch));
        }
        if let Some(tag) = self.tags_at_head(repo)?.into_iter().next() {
            return Ok(format!("tag {}", tag));
        }
        Ok(format!("detached at {}", short_id(&self.head_commit(repo)?)))
    }
}

/// The default implementation of `GitOperations`, which uses the system's
/// `git` command.
pub struct DefaultGitOperations;

impl GitOperations for DefaultGitOperations {
    fn head_commit(&self, repo: &Path) -> Result<String> {
        crate::git::head_commit(repo)
    }

    fn active_branch(&self, repo: &Path) -> Result<Option<String>> {
        crate::git::active_branch(repo)
    }

    fn branch_names(&self, repo: &Path) -> Result<BTreeSet<String>> {
        let mut names: BTreeSet<String> = crate::git::local_branches(repo)?.into_iter().collect();
        names.extend(crate::git::remote_branches(repo)?);
        Ok(names)
    }

    fn tag_names(&self, repo: &Path) -> Result<BTreeSet<String>> {
        Ok(crate::git::tags(repo)?.into_iter().collect())
    }

    fn tags_at_head(&self, repo: &Path) -> Result<Vec<String>> {
        crate::git::tags_at_head(repo)
    }

    fn is_dirty(&self, repo: &Path) -> Result<bool> {
        Ok(!crate::git::status_porcelain(repo)?.is_empty())
    }

    fn diff(&self, repo: &Path) -> Result<String> {
        let unstaged = crate::git::diff(repo, false)?;
        let staged = crate::git::diff(repo, true)?;
        Ok(render_diff(&unstaged, &staged))
    }

    fn resolve(&self, repo: &Path, rev: &str) -> Result<Option<String>> {
        crate::git::rev_parse_commit(repo, rev)
    }

    fn resolve_branch(&self, repo: &Path, branch: &str) -> Result<Option<String>> {
        crate::git::branch_commit(repo, branch)
    }

    fn checkout(&self, repo: &Path, rev: &str) -> Result<()> {
        crate::git::checkout(repo, rev)
    }

    fn checkout_previous(&self, repo: &Path) -> Result<()> {
        crate::git::checkout(repo, "-")
    }

    fn recent_commits(&self, repo: &Path, count: usize) -> Result<String> {
        crate::git::log_oneline(repo, count)
    }
}

/// Join unstaged and staged patches into one reviewable text.
pub fn render_diff(unstaged: &str, staged: &str) -> String {
    let mut rendered = String::new();
    if !unstaged.is_empty() {
        rendered.push_str(unstaged);
    }
    if !staged.is_empty() {
        if !rendered.is_empty() {
            rendered.push('\n');
        }
        rendered.push_str("Staged changes:\n");
        rendered.push_str(staged);
    }
    rendered
}

/// Abbreviate a commit id for display.
pub fn short_id(commit: &str) -> &str {
    commit.get(..12).unwrap_or(commit)
}

/// Point-in-time state of one repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepoState {
    pub head: String,
    /// Active branch, `None` when detached.
    pub branch: Option<String>,
    pub branches: BTreeSet<String>,
    pub tags: BTreeSet<String>,
    pub dirty: bool,
}

impl RepoState {
    pub fn is_detached(&self) -> bool {
        self.branch.is_none()
    }

    pub fn has_branch(&self, name: &str) -> bool {
        self.branches.contains(name)
    }

    /// Whether `name` exists as a branch or a tag.
    pub fn has_ref(&self, name: &str) -> bool {
        self.branches.contains(name) || self.tags.contains(name)
    }

    /// Branch name for display, `detached` when there is none.
    pub fn branch_label(&self) -> &str {
        self.branch.as_deref().unwrap_or("detached")
    }
}
