//! In-memory [`GitOperations`] for engine tests.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use super::GitOperations;
use crate::error::{Error, Result};

/// State of one mocked repository.
#[derive(Debug, Clone)]
pub struct MockRepo {
    pub head: String,
    pub branch: Option<String>,
    pub previous_branch: Option<String>,
    /// Branch name → commit at its tip.
    pub branches: BTreeMap<String, String>,
    /// Remote-tracking branches without a local counterpart, without the
    /// remote prefix.
    pub remote_branches: BTreeMap<String, String>,
    /// Tag name → commit.
    pub tags: BTreeMap<String, String>,
    /// Commits reachable by id only.
    pub commits: BTreeSet<String>,
    /// Diff text; `Some` means the working tree is dirty.
    pub diff: Option<String>,
    pub log: String,
    pub fail_checkout: bool,
}

impl MockRepo {
    pub fn on_branch(branch: &str, head: &str) -> Self {
        let mut branches = BTreeMap::new();
        branches.insert(branch.to_string(), head.to_string());
        Self {
            head: head.to_string(),
            branch: Some(branch.to_string()),
            previous_branch: None,
            branches,
            remote_branches: BTreeMap::new(),
            tags: BTreeMap::new(),
            commits: BTreeSet::new(),
            diff: None,
            log: format!("{} - Dev, 1 day ago : tip", head),
            fail_checkout: false,
        }
    }

    pub fn detached(head: &str) -> Self {
        Self {
            head: head.to_string(),
            branch: None,
            previous_branch: None,
            branches: BTreeMap::new(),
            remote_branches: BTreeMap::new(),
            tags: BTreeMap::new(),
            commits: BTreeSet::new(),
            diff: None,
            log: format!("{} - Dev, 1 day ago : tip", head),
            fail_checkout: false,
        }
    }

    pub fn with_branch(mut self, name: &str, commit: &str) -> Self {
        self.branches.insert(name.to_string(), commit.to_string());
        self
    }

    pub fn with_remote_branch(mut self, name: &str, commit: &str) -> Self {
        self.remote_branches.insert(name.to_string(), commit.to_string());
        self
    }

    pub fn with_tag(mut self, name: &str, commit: &str) -> Self {
        self.tags.insert(name.to_string(), commit.to_string());
        self
    }

    pub fn with_commit(mut self, commit: &str) -> Self {
        self.commits.insert(commit.to_string());
        self
    }

    pub fn with_previous_branch(mut self, name: &str) -> Self {
        self.previous_branch = Some(name.to_string());
        self
    }

    pub fn dirty(mut self, diff: &str) -> Self {
        self.diff = Some(diff.to_string());
        self
    }

    pub fn failing_checkout(mut self) -> Self {
        self.fail_checkout = true;
        self
    }

    fn knows_commit(&self, commit: &str) -> bool {
        self.head == commit
            || self.commits.contains(commit)
            || self.branches.values().any(|c| c == commit)
            || self.remote_branches.values().any(|c| c == commit)
            || self.tags.values().any(|c| c == commit)
    }

    fn resolve(&self, rev: &str) -> Option<String> {
        if let Some(commit) = self.tags.get(rev) {
            return Some(commit.clone());
        }
        if let Some(commit) = self.branches.get(rev) {
            return Some(commit.clone());
        }
        self.knows_commit(rev).then(|| rev.to_string())
    }

    fn resolve_branch(&self, name: &str) -> Option<String> {
        self.branches
            .get(name)
            .or_else(|| self.remote_branches.get(name))
            .cloned()
    }
}

/// Mock git operations for testing
#[derive(Default)]
pub struct MockGitOperations {
    repos: Mutex<HashMap<PathBuf, MockRepo>>,
    checkouts: Arc<Mutex<Vec<(PathBuf, String)>>>,
}

impl MockGitOperations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_repo(self, path: &Path, repo: MockRepo) -> Self {
        self.repos
            .lock()
            .unwrap()
            .insert(path.to_path_buf(), repo);
        self
    }

    /// Current state of a mocked repository.
    pub fn repo(&self, path: &Path) -> MockRepo {
        self.repos.lock().unwrap()[path].clone()
    }

    /// Every checkout performed, in order; returning to the previous branch
    /// is recorded as `-`.
    pub fn checkouts(&self) -> Vec<(PathBuf, String)> {
        self.checkouts.lock().unwrap().clone()
    }

    fn with<T>(&self, path: &Path, f: impl FnOnce(&mut MockRepo) -> Result<T>) -> Result<T> {
        let mut repos = self.repos.lock().unwrap();
        let repo = repos.get_mut(path).ok_or_else(|| Error::GitCommand {
            command: "rev-parse HEAD".to_string(),
            path: path.to_path_buf(),
            stderr: "fatal: not a git repository".to_string(),
        })?;
        f(repo)
    }

    fn switch(&self, path: &Path, rev: &str) -> Result<()> {
        self.with(path, |repo| {
            if repo.fail_checkout {
                return Err(Error::Checkout {
                    path: path.to_path_buf(),
                    reference: rev.to_string(),
                    message: "simulated failure".to_string(),
                });
            }
            let commit = repo
                .resolve(rev)
                .or_else(|| repo.remote_branches.get(rev).cloned())
                .ok_or_else(|| Error::Checkout {
                    path: path.to_path_buf(),
                    reference: rev.to_string(),
                    message: "unknown revision".to_string(),
                })?;
            // checking out a remote-only branch creates the local branch
            if !repo.branches.contains_key(rev) {
                if let Some(tip) = repo.remote_branches.remove(rev) {
                    repo.branches.insert(rev.to_string(), tip);
                }
            }
            let previous = repo.branch.take();
            if previous.is_some() {
                repo.previous_branch = previous;
            }
            if repo.branches.contains_key(rev) {
                repo.branch = Some(rev.to_string());
            }
            repo.head = commit;
            Ok(())
        })?;
        self.checkouts
            .lock()
            .unwrap()
            .push((path.to_path_buf(), rev.to_string()));
        Ok(())
    }
}

impl GitOperations for MockGitOperations {
    fn head_commit(&self, repo: &Path) -> Result<String> {
        self.with(repo, |r| Ok(r.head.clone()))
    }

    fn active_branch(&self, repo: &Path) -> Result<Option<String>> {
        self.with(repo, |r| Ok(r.branch.clone()))
    }

    fn branch_names(&self, repo: &Path) -> Result<BTreeSet<String>> {
        self.with(repo, |r| {
            Ok(r.branches
                .keys()
                .chain(r.remote_branches.keys())
                .cloned()
                .collect())
        })
    }

    fn tag_names(&self, repo: &Path) -> Result<BTreeSet<String>> {
        self.with(repo, |r| Ok(r.tags.keys().cloned().collect()))
    }

    fn tags_at_head(&self, repo: &Path) -> Result<Vec<String>> {
        self.with(repo, |r| {
            Ok(r.tags
                .iter()
                .filter(|(_, commit)| **commit == r.head)
                .map(|(name, _)| name.clone())
                .collect())
        })
    }

    fn is_dirty(&self, repo: &Path) -> Result<bool> {
        self.with(repo, |r| Ok(r.diff.is_some()))
    }

    fn diff(&self, repo: &Path) -> Result<String> {
        self.with(repo, |r| Ok(r.diff.clone().unwrap_or_default()))
    }

    fn resolve(&self, repo: &Path, rev: &str) -> Result<Option<String>> {
        self.with(repo, |r| Ok(r.resolve(rev)))
    }

    fn resolve_branch(&self, repo: &Path, branch: &str) -> Result<Option<String>> {
        self.with(repo, |r| Ok(r.resolve_branch(branch)))
    }

    fn checkout(&self, repo: &Path, rev: &str) -> Result<()> {
        self.switch(repo, rev)
    }

    fn checkout_previous(&self, repo: &Path) -> Result<()> {
        let previous = self.with(repo, |r| {
            r.previous_branch.clone().ok_or_else(|| Error::Checkout {
                path: repo.to_path_buf(),
                reference: "-".to_string(),
                message: "no previous branch".to_string(),
            })
        })?;
        self.with(repo, |r| {
            r.branch = Some(previous.clone());
            r.previous_branch = None;
            r.head = r.branches.get(&previous).cloned().unwrap_or_default();
            Ok(())
        })?;
        self.checkouts
            .lock()
            .unwrap()
            .push((repo.to_path_buf(), "-".to_string()));
        Ok(())
    }

    fn recent_commits(&self, repo: &Path, count: usize) -> Result<String> {
        self.with(repo, |r| {
            Ok(r.log.lines().take(count).collect::<Vec<_>>().join("\n"))
        })
    }
}
