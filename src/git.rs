//! Thin wrappers around the system `git` binary.
//!
//! Every function runs one `git` invocation inside a working tree and maps a
//! non-zero exit status to [`Error::GitCommand`]. Queries whose failure is an
//! expected answer (e.g. "HEAD is detached", "this revision does not exist")
//! return `Option` instead.
//!
//! Using the system command means whatever the operator configured for git
//! (credential helpers, `safe.directory`, hooks) applies unchanged.

use std::path::Path;
use std::process::{Command, Output};

use log::trace;

use crate::error::{Error, Result};

fn run(repo: &Path, args: &[&str]) -> Result<Output> {
    trace!("{}: git {}", repo.display(), args.join(" "));
    Command::new("git")
        .args(args)
        .current_dir(repo)
        .output()
        .map_err(|e| Error::GitCommand {
            command: args.join(" "),
            path: repo.to_path_buf(),
            stderr: e.to_string(),
        })
}

/// Run a git command that must succeed and return its trimmed stdout.
fn output(repo: &Path, args: &[&str]) -> Result<String> {
    let result = run(repo, args)?;
    if !result.status.success() {
        return Err(Error::GitCommand {
            command: args.join(" "),
            path: repo.to_path_buf(),
            stderr: String::from_utf8_lossy(&result.stderr).trim().to_string(),
        });
    }
    Ok(String::from_utf8_lossy(&result.stdout).trim_end().to_string())
}

/// Run a git command whose failure means "no answer".
fn query(repo: &Path, args: &[&str]) -> Result<Option<String>> {
    let result = run(repo, args)?;
    if result.status.success() {
        Ok(Some(
            String::from_utf8_lossy(&result.stdout).trim().to_string(),
        ))
    } else {
        Ok(None)
    }
}

/// Split `for-each-ref` style output into names, dropping blanks and `HEAD`.
pub fn parse_ref_lines(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|name| !name.is_empty() && *name != "HEAD")
        .map(str::to_string)
        .collect()
}

/// Commit id of HEAD.
pub fn head_commit(repo: &Path) -> Result<String> {
    output(repo, &["rev-parse", "HEAD"])
}

/// Name of the checked out branch, `None` when HEAD is detached.
pub fn active_branch(repo: &Path) -> Result<Option<String>> {
    query(repo, &["symbolic-ref", "--quiet", "--short", "HEAD"])
}

/// Local branch names.
pub fn local_branches(repo: &Path) -> Result<Vec<String>> {
    let stdout = output(
        repo,
        &["for-each-ref", "--format=%(refname:lstrip=2)", "refs/heads"],
    )?;
    Ok(parse_ref_lines(&stdout))
}

/// Remote-tracking branch names with the remote prefix removed
/// (`origin/morty` is reported as `morty`).
pub fn remote_branches(repo: &Path) -> Result<Vec<String>> {
    let stdout = output(
        repo,
        &["for-each-ref", "--format=%(refname:lstrip=3)", "refs/remotes"],
    )?;
    Ok(parse_ref_lines(&stdout))
}

/// All tag names.
pub fn tags(repo: &Path) -> Result<Vec<String>> {
    let stdout = output(
        repo,
        &["for-each-ref", "--format=%(refname:lstrip=2)", "refs/tags"],
    )?;
    Ok(parse_ref_lines(&stdout))
}

/// Tags pointing at HEAD.
pub fn tags_at_head(repo: &Path) -> Result<Vec<String>> {
    let stdout = output(repo, &["tag", "--points-at", "HEAD"])?;
    Ok(parse_ref_lines(&stdout))
}

/// `git status --porcelain` for tracked files; empty when the tree is clean.
pub fn status_porcelain(repo: &Path) -> Result<String> {
    output(repo, &["status", "--porcelain", "--untracked-files=no"])
}

/// Unstaged (`staged == false`) or staged changes as a patch.
pub fn diff(repo: &Path, staged: bool) -> Result<String> {
    if staged {
        output(repo, &["diff", "--staged"])
    } else {
        output(repo, &["diff"])
    }
}

/// Resolve any revision (tag, branch, describe name, commit id) to a commit
/// id; `None` when it does not name a commit in this repository.
pub fn rev_parse_commit(repo: &Path, rev: &str) -> Result<Option<String>> {
    let spec = format!("{}^{{commit}}", rev);
    query(repo, &["rev-parse", "--verify", "--quiet", &spec])
}

/// Commit at the tip of `branch`: the local branch when there is one, else
/// a remote-tracking branch of that name, which `git checkout <branch>`
/// would turn into a local branch.
pub fn branch_commit(repo: &Path, branch: &str) -> Result<Option<String>> {
    if let Some(commit) = rev_parse_commit(repo, &format!("refs/heads/{}", branch))? {
        return Ok(Some(commit));
    }
    let pattern = format!("refs/remotes/*/{}", branch);
    let stdout = output(repo, &["for-each-ref", "--format=%(objectname)", &pattern])?;
    Ok(parse_ref_lines(&stdout).into_iter().next())
}

/// Check out `rev`. `-` returns to the previously checked out branch.
pub fn checkout(repo: &Path, rev: &str) -> Result<()> {
    output(repo, &["checkout", "--quiet", rev]).map(|_| ())
}

/// The last `count` commits, one per line.
pub fn log_oneline(repo: &Path, count: usize) -> Result<String> {
    let limit = format!("-{}", count);
    output(
        repo,
        &["log", "--pretty=format:%H - %an, %ar : %s%d", &limit],
    )
}
