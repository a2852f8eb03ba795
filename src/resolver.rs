//! # Reference Resolution
//!
//! Picks the git reference a layer repository should use when no explicit
//! branch is declared for it, based on what the anchor repository is checked
//! out at.
//!
//! The rules are tried in a fixed order and the first match wins:
//!
//! 1. anchor on a development-type branch without `force`: the requested
//!    reference is discarded
//! 2. a non-empty requested reference
//! 3. anchor detached: the tag at the anchor's HEAD
//! 4. anchor on a branch other than the development/stable names, and the
//!    target has a branch of that name
//! 5. anchor on a development-type branch and `<base><vendor-development>`
//!    exists in the target
//! 6. `<base><vendor>` exists in the target
//! 7. `<base>` exists in the target
//! 8. anchor on a development-type branch: the development branch, or the
//!    stable branch when the target has no development branch
//! 9. the stable branch
//!
//! The order is what lets a feature branch of the anchor follow matching
//! feature branches of the layers while everything else tracks the stable
//! baseline. The result is not validated against the target repository;
//! callers check existence when they use it.

use std::collections::BTreeSet;
use std::fmt;

use log::info;
use serde::{Deserialize, Serialize};

/// Branch naming conventions used by [`resolve`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RefPolicy {
    /// Upstream platform branch the layers are based on (e.g. `morty`).
    /// Empty disables the rules built on it.
    pub base_branch: String,
    pub development_branch: String,
    pub stable_branch: String,
    /// Branches with this prefix count as development branches.
    pub feature_prefix: String,
    pub vendor_suffix: String,
    pub vendor_development_suffix: String,
}

impl Default for RefPolicy {
    fn default() -> Self {
        Self {
            base_branch: String::new(),
            development_branch: "develop".to_string(),
            stable_branch: "master".to_string(),
            feature_prefix: "feature/".to_string(),
            vendor_suffix: "-msc".to_string(),
            vendor_development_suffix: "-msc-develop".to_string(),
        }
    }
}

impl RefPolicy {
    /// Whether `branch` is the development branch or a feature branch.
    pub fn is_development(&self, branch: Option<&str>) -> bool {
        match branch {
            Some(name) => {
                name == self.development_branch
                    || (!self.feature_prefix.is_empty() && name.starts_with(&self.feature_prefix))
            }
            None => false,
        }
    }

    fn is_reserved(&self, branch: &str) -> bool {
        branch == self.development_branch || branch == self.stable_branch
    }
}

/// What the anchor repository is checked out at.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AnchorRef {
    /// Active branch, `None` when detached.
    pub branch: Option<String>,
    /// First tag pointing at HEAD.
    pub tag: Option<String>,
}

impl AnchorRef {
    pub fn on_branch(branch: impl Into<String>) -> Self {
        Self {
            branch: Some(branch.into()),
            tag: None,
        }
    }

    pub fn at_tag(tag: impl Into<String>) -> Self {
        Self {
            branch: None,
            tag: Some(tag.into()),
        }
    }
}

impl fmt::Display for AnchorRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.branch, &self.tag) {
            (Some(branch), _) => write!(f, "branch {}", branch),
            (None, Some(tag)) => write!(f, "tag {}", tag),
            (None, None) => write!(f, "detached HEAD without tag"),
        }
    }
}

/// The rule that produced a reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResolutionRule {
    Requested,
    AnchorTag,
    AnchorBranch,
    VendorDevelopment,
    Vendor,
    BaseBranch,
    Development,
    /// Development branch wanted but missing in the target.
    StableFallback,
    Stable,
}

/// A resolved reference and the rule that chose it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedRef {
    pub reference: String,
    pub rule: ResolutionRule,
}

impl ResolvedRef {
    fn new(reference: impl Into<String>, rule: ResolutionRule) -> Self {
        Self {
            reference: reference.into(),
            rule,
        }
    }
}

/// Resolve the reference for a target repository with branches
/// `target_branches`.
///
/// Returns `None` only when the anchor is detached and no tag points at its
/// HEAD, leaving nothing to follow.
pub fn resolve(
    policy: &RefPolicy,
    anchor: &AnchorRef,
    target_branches: &BTreeSet<String>,
    requested: &str,
    force: bool,
) -> Option<ResolvedRef> {
    let on_development = policy.is_development(anchor.branch.as_deref());
    let requested = if on_development && !force {
        ""
    } else {
        requested
    };

    if !requested.is_empty() {
        return Some(ResolvedRef::new(requested, ResolutionRule::Requested));
    }

    let Some(branch) = anchor.branch.as_deref() else {
        return anchor
            .tag
            .as_ref()
            .map(|tag| ResolvedRef::new(tag.as_str(), ResolutionRule::AnchorTag));
    };

    if !policy.is_reserved(branch) && target_branches.contains(branch) {
        return Some(ResolvedRef::new(branch, ResolutionRule::AnchorBranch));
    }

    if !policy.base_branch.is_empty() {
        let vendor_development = format!("{}{}", policy.base_branch, policy.vendor_development_suffix);
        if on_development && target_branches.contains(&vendor_development) {
            return Some(ResolvedRef::new(
                vendor_development,
                ResolutionRule::VendorDevelopment,
            ));
        }
        let vendor = format!("{}{}", policy.base_branch, policy.vendor_suffix);
        if target_branches.contains(&vendor) {
            return Some(ResolvedRef::new(vendor, ResolutionRule::Vendor));
        }
        if target_branches.contains(&policy.base_branch) {
            return Some(ResolvedRef::new(
                policy.base_branch.as_str(),
                ResolutionRule::BaseBranch,
            ));
        }
    }

    if on_development {
        if target_branches.contains(&policy.development_branch) {
            return Some(ResolvedRef::new(
                policy.development_branch.as_str(),
                ResolutionRule::Development,
            ));
        }
        info!(
            "Using fallback branch '{}' (branch '{}' does not exist)",
            policy.stable_branch, policy.development_branch
        );
        return Some(ResolvedRef::new(
            policy.stable_branch.as_str(),
            ResolutionRule::StableFallback,
        ));
    }

    Some(ResolvedRef::new(
        policy.stable_branch.as_str(),
        ResolutionRule::Stable,
    ))
}
