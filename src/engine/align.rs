//! Anchor-branch alignment.
//!
//! Without a snapshot, layer repositories follow the anchor: each one is
//! given the reference [`resolver::resolve`](crate::resolver::resolve) picks
//! from the anchor's branch or tag. Checking out the chosen references goes
//! through the same gate as reconciliation: every reference must exist and
//! every repository must be clean, or nothing is switched.

use std::path::PathBuf;

use log::{error, info};
use serde::Serialize;

use crate::engine::diagnostics::{DiagnosticKind, Diagnostics};
use crate::error::{Error, Result};
use crate::registry::LayerRegistry;
use crate::repository::GitOperations;
use crate::resolver::{resolve, AnchorRef, RefPolicy, ResolvedRef};

/// Parameters of an alignment run.
#[derive(Debug, Clone, Default)]
pub struct AlignOptions {
    /// Reference asked for by the operator; may be discarded by the
    /// resolution rules.
    pub requested: String,
    /// Keep `requested` even when the anchor is on a development branch.
    pub force: bool,
    /// Check out the resolved references.
    pub checkout: bool,
    pub dry_run: bool,
}

/// Resolution for one repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Alignment {
    pub layer: String,
    pub path: PathBuf,
    /// Current checkout, e.g. `branch morty`.
    pub current: String,
    pub resolved: Option<ResolvedRef>,
    /// Whether a checkout is (or would be) needed.
    pub switch: bool,
}

/// How an alignment run ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "kebab-case")]
pub enum AlignOutcome {
    /// References resolved, nothing checked out.
    Reported,
    Aborted,
    UpToDate,
    Switched { count: usize },
    WouldSwitch { count: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AlignReport {
    pub anchor: AnchorRef,
    #[serde(flatten)]
    pub outcome: AlignOutcome,
    pub alignments: Vec<Alignment>,
    pub diagnostics: Diagnostics,
}

/// Resolve, and optionally check out, the reference of every non-anchor
/// repository in `registry`.
pub fn align(
    git: &dyn GitOperations,
    registry: &LayerRegistry,
    policy: &RefPolicy,
    options: &AlignOptions,
) -> Result<AlignReport> {
    let anchor_dir = registry.anchor().ok_or_else(|| Error::Registry {
        message: "registry has no anchor repository".to_string(),
    })?;
    let anchor = AnchorRef {
        branch: git.active_branch(&anchor_dir.path)?,
        tag: git.tags_at_head(&anchor_dir.path)?.into_iter().next(),
    };
    info!("{} is on {}", anchor_dir.name, anchor);

    let mut diagnostics = Diagnostics::new();
    let mut alignments = Vec::new();

    for directory in registry.layers() {
        let path = directory.path.as_path();
        let name = directory.name.as_str();
        let state = git.state(path)?;
        let resolved = resolve(policy, &anchor, &state.branches, &options.requested, options.force);

        let switch = match &resolved {
            None => {
                diagnostics.warn(
                    DiagnosticKind::NoReference,
                    Some(name),
                    format!("Layer {}: no reference to follow ({})", name, anchor),
                );
                false
            }
            Some(resolved) if state.has_branch(&resolved.reference) => {
                state.branch.as_deref() != Some(resolved.reference.as_str())
            }
            Some(resolved) => match git.resolve(path, &resolved.reference)? {
                Some(commit) => commit != state.head,
                None => {
                    if options.checkout {
                        diagnostics.warn(
                            DiagnosticKind::MissingReference,
                            Some(name),
                            format!(
                                "Layer {}: reference '{}' is not present",
                                name, resolved.reference
                            ),
                        );
                    }
                    false
                }
            },
        };

        if options.checkout && switch && state.dirty {
            diagnostics.warn_with_detail(
                DiagnosticKind::DirtyRepository,
                Some(name),
                format!(
                    "Layer {} is dirty - please commit or stash your changes first",
                    path.display()
                ),
                git.diff(path)?,
            );
        }

        alignments.push(Alignment {
            layer: directory.name.clone(),
            path: directory.path.clone(),
            current: git.checkout_info(path)?,
            resolved,
            switch,
        });
    }

    let outcome = if !options.checkout {
        AlignOutcome::Reported
    } else if diagnostics.blocks_activation() {
        error!("Aborting checkout ({})", diagnostics.summary());
        AlignOutcome::Aborted
    } else {
        let mut count = 0;
        for alignment in alignments.iter().filter(|a| a.switch) {
            let Some(resolved) = &alignment.resolved else {
                continue;
            };
            info!(
                "{}: Switching from {} to {}{}",
                alignment.layer,
                alignment.current,
                resolved.reference,
                if options.dry_run { " (dry-run)" } else { "" }
            );
            if !options.dry_run {
                git.checkout(&alignment.path, &resolved.reference)?;
            }
            count += 1;
        }
        match count {
            0 => AlignOutcome::UpToDate,
            count if options.dry_run => AlignOutcome::WouldSwitch { count },
            count => AlignOutcome::Switched { count },
        }
    };

    Ok(AlignReport {
        anchor,
        outcome,
        alignments,
        diagnostics,
    })
}
