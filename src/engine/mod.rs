//! # Reconciliation Engine
//!
//! Brings the repositories of a build tree to the state a [`Snapshot`]
//! declares. A run has two phases.
//!
//! ## Anchor phase
//!
//! The anchor project is reconciled first and alone. If its head differs from
//! the declared version, that switch is the only thing the run does: the
//! caller gets [`Outcome::RestartRequired`] and must start a new run from the
//! new commit, since that commit may carry a different reconciliation
//! implementation. A dirty anchor is never switched. Under dry-run the switch
//! is reported as [`Outcome::AnchorSwitchPending`] and the run stops as well.
//!
//! ## Layer phase
//!
//! 1. **Matching.** Registry entries are looked up by logical name. A
//!    repository the snapshot does not mention, and a snapshot entry with no
//!    repository, are both warnings.
//! 2. **Validation.** For each match the declared branch must exist, the
//!    declared version must resolve to a commit, and the working tree must be
//!    clean. An entry marked dirty at capture time is warned about too.
//! 3. **Gate.** Any finding aborts the run before the first mutation,
//!    including under dry-run.
//! 4. **Apply.** Each repository is switched to its declared branch, then to
//!    its declared commit. A detached repository first returns to its
//!    previous branch. Dry-run reports the same switches without performing
//!    them.
//!
//! A repository detached at its declared commit already satisfies the
//! declared branch; this is the state a previous run leaves behind when the
//! branch has moved on, so repeated runs perform no mutation.
//!
//! Git failures are fatal and propagate as `Err`. Switches already made stay
//! made.

pub mod align;
pub mod diagnostics;
pub mod plan;

use std::path::Path;

use log::{debug, error, info};
use serde::Serialize;

use crate::error::{Error, Result};
use crate::registry::{LayerDirectory, LayerRegistry};
use crate::repository::{GitOperations, RepoState};
use crate::snapshot::{LayerPin, Snapshot};

pub use diagnostics::{Diagnostic, DiagnosticKind, Diagnostics, Severity};
pub use plan::{Action, Plan, PlanStep};

/// Parameters of one reconciliation run.
#[derive(Debug, Clone, Default)]
pub struct ReconcileOptions {
    /// Report the switches without performing them.
    pub dry_run: bool,
    /// Build id of the current build tree, compared with the snapshot id.
    pub current_id: Option<String>,
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "kebab-case")]
pub enum Outcome {
    /// The anchor could not be brought to its declared version.
    AnchorBlocked,
    /// Dry-run: the anchor would switch to `commit`.
    AnchorSwitchPending { commit: String },
    /// The anchor was switched; reconcile again from `commit`.
    RestartRequired { commit: String },
    /// Validation found problems; nothing was switched.
    Aborted,
    /// Every repository already was at its declared state.
    UpToDate,
    /// `count` repositories were switched.
    Switched { count: usize },
    /// Dry-run: `count` repositories would be switched.
    WouldSwitch { count: usize },
}

impl Outcome {
    /// Whether the layer plan passed the gate and was (or would be) applied.
    pub fn applied(&self) -> bool {
        matches!(
            self,
            Outcome::UpToDate | Outcome::Switched { .. } | Outcome::WouldSwitch { .. }
        )
    }
}

/// Result of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Report {
    #[serde(flatten)]
    pub outcome: Outcome,
    pub plan: Plan,
    pub diagnostics: Diagnostics,
}

/// A matched layer that passed validation.
struct Validated<'r> {
    directory: &'r LayerDirectory,
    state: RepoState,
    branch: Option<String>,
    commit: String,
}

enum AnchorPhase {
    Satisfied,
    Blocked,
    Pending(String),
    Switched(String),
}

fn dry_run_suffix(dry_run: bool) -> &'static str {
    if dry_run {
        " (dry-run)"
    } else {
        ""
    }
}

/// Reconciles repositories through a [`GitOperations`] implementation.
pub struct Engine<'g> {
    git: &'g dyn GitOperations,
}

impl<'g> Engine<'g> {
    pub fn new(git: &'g dyn GitOperations) -> Self {
        Self { git }
    }

    /// Reconcile the repositories of `registry` against `snapshot`.
    pub fn reconcile(
        &self,
        snapshot: &Snapshot,
        registry: &LayerRegistry,
        options: &ReconcileOptions,
    ) -> Result<Report> {
        let mut diagnostics = Diagnostics::new();
        let mut plan = Plan::default();
        info!(
            "Analyzing layer snapshot '{}' (created at {})",
            snapshot.id,
            snapshot.timestamp.as_deref().unwrap_or("unknown time")
        );

        if let Some(anchor) = registry.anchor() {
            if let Some(pin) = snapshot.get(&anchor.name) {
                let phase =
                    self.reconcile_anchor(anchor, pin, options.dry_run, &mut plan, &mut diagnostics)?;
                let outcome = match phase {
                    AnchorPhase::Satisfied => None,
                    AnchorPhase::Blocked => Some(Outcome::AnchorBlocked),
                    AnchorPhase::Pending(commit) => Some(Outcome::AnchorSwitchPending { commit }),
                    AnchorPhase::Switched(commit) => Some(Outcome::RestartRequired { commit }),
                };
                if let Some(outcome) = outcome {
                    return Ok(Report {
                        outcome,
                        plan,
                        diagnostics,
                    });
                }
            }
        }

        if let Some(current_id) = &options.current_id {
            if *current_id != snapshot.id && !snapshot.converted_from_report {
                diagnostics.warn(
                    DiagnosticKind::IdMismatch,
                    None,
                    format!(
                        "Current build id {} does not match snapshot id {}",
                        current_id, snapshot.id
                    ),
                );
            }
        }

        let validated = self.validate_layers(snapshot, registry, &mut plan, &mut diagnostics)?;

        if diagnostics.blocks_activation() {
            error!("Aborting snapshot activation ({})", diagnostics.summary());
            return Ok(Report {
                outcome: Outcome::Aborted,
                plan,
                diagnostics,
            });
        }

        let mut switched = 0;
        for layer in &validated {
            if self.apply_layer(layer, options.dry_run, &mut plan)? {
                switched += 1;
            }
        }

        let outcome = if switched == 0 {
            info!("All layer repositories are already at their requested versions");
            Outcome::UpToDate
        } else if options.dry_run {
            Outcome::WouldSwitch { count: switched }
        } else {
            Outcome::Switched { count: switched }
        };
        Ok(Report {
            outcome,
            plan,
            diagnostics,
        })
    }

    fn reconcile_anchor(
        &self,
        anchor: &LayerDirectory,
        pin: &LayerPin,
        dry_run: bool,
        plan: &mut Plan,
        diagnostics: &mut Diagnostics,
    ) -> Result<AnchorPhase> {
        let path = anchor.path.as_path();
        let Some(desired) = self.git.resolve(path, &pin.reference)? else {
            diagnostics.error(
                DiagnosticKind::AnchorUnresolved,
                Some(&anchor.name),
                format!(
                    "Cannot switch {}: {} '{}' is not present",
                    anchor.name,
                    pin.kind.label(),
                    pin.reference
                ),
            );
            return Ok(AnchorPhase::Blocked);
        };

        let head = self.git.head_commit(path)?;
        if head == desired {
            debug!("{} already at {}", anchor.name, desired);
            return Ok(AnchorPhase::Satisfied);
        }

        if self.git.is_dirty(path)? {
            diagnostics.error(
                DiagnosticKind::AnchorDirty,
                Some(&anchor.name),
                format!(
                    "Cannot switch {} from {} to {} (working tree is dirty), please stash or commit your changes",
                    anchor.name, head, desired
                ),
            );
            return Ok(AnchorPhase::Blocked);
        }

        info!(
            "Switching {} from {} to {}{}",
            anchor.name,
            head,
            desired,
            dry_run_suffix(dry_run)
        );
        plan.push(
            &anchor.name,
            anchor.path.clone(),
            Action::SwitchCommit {
                from: head,
                to: desired.clone(),
            },
        );
        if dry_run {
            return Ok(AnchorPhase::Pending(desired));
        }

        if self.git.active_branch(path)?.is_none() {
            self.git.checkout_previous(path)?;
        }
        self.checkout_commit(path, &desired)?;
        Ok(AnchorPhase::Switched(desired))
    }

    fn validate_layers<'r>(
        &self,
        snapshot: &Snapshot,
        registry: &'r LayerRegistry,
        plan: &mut Plan,
        diagnostics: &mut Diagnostics,
    ) -> Result<Vec<Validated<'r>>> {
        let mut pending: Vec<&str> = snapshot.names();
        let mut validated = Vec::new();

        for directory in registry.directories() {
            let Some(index) = pending.iter().position(|name| *name == directory.name) else {
                diagnostics.warn(
                    DiagnosticKind::UncoveredLayer,
                    Some(&directory.name),
                    format!("Uncovered layer '{}' - not found in snapshot", directory.name),
                );
                continue;
            };
            pending.remove(index);
            let Some(pin) = snapshot.get(&directory.name) else {
                continue;
            };

            let checked = self.validate_layer(directory, pin, diagnostics)?;
            if directory.is_anchor {
                continue;
            }
            match checked {
                Some(layer) => validated.push(layer),
                None => plan.push(
                    &directory.name,
                    directory.path.clone(),
                    Action::Unresolved {
                        reason: format!("{} '{}' is not present", pin.kind.label(), pin.reference),
                    },
                ),
            }
        }

        for name in pending {
            diagnostics.warn(
                DiagnosticKind::UnusedSnapshotLayer,
                Some(name),
                format!("Additional layer '{}' in snapshot - not used in the build", name),
            );
        }

        Ok(validated)
    }

    fn validate_layer<'r>(
        &self,
        directory: &'r LayerDirectory,
        pin: &LayerPin,
        diagnostics: &mut Diagnostics,
    ) -> Result<Option<Validated<'r>>> {
        let path = directory.path.as_path();
        let name = directory.name.as_str();
        let state = self.git.state(path)?;

        if pin.dirty {
            diagnostics.warn(
                DiagnosticKind::DirtyAtCapture,
                Some(name),
                format!("Layer '{}' was dirty: {}", name, pin.reference),
            );
        }

        let mut branch = pin.branch.clone();
        if let Some(declared) = &branch {
            if !state.has_branch(declared) {
                diagnostics.warn(
                    DiagnosticKind::MissingBranch,
                    Some(name),
                    format!("Layer {}: branch '{}' is not present", name, declared),
                );
                branch = None;
            }
        }

        let commit = self.git.resolve(path, &pin.reference)?;
        if commit.is_none() {
            diagnostics.warn(
                DiagnosticKind::UnresolvedVersion,
                Some(name),
                format!(
                    "Layer {}: {} '{}' is not present",
                    name,
                    pin.kind.label(),
                    pin.reference
                ),
            );
        }

        if state.dirty {
            diagnostics.warn_with_detail(
                DiagnosticKind::DirtyRepository,
                Some(name),
                format!(
                    "Layer {} is dirty - please commit or stash your changes first",
                    directory.path.display()
                ),
                self.git.diff(path)?,
            );
        }

        Ok(commit.map(|commit| Validated {
            directory,
            state,
            branch,
            commit,
        }))
    }

    /// Plan and, unless `dry_run`, perform the switches of one layer.
    /// Returns whether anything was (or would be) switched.
    fn apply_layer(&self, layer: &Validated<'_>, dry_run: bool, plan: &mut Plan) -> Result<bool> {
        let directory = layer.directory;
        let path = directory.path.as_path();
        let mut head = layer.state.head.clone();
        let mut detached = layer.state.is_detached();
        let mut changed = false;

        let branch_satisfied = |declared: &str| {
            layer.state.branch.as_deref() == Some(declared) || (detached && head == layer.commit)
        };
        let switch_branch = match &layer.branch {
            Some(declared) if !branch_satisfied(declared) => Some(declared.clone()),
            _ => None,
        };

        if let Some(branch) = switch_branch {
            info!(
                "{}: Switching branch from {} -> {}{}",
                directory.name,
                layer.state.branch_label(),
                branch,
                dry_run_suffix(dry_run)
            );
            plan.push(
                &directory.name,
                directory.path.clone(),
                Action::SwitchBranch {
                    from: layer.state.branch.clone(),
                    to: branch.clone(),
                },
            );
            if dry_run {
                head = self.git.resolve_branch(path, &branch)?.unwrap_or(head);
            } else {
                if detached {
                    self.git.checkout_previous(path)?;
                }
                self.git.checkout(path, &branch)?;
                head = self.git.head_commit(path)?;
            }
            detached = false;
            changed = true;
        }

        if head != layer.commit {
            info!(
                "{}: Switching checked out commit from {} -> {}{}",
                directory.name,
                head,
                layer.commit,
                dry_run_suffix(dry_run)
            );
            plan.push(
                &directory.name,
                directory.path.clone(),
                Action::SwitchCommit {
                    from: head,
                    to: layer.commit.clone(),
                },
            );
            if !dry_run {
                if detached {
                    self.git.checkout_previous(path)?;
                }
                self.checkout_commit(path, &layer.commit)?;
            }
            changed = true;
        }

        if !changed {
            plan.push(&directory.name, directory.path.clone(), Action::Skip);
        }
        Ok(changed)
    }

    fn checkout_commit(&self, path: &Path, commit: &str) -> Result<()> {
        self.git.checkout(path, commit)?;
        let head = self.git.head_commit(path)?;
        if head != commit {
            return Err(Error::Checkout {
                path: path.to_path_buf(),
                reference: commit.to_string(),
                message: format!("HEAD is at {} after checkout", head),
            });
        }
        Ok(())
    }
}
