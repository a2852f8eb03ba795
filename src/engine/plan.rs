//! The reconciliation plan.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

use crate::repository::short_id;

/// What happens to one repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "kebab-case")]
pub enum Action {
    /// Already at the declared state.
    Skip,
    SwitchBranch { from: Option<String>, to: String },
    SwitchCommit { from: String, to: String },
    /// Left out of the plan because validation failed.
    Unresolved { reason: String },
}

impl Action {
    /// Whether the action mutates the repository.
    pub fn is_switch(&self) -> bool {
        matches!(self, Action::SwitchBranch { .. } | Action::SwitchCommit { .. })
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Skip => write!(f, "already at requested version"),
            Action::SwitchBranch { from, to } => write!(
                f,
                "switch branch {} -> {}",
                from.as_deref().unwrap_or("detached"),
                to
            ),
            Action::SwitchCommit { from, to } => {
                write!(f, "switch commit {} -> {}", short_id(from), short_id(to))
            }
            Action::Unresolved { reason } => write!(f, "unresolved: {}", reason),
        }
    }
}

/// One action for one logical layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlanStep {
    pub layer: String,
    pub path: PathBuf,
    #[serde(flatten)]
    pub action: Action,
}

impl fmt::Display for PlanStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.layer, self.action)
    }
}

/// Ordered actions, in build order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Plan {
    steps: Vec<PlanStep>,
}

impl Plan {
    pub fn push(&mut self, layer: &str, path: PathBuf, action: Action) {
        self.steps.push(PlanStep {
            layer: layer.to_string(),
            path,
            action,
        });
    }

    pub fn steps(&self) -> &[PlanStep] {
        &self.steps
    }

    /// Steps that mutate a repository.
    pub fn switches(&self) -> impl Iterator<Item = &PlanStep> {
        self.steps.iter().filter(|step| step.action.is_switch())
    }

    /// Actions planned for `layer`.
    pub fn actions_for(&self, layer: &str) -> Vec<&Action> {
        self.steps
            .iter()
            .filter(|step| step.layer == layer)
            .map(|step| &step.action)
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}
