//! Accumulated validation findings.
//!
//! Every validation step records what it finds in a [`Diagnostics`] value
//! that is threaded through the run and returned to the caller. Whether the
//! plan may be applied is decided from this value alone.

use std::fmt;

use log::{error, info, warn};
use serde::Serialize;

/// How serious a finding is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
}

/// What was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DiagnosticKind {
    /// Snapshot id differs from the id of the current build.
    IdMismatch,
    /// Repository in the build that the snapshot does not mention.
    UncoveredLayer,
    /// Snapshot entry with no repository in the build.
    UnusedSnapshotLayer,
    /// Declared branch does not exist in the repository.
    MissingBranch,
    /// Declared version or commit does not exist in the repository.
    UnresolvedVersion,
    /// Repository has uncommitted changes.
    DirtyRepository,
    /// Repository had uncommitted changes when the snapshot was taken.
    DirtyAtCapture,
    /// Anchor needs to switch but has uncommitted changes.
    AnchorDirty,
    /// Anchor version from the snapshot does not exist.
    AnchorUnresolved,
    /// No reference could be chosen for a repository.
    NoReference,
    /// Chosen reference is neither a branch nor a tag of the repository.
    MissingReference,
}

/// One finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub kind: DiagnosticKind,
    /// Logical layer name the finding is about.
    pub layer: Option<String>,
    pub message: String,
    /// Extra text for operator review, such as a diff.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// Findings of one run, in the order they were raised.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&mut self, diagnostic: Diagnostic) {
        match diagnostic.severity {
            Severity::Warning => warn!("{}", diagnostic.message),
            Severity::Error => error!("{}", diagnostic.message),
        }
        if let Some(detail) = &diagnostic.detail {
            info!("{}", crate::output::indent(detail));
        }
        self.items.push(diagnostic);
    }

    /// Record a warning.
    pub fn warn(
        &mut self,
        kind: DiagnosticKind,
        layer: Option<&str>,
        message: impl Into<String>,
    ) {
        self.record(Diagnostic {
            severity: Severity::Warning,
            kind,
            layer: layer.map(str::to_string),
            message: message.into(),
            detail: None,
        });
    }

    /// Record a warning with text for operator review.
    pub fn warn_with_detail(
        &mut self,
        kind: DiagnosticKind,
        layer: Option<&str>,
        message: impl Into<String>,
        detail: impl Into<String>,
    ) {
        let detail = detail.into();
        self.record(Diagnostic {
            severity: Severity::Warning,
            kind,
            layer: layer.map(str::to_string),
            message: message.into(),
            detail: Some(detail).filter(|d| !d.is_empty()),
        });
    }

    /// Record an error.
    pub fn error(&mut self, kind: DiagnosticKind, layer: Option<&str>, message: impl Into<String>) {
        self.record(Diagnostic {
            severity: Severity::Error,
            kind,
            layer: layer.map(str::to_string),
            message: message.into(),
            detail: None,
        });
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn warning_count(&self) -> usize {
        self.count(Severity::Warning)
    }

    pub fn error_count(&self) -> usize {
        self.count(Severity::Error)
    }

    fn count(&self, severity: Severity) -> usize {
        self.items
            .iter()
            .filter(|item| item.severity == severity)
            .count()
    }

    /// Kinds in the order they were raised.
    pub fn kinds(&self) -> Vec<DiagnosticKind> {
        self.items.iter().map(|item| item.kind).collect()
    }

    /// Any finding at all blocks mutation.
    pub fn blocks_activation(&self) -> bool {
        !self.items.is_empty()
    }

    /// `"2 warning(s), 1 error(s)"`.
    pub fn summary(&self) -> String {
        format!(
            "{} warning(s), {} error(s)",
            self.warning_count(),
            self.error_count()
        )
    }
}
