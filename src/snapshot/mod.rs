//! # Layer Snapshots
//!
//! A snapshot pins every layer repository of a build tree to an exact
//! version, commit and optionally a branch, so that a build can be
//! reproduced later. This module holds the in-memory model shared by the
//! two on-disk representations:
//!
//! - **Structured snapshots** ([`structured`]): a section-keyed INI document
//!   that is both read and written by this crate.
//! - **Version reports** ([`legacy`]): the line-oriented text report emitted
//!   by older builds, which can only be read (and converted).
//!
//! [`capture`] produces a snapshot from the live state of a build tree.
//!
//! A [`Snapshot`] is built once per request and never modified afterwards by
//! the reconciliation engine.

pub mod capture;
pub mod legacy;
pub mod structured;

use std::fmt;
use std::path::Path;

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::error::Result;

pub use legacy::{parse_version_report, ReportOptions};

/// Format used for snapshot timestamps.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Render a timestamp the way snapshots store it.
pub fn format_timestamp(timestamp: &NaiveDateTime) -> String {
    timestamp.format(TIMESTAMP_FORMAT).to_string()
}

/// The current local time, formatted for a snapshot.
pub fn now_timestamp() -> String {
    format_timestamp(&chrono::Local::now().naive_local())
}

/// Whether a layer is pinned by a symbolic version or by a raw commit id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PinKind {
    /// A tag or `git describe` style name.
    Version,
    /// A commit id.
    Commit,
}

impl PinKind {
    /// Label used in operator messages.
    pub fn label(&self) -> &'static str {
        match self {
            PinKind::Version => "Version",
            PinKind::Commit => "SHA1",
        }
    }
}

/// What a snapshot declares for one layer repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LayerPin {
    /// The version or commit the repository must be at.
    pub reference: String,
    pub kind: PinKind,
    /// The repository had uncommitted changes when the snapshot was taken.
    pub dirty: bool,
    /// Branch the repository must be on, if any.
    pub branch: Option<String>,
}

impl LayerPin {
    /// Pin to a version, clean, no branch requirement.
    pub fn version(reference: impl Into<String>) -> Self {
        Self {
            reference: reference.into(),
            kind: PinKind::Version,
            dirty: false,
            branch: None,
        }
    }

    /// Pin to a commit id, clean, no branch requirement.
    pub fn commit(reference: impl Into<String>) -> Self {
        Self {
            reference: reference.into(),
            kind: PinKind::Commit,
            dirty: false,
            branch: None,
        }
    }

    pub fn with_branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = Some(branch.into());
        self
    }

    pub fn with_dirty(mut self, dirty: bool) -> Self {
        self.dirty = dirty;
        self
    }
}

/// One named entry of a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SnapshotEntry {
    /// Logical layer name (path below the sources root, or the anchor name).
    pub name: String,
    pub pin: LayerPin,
}

/// A declarative record of the version of every layer repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    /// Composite build id, e.g. `0000-32-hwtests`.
    pub id: String,
    pub timestamp: Option<String>,
    /// Identity of the machine that produced the build.
    pub machine: Option<String>,
    pub comment: Option<String>,
    /// The snapshot was converted from a version report.
    pub converted_from_report: bool,
    entries: Vec<SnapshotEntry>,
}

impl Snapshot {
    /// Create an empty snapshot with the given id.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            timestamp: None,
            machine: None,
            comment: None,
            converted_from_report: false,
            entries: Vec::new(),
        }
    }

    /// Insert or replace the pin for `name`.
    ///
    /// Replacing keeps the entry at its original position, so names stay
    /// unique and the first-seen order is preserved.
    pub fn insert(&mut self, name: impl Into<String>, pin: LayerPin) {
        let name = name.into();
        match self.entries.iter_mut().find(|entry| entry.name == name) {
            Some(entry) => entry.pin = pin,
            None => self.entries.push(SnapshotEntry { name, pin }),
        }
    }

    pub fn get(&self, name: &str) -> Option<&LayerPin> {
        self.entries
            .iter()
            .find(|entry| entry.name == name)
            .map(|entry| &entry.pin)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Entries in insertion order.
    pub fn entries(&self) -> &[SnapshotEntry] {
        &self.entries
    }

    /// Logical names in insertion order.
    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|entry| entry.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// The on-disk representation of a snapshot file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotFormat {
    /// Section-keyed INI document.
    Structured,
    /// Line-oriented version report.
    VersionReport,
}

impl SnapshotFormat {
    /// Guess the format from file content: a structured snapshot opens with
    /// a section header, anything else is treated as a version report.
    pub fn detect(content: &str) -> Self {
        let first = content
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty() && !line.starts_with('#') && !line.starts_with(';'));
        match first {
            Some(line) if line.starts_with('[') => SnapshotFormat::Structured,
            _ => SnapshotFormat::VersionReport,
        }
    }
}

/// Load a snapshot file, detecting its format.
pub fn load_snapshot(path: &Path, options: &ReportOptions) -> Result<Snapshot> {
    let content = std::fs::read_to_string(path)?;
    match SnapshotFormat::detect(&content) {
        SnapshotFormat::Structured => structured::parse_snapshot(&content),
        SnapshotFormat::VersionReport => parse_version_report(&content, options),
    }
}

/// The build configuration encoded in a snapshot id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildId {
    pub bsp: String,
    pub variant: Option<String>,
    /// Enabled layer categories.
    pub categories: Vec<String>,
}

impl BuildId {
    /// Compose the id string: `[bsp, variant?, ...sorted categories]` joined
    /// with `-`.
    pub fn compose(&self) -> String {
        let mut categories = self.categories.clone();
        categories.sort();
        let mut elements = vec![self.bsp.clone()];
        if let Some(variant) = self.variant.as_ref().filter(|v| !v.is_empty()) {
            elements.push(variant.clone());
        }
        elements.extend(categories);
        elements.join("-")
    }

    /// Split an id back into its parts.
    ///
    /// The first element is the bsp. Elements naming one of
    /// `known_categories` are categories; any other element is taken as the
    /// variant (the last one wins if there are several).
    pub fn parse(id: &str, known_categories: &[&str]) -> Self {
        let mut elements = id.split('-');
        let bsp = elements.next().unwrap_or_default().to_string();
        let mut variant = None;
        let mut categories = Vec::new();
        for element in elements {
            if known_categories.contains(&element) {
                categories.push(element.to_string());
            } else {
                variant = Some(element.to_string());
            }
        }
        Self {
            bsp,
            variant,
            categories,
        }
    }
}

impl fmt::Display for BuildId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.compose())
    }
}
