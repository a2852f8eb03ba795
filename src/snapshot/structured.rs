//! Structured snapshot files.
//!
//! A structured snapshot is an INI document with one `general` section and
//! one section per logical layer name:
//!
//! ```ini
//! [general]
//! id = 0000-32-hwtests
//! timestamp = 2016-09-17 00:42:41
//! machine = buildserver@host
//!
//! [msc-ldk]
//! version = initial-103-gaeccd82
//! dirty = True
//!
//! [meta-openembedded.git]
//! sha1 = 5f2d0c...
//! branch = morty
//! ```
//!
//! The `general` section and its `id` are mandatory, and every layer section
//! needs a `version` or a `sha1`. Anything less is rejected outright rather
//! than reconciled partially.

use std::collections::HashSet;
use std::path::Path;

use ini::{EscapePolicy, Ini, LineSeparator, Properties, WriteOption};

use crate::error::{Error, Result};
use crate::snapshot::{LayerPin, PinKind, Snapshot};

const GENERAL: &str = "general";
const KEY_ID: &str = "id";
const KEY_TIMESTAMP: &str = "timestamp";
const KEY_MACHINE: &str = "machine";
const KEY_COMMENT: &str = "comment";
const KEY_CONVERTED: &str = "version_layer";
const KEY_VERSION: &str = "version";
const KEY_SHA1: &str = "sha1";
const KEY_DIRTY: &str = "dirty";
const KEY_BRANCH: &str = "branch";

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "true" | "1" | "yes" | "on"
    )
}

fn parse_pin(name: &str, properties: &Properties) -> Result<LayerPin> {
    let mut pin = if let Some(version) = properties.get(KEY_VERSION) {
        LayerPin::version(version)
    } else if let Some(sha1) = properties.get(KEY_SHA1) {
        LayerPin::commit(sha1)
    } else {
        return Err(Error::SnapshotFormat {
            message: format!(
                "section [{}] has neither '{}' nor '{}'",
                name, KEY_VERSION, KEY_SHA1
            ),
        });
    };
    pin.dirty = properties.get(KEY_DIRTY).is_some_and(parse_flag);
    pin.branch = properties
        .get(KEY_BRANCH)
        .map(str::trim)
        .filter(|branch| !branch.is_empty())
        .map(str::to_string);
    Ok(pin)
}

/// Parse a structured snapshot document.
pub fn parse_snapshot(content: &str) -> Result<Snapshot> {
    let document = Ini::load_from_str(content)?;

    let general = document
        .section(Some(GENERAL))
        .ok_or_else(|| Error::SnapshotFormat {
            message: format!("missing [{}] section", GENERAL),
        })?;
    let id = general.get(KEY_ID).ok_or_else(|| Error::SnapshotFormat {
        message: format!("missing '{}' in [{}]", KEY_ID, GENERAL),
    })?;

    let mut snapshot = Snapshot::new(id);
    snapshot.timestamp = general.get(KEY_TIMESTAMP).map(str::to_string);
    snapshot.machine = general.get(KEY_MACHINE).map(str::to_string);
    snapshot.comment = general.get(KEY_COMMENT).map(str::to_string);
    snapshot.converted_from_report = general.contains_key(KEY_CONVERTED);

    let mut seen = HashSet::new();
    for (section, properties) in document.iter() {
        let Some(name) = section else {
            continue;
        };
        if name == GENERAL {
            continue;
        }
        if !seen.insert(name) {
            return Err(Error::SnapshotFormat {
                message: format!("duplicate section [{}]", name),
            });
        }
        snapshot.insert(name, parse_pin(name, properties)?);
    }

    Ok(snapshot)
}

/// Read a structured snapshot file.
pub fn read_snapshot(path: &Path) -> Result<Snapshot> {
    let content = std::fs::read_to_string(path)?;
    parse_snapshot(&content)
}

/// Build the INI document for a snapshot.
pub fn to_ini(snapshot: &Snapshot) -> Ini {
    let mut document = Ini::new();
    {
        let mut general = document.with_section(Some(GENERAL));
        general.set(KEY_ID, snapshot.id.as_str());
        if let Some(timestamp) = &snapshot.timestamp {
            general.set(KEY_TIMESTAMP, timestamp.as_str());
        }
        if let Some(machine) = &snapshot.machine {
            general.set(KEY_MACHINE, machine.as_str());
        }
        if let Some(comment) = &snapshot.comment {
            general.set(KEY_COMMENT, comment.as_str());
        }
        if snapshot.converted_from_report {
            general.set(KEY_CONVERTED, "True");
        }
    }

    for entry in snapshot.entries() {
        let mut section = document.with_section(Some(entry.name.as_str()));
        let key = match entry.pin.kind {
            PinKind::Version => KEY_VERSION,
            PinKind::Commit => KEY_SHA1,
        };
        section.set(key, entry.pin.reference.as_str());
        if entry.pin.dirty {
            section.set(KEY_DIRTY, "True");
        }
        if let Some(branch) = &entry.pin.branch {
            section.set(KEY_BRANCH, branch.as_str());
        }
    }

    document
}

/// Render a snapshot as INI text.
pub fn render_snapshot(snapshot: &Snapshot) -> Result<String> {
    let option = WriteOption {
        escape_policy: EscapePolicy::Basics,
        line_separator: LineSeparator::CR,
        kv_separator: " = ",
    };
    let mut buffer = Vec::new();
    to_ini(snapshot).write_to_opt(&mut buffer, option)?;
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}

/// Write a snapshot to a structured snapshot file.
pub fn write_snapshot(snapshot: &Snapshot, path: &Path) -> Result<()> {
    std::fs::write(path, render_snapshot(snapshot)?)?;
    Ok(())
}
