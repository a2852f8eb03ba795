//! # Version Report Parsing
//!
//! Older builds record their layer versions in a plain text report:
//!
//! ```text
//! MSC-LDK initial-103-gaeccd82-dirty built on Sat Sep 17 00:42:41 CEST 2016 by buildserver@host
//! --bsp=0000 --variant=32 --layers-hwtests --re-create-conf
//! LAYER meta-openembedded=LC984_20160504_V1_0_0
//! LAYER msc-ldk-bsp-recipes=v2.1-dirty
//! ```
//!
//! The report is read in two passes. The first pass finds the anchor version
//! line (version, build time, builder machine) and the build options line
//! (bsp, variant, enabled layer categories), which together yield the
//! snapshot id. The second pass reads the `LAYER` lines; it needs the bsp id
//! from the first pass because one layer name is namespaced under it.
//!
//! Any `LAYER` line without `=` makes the whole report unusable: a partial
//! snapshot is never returned.

use std::collections::HashMap;

use chrono::NaiveDateTime;
use log::debug;

use crate::error::{Error, Result};
use crate::manifest::Manifest;
use crate::snapshot::{format_timestamp, now_timestamp, BuildId, LayerPin, Snapshot};

const BUILT_ON_MARKER: &str = " built on ";
const BUILT_BY_MARKER: &str = " by ";
const BUILD_TIME_FORMAT: &str = "%a %b %d %H:%M:%S %Y";
const LAYER_PREFIX: &str = "LAYER ";
const DIRTY_SUFFIX: &str = "-dirty";
const UNKNOWN_BSP: &str = "???";

/// Naming conventions needed to turn report names into logical names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportOptions {
    /// Logical name of the anchor entry.
    pub anchor: String,
    /// Layer that is namespaced under the bsp id.
    pub namespaced_layer: String,
    /// Appended to every `LAYER` name.
    pub repository_suffix: String,
    /// Alias → canonical bsp id.
    pub bsp_aliases: HashMap<String, String>,
}

impl ReportOptions {
    pub fn from_manifest(manifest: &Manifest) -> Self {
        Self {
            anchor: manifest.anchor.clone(),
            namespaced_layer: manifest.namespaced_layer.clone(),
            repository_suffix: manifest.repository_suffix.clone(),
            bsp_aliases: manifest.bsp_alias_map(),
        }
    }
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self::from_manifest(&Manifest::default())
    }
}

/// Split a `-dirty` suffix off a version token.
fn split_dirty(token: &str) -> (&str, bool) {
    match token.strip_suffix(DIRTY_SUFFIX) {
        Some(version) => (version, true),
        None => (token, false),
    }
}

struct AnchorLine {
    version: String,
    dirty: bool,
    timestamp: Option<String>,
    machine: String,
}

fn parse_anchor_line(line: &str, line_no: usize) -> Result<AnchorLine> {
    let (head, time_and_machine) =
        line.split_once(BUILT_ON_MARKER)
            .ok_or_else(|| Error::SnapshotParse {
                message: "missing ' built on ' marker".to_string(),
                line: Some(line_no),
            })?;
    let token = head
        .split_whitespace()
        .nth(1)
        .ok_or_else(|| Error::SnapshotParse {
            message: format!("no version token before '{}'", BUILT_ON_MARKER.trim()),
            line: Some(line_no),
        })?;
    let (version, dirty) = split_dirty(token);

    let (time_str, machine) = time_and_machine
        .split_once(BUILT_BY_MARKER)
        .unwrap_or((time_and_machine, ""));
    // `date` output: the zone name sits between the time and the year
    let mut fields: Vec<&str> = time_str.split_whitespace().collect();
    if fields.len() == 6 {
        fields.remove(4);
    }
    let timestamp = match NaiveDateTime::parse_from_str(&fields.join(" "), BUILD_TIME_FORMAT) {
        Ok(timestamp) => Some(format_timestamp(&timestamp)),
        Err(e) => {
            debug!("Ignoring unparsable build time '{}': {}", time_str, e);
            None
        }
    };

    Ok(AnchorLine {
        version: version.to_string(),
        dirty,
        timestamp,
        machine: machine.trim().to_string(),
    })
}

fn parse_options_line(line: &str, aliases: &HashMap<String, String>) -> BuildId {
    let mut bsp = UNKNOWN_BSP.to_string();
    let mut variant = None;
    let mut categories = Vec::new();

    for option in line.split_whitespace() {
        let (name, value) = option.split_once('=').unwrap_or((option, ""));
        if name == "--bsp" {
            bsp = aliases
                .get(value)
                .cloned()
                .unwrap_or_else(|| value.to_string());
        } else if name == "--variant" {
            variant = Some(value.to_string()).filter(|v| !v.is_empty());
        } else if let Some(category) = name.strip_prefix("--layers-") {
            categories.push(category.to_string());
        }
    }

    BuildId {
        bsp,
        variant,
        categories,
    }
}

/// Parse a version report into a snapshot.
pub fn parse_version_report(content: &str, options: &ReportOptions) -> Result<Snapshot> {
    // Pass 1: anchor version line and build options line
    let mut anchor = None;
    let mut build_id = None;
    for (index, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.contains(BUILT_ON_MARKER) {
            anchor = Some(parse_anchor_line(line, index + 1)?);
        } else if line.contains("--bsp") {
            build_id = Some(parse_options_line(line, &options.bsp_aliases));
        }
    }

    let anchor = anchor.ok_or_else(|| Error::SnapshotParse {
        message: format!("no line containing '{}'", BUILT_ON_MARKER.trim()),
        line: None,
    })?;
    let build_id = build_id.ok_or_else(|| Error::SnapshotParse {
        message: "no build options line (--bsp=...)".to_string(),
        line: None,
    })?;

    let mut snapshot = Snapshot::new(build_id.compose());
    snapshot.timestamp = anchor.timestamp;
    snapshot.machine = Some(anchor.machine);
    snapshot.comment = Some(format!("Converted version report on {}", now_timestamp()));
    snapshot.converted_from_report = true;
    snapshot.insert(
        options.anchor.clone(),
        LayerPin::version(anchor.version).with_dirty(anchor.dirty),
    );

    // Pass 2: LAYER lines
    for (index, line) in content.lines().enumerate() {
        let line = line.trim();
        let Some(entry) = line.strip_prefix(LAYER_PREFIX) else {
            continue;
        };
        let (layer, token) = entry.split_once('=').ok_or_else(|| Error::SnapshotParse {
            message: format!("LAYER line without '=': '{}'", line),
            line: Some(index + 1),
        })?;
        let layer = layer.trim();
        let name = if layer == options.namespaced_layer {
            format!("{}/{}{}", build_id.bsp, layer, options.repository_suffix)
        } else {
            format!("{}{}", layer, options.repository_suffix)
        };
        let (version, dirty) = split_dirty(token.trim());
        snapshot.insert(name, LayerPin::version(version).with_dirty(dirty));
    }

    Ok(snapshot)
}
