//! # Build-Tree Layer List Parsing
//!
//! Extracts the ordered list of layer directories from a build configuration
//! file such as `conf/bblayers.conf`:
//!
//! ```text
//! BBLAYERS ?= " \
//!   /ldk/sources/poky.git/meta \
//!   /ldk/sources/meta-openembedded.git/meta-oe \
//!   "
//! ```
//!
//! The scanner has three states: it seeks the line that starts the
//! assignment, accumulates backslash-continued lines until a closing quote
//! shows up, and then stops looking. Paths keep their textual order and
//! duplicates are preserved.
//!
//! ## Unterminated lists
//!
//! If the closing quote never appears, scanning stops at the end of the input
//! and everything accumulated so far is returned as a best-effort list. The
//! result records this as [`ListTermination::Unterminated`] and a warning is
//! logged, so callers can decide whether to trust it.

use std::path::Path;

use log::warn;

use crate::error::{Error, Result};

/// How the scan of the assignment ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListTermination {
    /// The closing quote was found.
    Closed,
    /// End of input was reached before the closing quote.
    Unterminated,
    /// No assignment to the variable exists in the input.
    Missing,
}

/// The parsed layer list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerList {
    /// Layer paths in textual order.
    pub paths: Vec<String>,
    pub termination: ListTermination,
}

enum ScanState {
    Seeking,
    Accumulating,
    Done,
}

/// Parse the value of the `variable` assignment out of `content`.
pub fn parse_layer_list(content: &str, variable: &str) -> LayerList {
    let prefix = format!("{} ", variable);
    let mut state = ScanState::Seeking;
    let mut accumulated = String::new();

    for line in content.lines() {
        let line = line.trim_end();
        match state {
            ScanState::Seeking => {
                if !line.starts_with(&prefix) {
                    continue;
                }
                let value = line.split_once('"').map_or("", |(_, value)| value);
                if let Some((inner, _)) = value.split_once('"') {
                    accumulated.push_str(inner);
                    state = ScanState::Done;
                } else {
                    accumulated.push_str(value.trim_end_matches('\\'));
                    accumulated.push(' ');
                    state = ScanState::Accumulating;
                }
            }
            ScanState::Accumulating => {
                if let Some((inner, _)) = line.split_once('"') {
                    accumulated.push_str(inner);
                    state = ScanState::Done;
                } else {
                    accumulated.push_str(line.trim_end_matches('\\'));
                    accumulated.push(' ');
                }
            }
            ScanState::Done => break,
        }
    }

    let termination = match state {
        ScanState::Seeking => ListTermination::Missing,
        ScanState::Accumulating => {
            warn!(
                "{} assignment has no closing quote, using the {} path(s) read so far",
                variable,
                accumulated.split_whitespace().count()
            );
            ListTermination::Unterminated
        }
        ScanState::Done => ListTermination::Closed,
    };

    LayerList {
        paths: accumulated.split_whitespace().map(str::to_string).collect(),
        termination,
    }
}

/// Read and parse the layer list of a build configuration file.
///
/// A file without any assignment to `variable` is an error; an unterminated
/// assignment is not (see the module docs).
pub fn read_layer_list(path: &Path, variable: &str) -> Result<LayerList> {
    let content = std::fs::read_to_string(path).map_err(|e| Error::LayerList {
        message: format!("cannot read {}: {}", path.display(), e),
    })?;
    let list = parse_layer_list(&content, variable);
    if list.termination == ListTermination::Missing {
        return Err(Error::LayerList {
            message: format!("no {} assignment in {}", variable, path.display()),
        });
    }
    Ok(list)
}
