//! Default values for layer-sync configuration.
//!
//! This module provides centralized default values used across commands,
//! ensuring consistency and avoiding duplication.

use std::env;
use std::path::{Path, PathBuf};

/// File name of the project manifest, looked up at the anchor root.
pub const MANIFEST_FILE_NAME: &str = "layer-sync.yaml";

/// Location of the layer list inside a build directory.
pub const LAYER_LIST_FILE: &str = "conf/bblayers.conf";

/// Returns the default manifest path for an anchor root.
pub fn default_manifest_path(anchor_root: &Path) -> PathBuf {
    anchor_root.join(MANIFEST_FILE_NAME)
}

/// Returns the layer list file of a build directory.
pub fn layer_list_path(build_dir: &Path) -> PathBuf {
    build_dir.join(LAYER_LIST_FILE)
}

/// Builder identity recorded in captured snapshots: `$USER@$HOSTNAME`.
///
/// Either half falls back to `unknown` when the variable is unset.
pub fn default_machine() -> String {
    let user = env::var("USER").unwrap_or_else(|_| "unknown".to_string());
    let host = env::var("HOSTNAME").unwrap_or_else(|_| "unknown".to_string());
    format!("{}@{}", user, host)
}
