//! # CLI Command Implementations
//!
//! This module contains the implementation for each subcommand of the
//! `layer-sync` command-line tool. Each subcommand is defined in its own file.
//!
//! ## Structure
//!
//! Each command module typically contains:
//! - An `Args` struct that defines the command-specific arguments and options,
//!   derived using `clap`.
//! - An `execute` function that takes the parsed `Args`, calls into the
//!   `layer_sync` library, and returns the process exit code.
//!
//! Commands that work on a build tree share [`TreeArgs`] for locating the
//! anchor project, the manifest and the build directory.

pub mod capture;
pub mod convert;
pub mod layers;
pub mod reconcile;
pub mod resolve_ref;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use log::debug;

use layer_sync::defaults::default_manifest_path;
use layer_sync::manifest::Manifest;
use layer_sync::registry::{find_anchor_root, find_repository_root, LayerRegistry};

/// Options locating the build tree.
#[derive(Args, Debug, Clone)]
pub struct TreeArgs {
    /// Root of the anchor project.
    ///
    /// Defaults to the nearest directory at or above the current one that
    /// contains `.git`.
    #[arg(long, value_name = "DIR", env = "LAYER_SYNC_ROOT")]
    pub root: Option<PathBuf>,

    /// Project manifest. Defaults to `layer-sync.yaml` in the anchor root.
    #[arg(long, value_name = "FILE", env = "LAYER_SYNC_MANIFEST")]
    pub manifest: Option<PathBuf>,

    /// Build directory holding `conf/bblayers.conf`.
    #[arg(long, value_name = "DIR", default_value = ".")]
    pub build_dir: PathBuf,
}

/// The loaded build tree.
pub struct BuildTree {
    pub manifest: Manifest,
    pub registry: LayerRegistry,
}

impl TreeArgs {
    pub fn anchor_root(&self) -> Result<PathBuf> {
        match &self.root {
            Some(root) => Ok(root.clone()),
            None => {
                let current = std::env::current_dir().context("Cannot determine current directory")?;
                Ok(find_anchor_root(&current)?)
            }
        }
    }

    pub fn load(&self) -> Result<BuildTree> {
        let anchor_root = self.anchor_root()?;
        debug!("Anchor root: {}", anchor_root.display());
        let manifest = load_manifest(self.manifest.as_deref(), Some(&anchor_root))?;
        let registry = LayerRegistry::load(&anchor_root, &self.build_dir, &manifest)
            .with_context(|| format!("Cannot read the layers of {}", self.build_dir.display()))?;
        Ok(BuildTree { manifest, registry })
    }
}

/// Load the manifest from `explicit`, or from the default location in
/// `anchor_root` (searched from the current directory when `None`), falling
/// back to the built-in defaults.
pub fn load_manifest(explicit: Option<&Path>, anchor_root: Option<&Path>) -> Result<Manifest> {
    if let Some(path) = explicit {
        return Manifest::from_file(path)
            .with_context(|| format!("Failed to load manifest {}", path.display()));
    }
    let anchor_root = match anchor_root {
        Some(root) => Some(root.to_path_buf()),
        None => find_repository_root(&std::env::current_dir()?),
    };
    match anchor_root {
        Some(root) => Ok(Manifest::load_or_default(default_manifest_path(&root))?),
        None => Ok(Manifest::default()),
    }
}
