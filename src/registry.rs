//! # Layer Registry
//!
//! Maps the layer directories listed in the build configuration back to the
//! repositories that own them. One repository may serve several build layers
//! (e.g. `meta-openembedded` serves `meta-oe`, `meta-python`, ...), so the
//! registry groups layer paths by the nearest ancestor directory containing
//! `.git`.
//!
//! Each repository gets a logical name: its path relative to the sources
//! root, or the reserved anchor name for the anchor project itself. These are
//! the names snapshot entries are matched against.
//!
//! The anchor always comes first; the other repositories follow in the order
//! their first layer appears in the build configuration.

use std::path::{Path, PathBuf};

use log::{debug, warn};
use serde::Serialize;

use crate::bblayers::read_layer_list;
use crate::defaults::layer_list_path;
use crate::error::{Error, Result};
use crate::manifest::Manifest;

/// A repository working tree wired into the build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LayerDirectory {
    /// Absolute path of the working tree.
    pub path: PathBuf,
    /// Logical name, unique within the registry.
    pub name: String,
    /// Build layers served by this repository, relative to the sources root.
    pub layers: Vec<String>,
    pub is_anchor: bool,
}

impl LayerDirectory {
    /// `", Layer: a"` / `", Layers: a, b"` / `""`, for listings.
    pub fn layer_summary(&self) -> String {
        match self.layers.len() {
            0 => String::new(),
            1 => format!(", Layer: {}", self.layers[0]),
            _ => format!(", Layers: {}", self.layers.join(", ")),
        }
    }
}

/// The repositories currently wired into the build, in build order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LayerRegistry {
    directories: Vec<LayerDirectory>,
}

/// Find the nearest ancestor of `start` (inclusive) that contains `.git`.
pub fn find_repository_root(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|candidate| candidate.join(".git").exists())
        .map(Path::to_path_buf)
}

/// Find the anchor project root above `start`.
pub fn find_anchor_root(start: &Path) -> Result<PathBuf> {
    find_repository_root(start).ok_or_else(|| Error::Registry {
        message: format!(
            "no git repository found at or above {}",
            start.display()
        ),
    })
}

/// Absolute form of `path` with `..` and symlinks resolved; `path` itself
/// when it does not exist.
fn canonical(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

fn relative_name(path: &Path, sources_root: &Path) -> String {
    match path.strip_prefix(sources_root) {
        Ok(relative) if !relative.as_os_str().is_empty() => relative.display().to_string(),
        _ => path.display().to_string(),
    }
}

impl LayerRegistry {
    /// Build a registry from the layer paths of a build configuration.
    ///
    /// Relative layer paths are taken relative to `anchor_root`. A layer path
    /// with no repository above it is reported and left out.
    pub fn discover(
        anchor_root: &Path,
        sources_root: &Path,
        anchor_name: &str,
        layer_paths: &[String],
    ) -> Self {
        // logical names are derived by comparing paths, so compare canonical ones
        let anchor_root = canonical(anchor_root);
        let sources_root = canonical(sources_root);
        let anchor_root = anchor_root.as_path();
        let sources_root = sources_root.as_path();

        let mut directories = vec![LayerDirectory {
            path: anchor_root.to_path_buf(),
            name: anchor_name.to_string(),
            layers: Vec::new(),
            is_anchor: true,
        }];

        for layer in layer_paths {
            let layer_path = canonical(&anchor_root.join(layer));
            let Some(root) = find_repository_root(&layer_path) else {
                warn!("Layer {} is not inside a git repository", layer);
                continue;
            };
            let layer_name = relative_name(&layer_path, sources_root);
            match directories.iter_mut().find(|dir| dir.path == root) {
                Some(directory) => directory.layers.push(layer_name),
                None => {
                    let name = if root == anchor_root {
                        anchor_name.to_string()
                    } else {
                        relative_name(&root, sources_root)
                    };
                    debug!("Layer {} belongs to repository {}", layer_name, name);
                    directories.push(LayerDirectory {
                        path: root,
                        name,
                        layers: vec![layer_name],
                        is_anchor: false,
                    });
                }
            }
        }

        Self { directories }
    }

    /// Read the build configuration of `build_dir` and discover its layers.
    pub fn load(anchor_root: &Path, build_dir: &Path, manifest: &Manifest) -> Result<Self> {
        let list = read_layer_list(&layer_list_path(build_dir), &manifest.layer_list_variable)?;
        let sources_root = anchor_root.join(&manifest.sources_dir);
        Ok(Self::discover(
            anchor_root,
            &sources_root,
            &manifest.anchor,
            &list.paths,
        ))
    }

    /// Build a registry from known directories; the first one is the anchor.
    pub fn from_directories(directories: Vec<LayerDirectory>) -> Self {
        Self { directories }
    }

    /// All repositories, anchor first.
    pub fn directories(&self) -> &[LayerDirectory] {
        &self.directories
    }

    pub fn anchor(&self) -> Option<&LayerDirectory> {
        self.directories.iter().find(|dir| dir.is_anchor)
    }

    /// Every repository except the anchor, in build order.
    pub fn layers(&self) -> impl Iterator<Item = &LayerDirectory> {
        self.directories.iter().filter(|dir| !dir.is_anchor)
    }

    pub fn get(&self, name: &str) -> Option<&LayerDirectory> {
        self.directories.iter().find(|dir| dir.name == name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.directories.iter().map(|dir| dir.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.directories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.directories.is_empty()
    }
}
