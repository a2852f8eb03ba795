//! # Project Manifest
//!
//! The manifest is a static, declarative description of the build tree that
//! the launcher and the reconciliation core share. It is loaded once per
//! invocation from `layer-sync.yaml` at the anchor root and replaces any
//! scanning of the filesystem for supported layer categories.
//!
//! Every naming convention the reconciliation core depends on (the reserved
//! anchor name, branch names used by the reference heuristic, the suffix of
//! repository directories) lives here rather than in code.
//!
//! ```yaml
//! anchor: msc-ldk
//! sources_dir: sources
//! refs:
//!   base_branch: morty
//! bsp_aliases:
//!   "0000": [C984, ce85]
//! layer_categories:
//!   - name: hwtests
//!     description: Hardware test layers
//! ```

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use log::debug;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::resolver::RefPolicy;

/// A layer category that can be enabled for a build (e.g. `hwtests`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerCategory {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

impl LayerCategory {
    /// Human readable label; the name when no description is set.
    pub fn label(&self) -> &str {
        if self.description.is_empty() {
            &self.name
        } else {
            &self.description
        }
    }
}

/// The project manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Manifest {
    /// Reserved logical name of the anchor project.
    pub anchor: String,
    /// Sources root, relative to the anchor root.
    pub sources_dir: String,
    /// Suffix of repository directories below the sources root.
    pub repository_suffix: String,
    /// Layer whose logical name is namespaced under the bsp id.
    pub namespaced_layer: String,
    /// Variable holding the layer list in the build configuration.
    pub layer_list_variable: String,
    /// Branch naming conventions used to pick a reference.
    pub refs: RefPolicy,
    /// Canonical bsp id → aliases accepted for it.
    pub bsp_aliases: BTreeMap<String, Vec<String>>,
    /// Layer categories a build may enable.
    pub layer_categories: Vec<LayerCategory>,
}

impl Default for Manifest {
    fn default() -> Self {
        Self {
            anchor: "msc-ldk".to_string(),
            sources_dir: "sources".to_string(),
            repository_suffix: ".git".to_string(),
            namespaced_layer: "msc-ldk-bsp-recipes".to_string(),
            layer_list_variable: "BBLAYERS".to_string(),
            refs: RefPolicy::default(),
            bsp_aliases: BTreeMap::new(),
            layer_categories: Vec::new(),
        }
    }
}

impl Manifest {
    /// Parse a manifest from YAML text.
    pub fn parse(yaml_content: &str) -> Result<Self> {
        if yaml_content.trim().is_empty() {
            return Ok(Self::default());
        }
        let manifest: Manifest = serde_yaml::from_str(yaml_content)?;
        manifest.validate()?;
        Ok(manifest)
    }

    /// Load a manifest from a file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| Error::Manifest {
            message: format!("cannot read {}: {}", path.as_ref().display(), e),
        })?;
        Self::parse(&content)
    }

    /// Load the manifest at `path` if it exists, the defaults otherwise.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            debug!("Loading manifest {}", path.display());
            Self::from_file(path)
        } else {
            debug!("No manifest at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    fn validate(&self) -> Result<()> {
        if self.anchor.trim().is_empty() {
            return Err(Error::Manifest {
                message: "'anchor' must not be empty".to_string(),
            });
        }
        if self.layer_list_variable.trim().is_empty() {
            return Err(Error::Manifest {
                message: "'layer_list_variable' must not be empty".to_string(),
            });
        }
        let mut seen = HashMap::new();
        for (canonical, aliases) in &self.bsp_aliases {
            for alias in aliases {
                if let Some(previous) = seen.insert(alias.as_str(), canonical.as_str()) {
                    if previous != canonical {
                        return Err(Error::Manifest {
                            message: format!(
                                "bsp alias '{}' maps to both '{}' and '{}'",
                                alias, previous, canonical
                            ),
                        });
                    }
                }
            }
        }
        Ok(())
    }

    /// Alias → canonical bsp id lookup table.
    pub fn bsp_alias_map(&self) -> HashMap<String, String> {
        self.bsp_aliases
            .iter()
            .flat_map(|(canonical, aliases)| {
                aliases
                    .iter()
                    .map(move |alias| (alias.clone(), canonical.clone()))
            })
            .collect()
    }

    /// Canonical bsp id for `bsp`, which may already be canonical.
    pub fn canonical_bsp(&self, bsp: &str) -> String {
        self.bsp_alias_map()
            .get(bsp)
            .cloned()
            .unwrap_or_else(|| bsp.to_string())
    }

    /// Whether `bsp` names a board: either a known alias or a well formed bsp
    /// number (two alphanumerics followed by digits, e.g. `0000` or `C984`).
    pub fn is_known_bsp(&self, bsp: &str) -> Result<bool> {
        let well_formed = Regex::new(r"^[[:alnum:]]{2}[0-9]+$")?;
        Ok(well_formed.is_match(bsp)
            || self.bsp_aliases.contains_key(bsp)
            || self.bsp_alias_map().contains_key(bsp))
    }

    /// Names of all declared layer categories, in manifest order.
    pub fn category_names(&self) -> Vec<&str> {
        self.layer_categories
            .iter()
            .map(|category| category.name.as_str())
            .collect()
    }

    /// Look up a layer category by name.
    pub fn category(&self, name: &str) -> Option<&LayerCategory> {
        self.layer_categories
            .iter()
            .find(|category| category.name == name)
    }
}
