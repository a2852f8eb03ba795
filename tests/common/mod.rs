//! Shared test utilities for integration and E2E tests.
//!
//! [`BuildTreeFixture`] creates a throwaway build tree made of real git
//! repositories: an anchor project with layer repositories below its
//! `sources/` directory and a build directory whose `conf/bblayers.conf`
//! lists their layers.
//!
//! ## Usage
//!
//! ```rust,ignore
//! mod common;
//! use common::prelude::*;
//!
//! #[test]
//! #[cfg_attr(not(feature = "integration-tests"), ignore)]
//! fn test_example() {
//!     let tree = BuildTreeFixture::new().with_layer_repo("poky.git", &["meta"]);
//!     tree.write_layer_list();
//!     tree.command().arg("layers").assert().success();
//! }
//! ```

use assert_fs::prelude::*;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Re-export commonly used test dependencies for convenience.
pub mod prelude {
    pub use assert_cmd::cargo::cargo_bin_cmd;
    pub use assert_fs::prelude::*;
    #[allow(unused_imports)]
    pub use assert_fs::TempDir;
    pub use predicates::prelude::*;

    #[allow(unused_imports)]
    pub use super::{git, head_of, reports, BuildTreeFixture};
}

/// Version report snippets for testing.
#[allow(dead_code)]
pub mod reports {
    /// A report with a dirty anchor and two layers.
    pub const BASIC: &str = "\
MSC-LDK initial-103-gaeccd82-dirty built on Sat Sep 17 00:42:41 CEST 2016 by buildserver@host
--bsp=0000 --variant=32 --layers-hwtests --re-create-conf
LAYER meta-openembedded=LC984_20160504_V1_0_0
LAYER msc-ldk-bsp-recipes=v2.1-dirty
";

    /// A report with a LAYER line missing its `=`.
    pub const MALFORMED: &str = "\
MSC-LDK v1 built on Sat Sep 17 00:42:41 CEST 2016 by buildserver@host
--bsp=0000
LAYER meta-openembedded
";
}

/// Run `git` in `dir` and return its trimmed stdout; panics on failure.
pub fn git(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .args(["-c", "user.name=Test", "-c", "user.email=test@example.com"])
        .args(args)
        .current_dir(dir)
        .output()
        .expect("Failed to run git");
    assert!(
        output.status.success(),
        "git {:?} failed in {}: {}",
        args,
        dir.display(),
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

/// Commit id a revision resolves to.
#[allow(dead_code)]
pub fn head_of(dir: &Path, rev: &str) -> String {
    git(dir, &["rev-parse", rev])
}

fn init_repository(dir: &Path, files: &[&str]) {
    std::fs::create_dir_all(dir).expect("Failed to create repository directory");
    git(dir, &["init", "--quiet", "--initial-branch=develop"]);
    for file in files {
        let path = dir.join(file);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create directory");
        }
        std::fs::write(&path, "v1\n").expect("Failed to write file");
    }
    git(dir, &["add", "--all"]);
    git(dir, &["commit", "--quiet", "-m", "first"]);
    git(dir, &["tag", "v1.0"]);
}

/// A build tree of real git repositories in a temporary directory.
pub struct BuildTreeFixture {
    temp_dir: assert_fs::TempDir,
    /// `(repository, layer subdirectories)` in build order.
    layers: Vec<(String, Vec<String>)>,
}

#[allow(dead_code)]
impl BuildTreeFixture {
    /// Create the anchor repository (branch `develop`, tag `v1.0`).
    pub fn new() -> Self {
        let temp_dir = assert_fs::TempDir::new().expect("Failed to create temp directory");
        let fixture = Self {
            temp_dir,
            layers: Vec::new(),
        };
        init_repository(&fixture.anchor(), &["README", ".gitignore"]);
        std::fs::write(fixture.anchor().join(".gitignore"), "sources/\nbuild/\n")
            .expect("Failed to write .gitignore");
        git(&fixture.anchor(), &["commit", "--quiet", "-am", "ignore tree"]);
        std::fs::create_dir_all(fixture.build_dir().join("conf"))
            .expect("Failed to create build directory");
        fixture
    }

    /// Add a layer repository below `sources/` serving `layers`.
    ///
    /// The repository is on `develop` with two commits: `v1.0` and `v1.1`.
    pub fn with_layer_repo(mut self, name: &str, layers: &[&str]) -> Self {
        let dir = self.repo(name);
        let files: Vec<String> = layers
            .iter()
            .map(|layer| format!("{}/conf/layer.conf", layer))
            .collect();
        let files: Vec<&str> = files.iter().map(String::as_str).collect();
        init_repository(&dir, &files);
        std::fs::write(dir.join("CHANGELOG"), "v1.1\n").expect("Failed to write file");
        git(&dir, &["add", "CHANGELOG"]);
        git(&dir, &["commit", "--quiet", "-m", "second"]);
        git(&dir, &["tag", "v1.1"]);
        self.layers.push((
            name.to_string(),
            layers.iter().map(|layer| layer.to_string()).collect(),
        ));
        self
    }

    /// Write `build/conf/bblayers.conf` listing every layer added so far.
    pub fn write_layer_list(&self) {
        let mut content = String::from("BBPATH = \"${TOPDIR}\"\n\nBBLAYERS ?= \" \\\n");
        for (repo, layers) in &self.layers {
            for layer in layers {
                content.push_str(&format!("  {} \\\n", self.repo(repo).join(layer).display()));
            }
        }
        content.push_str("  \"\n");
        self.temp_dir
            .child("ldk/build/conf/bblayers.conf")
            .write_str(&content)
            .expect("Failed to write bblayers.conf");
    }

    /// Write `layer-sync.yaml` in the anchor root.
    pub fn with_manifest(self, content: &str) -> Self {
        self.temp_dir
            .child("ldk/layer-sync.yaml")
            .write_str(content)
            .expect("Failed to write manifest");
        self
    }

    pub fn anchor(&self) -> PathBuf {
        self.temp_dir.path().join("ldk")
    }

    pub fn build_dir(&self) -> PathBuf {
        self.anchor().join("build")
    }

    /// Path of a layer repository.
    pub fn repo(&self, name: &str) -> PathBuf {
        self.anchor().join("sources").join(name)
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// A `layer-sync` command running in the build directory of this tree.
    pub fn command(&self) -> assert_cmd::Command {
        let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("layer-sync");
        cmd.current_dir(self.build_dir())
            .env("LAYER_SYNC_ROOT", self.anchor())
            .env_remove("LAYER_SYNC_MANIFEST")
            .env_remove("RUST_LOG")
            .env("NO_COLOR", "1");
        cmd
    }
}

impl Default for BuildTreeFixture {
    fn default() -> Self {
        Self::new()
    }
}
