//! # Layers Command Implementation
//!
//! Lists every repository of the build tree in build order: its path, what is
//! checked out, the build layers it serves, and its most recent commits.

use anyhow::Result;
use clap::Args;

use layer_sync::exit_codes;
use layer_sync::output::{headline, indent, OutputConfig};
use layer_sync::repository::{DefaultGitOperations, GitOperations};

use super::TreeArgs;

const RECENT_COMMITS: usize = 5;

/// Show every layer repository with its checkout and recent commits
#[derive(Args, Debug)]
pub struct LayersArgs {
    #[command(flatten)]
    pub tree: TreeArgs,
}

/// Execute the `layers` command.
pub fn execute(args: LayersArgs, out: &OutputConfig) -> Result<u8> {
    let tree = args.tree.load()?;
    let git = DefaultGitOperations;

    for directory in tree.registry.directories() {
        let header = format!(
            "{}, {}{}",
            directory.path.display(),
            git.checkout_info(&directory.path)?,
            directory.layer_summary()
        );
        println!("{}", headline(out, &header));
        println!("{}", indent(&git.recent_commits(&directory.path, RECENT_COMMITS)?));
    }
    Ok(exit_codes::SUCCESS)
}
