//! # Capture Command Implementation
//!
//! Records the head commit, branch and dirty flag of every repository in the
//! build tree as a structured snapshot, so the tree can be reproduced later
//! with `reconcile`.

use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Args;
use log::info;

use layer_sync::defaults::default_machine;
use layer_sync::exit_codes;
use layer_sync::repository::DefaultGitOperations;
use layer_sync::snapshot::capture::capture;
use layer_sync::snapshot::structured::{render_snapshot, write_snapshot};

use super::TreeArgs;

/// Write a snapshot of the current state of the build tree
#[derive(Args, Debug)]
pub struct CaptureArgs {
    /// Build id recorded in the snapshot (e.g. `0000-32-hwtests`).
    #[arg(long, value_name = "ID")]
    pub id: String,

    /// Builder identity recorded in the snapshot. Defaults to `$USER@$HOSTNAME`.
    #[arg(long, value_name = "NAME")]
    pub machine: Option<String>,

    /// Where to write the snapshot. Prints to stdout when omitted.
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    #[command(flatten)]
    pub tree: TreeArgs,
}

/// Execute the `capture` command.
pub fn execute(args: CaptureArgs) -> Result<u8> {
    if args.id.trim().is_empty() {
        bail!("The build id must not be empty");
    }
    let tree = args.tree.load()?;
    let machine = args.machine.unwrap_or_else(default_machine);
    let snapshot = capture(&tree.registry, &DefaultGitOperations, &args.id, &machine)?;

    match &args.output {
        Some(path) => {
            write_snapshot(&snapshot, path)?;
            info!(
                "Captured {} repositories into {}",
                snapshot.len(),
                path.display()
            );
        }
        None => print!("{}", render_snapshot(&snapshot)?),
    }
    Ok(exit_codes::SUCCESS)
}
