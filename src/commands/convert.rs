//! # Convert Command Implementation
//!
//! Reads a legacy version report and writes it as a structured snapshot,
//! either to a file or to standard output.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use log::info;

use layer_sync::exit_codes;
use layer_sync::snapshot::structured::{render_snapshot, write_snapshot};
use layer_sync::snapshot::{parse_version_report, ReportOptions};

use super::load_manifest;

/// Convert a legacy version report into a structured snapshot
#[derive(Args, Debug)]
pub struct ConvertArgs {
    /// The version report to convert.
    #[arg(value_name = "REPORT")]
    pub report: PathBuf,

    /// Where to write the snapshot. Prints to stdout when omitted.
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Project manifest supplying naming conventions and bsp aliases.
    #[arg(long, value_name = "FILE", env = "LAYER_SYNC_MANIFEST")]
    pub manifest: Option<PathBuf>,
}

/// Execute the `convert` command.
pub fn execute(args: ConvertArgs) -> Result<u8> {
    let manifest = load_manifest(args.manifest.as_deref(), None)?;
    let content = std::fs::read_to_string(&args.report)
        .with_context(|| format!("Cannot read {}", args.report.display()))?;
    let snapshot = parse_version_report(&content, &ReportOptions::from_manifest(&manifest))
        .with_context(|| format!("Cannot convert {}", args.report.display()))?;

    match &args.output {
        Some(path) => {
            write_snapshot(&snapshot, path)?;
            info!(
                "Wrote snapshot '{}' with {} layer(s) to {}",
                snapshot.id,
                snapshot.len(),
                path.display()
            );
        }
        None => print!("{}", render_snapshot(&snapshot)?),
    }
    Ok(exit_codes::SUCCESS)
}
