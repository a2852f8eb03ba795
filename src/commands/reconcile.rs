//! # Reconcile Command Implementation
//!
//! Brings the layer repositories of the build tree to the state a snapshot
//! declares. The snapshot may be a structured snapshot file or a legacy
//! version report; the format is detected from the content.
//!
//! The anchor project is reconciled first. When it has to move, the command
//! switches it, stops, and exits with code 3 so the caller can re-run
//! reconciliation with the anchor's new code.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use layer_sync::engine::{Engine, Outcome, ReconcileOptions, Report};
use layer_sync::exit_codes;
use layer_sync::manifest::Manifest;
use layer_sync::output::{emoji, headline, OutputConfig};
use layer_sync::repository::DefaultGitOperations;
use layer_sync::snapshot::{load_snapshot, BuildId, ReportOptions};

use super::TreeArgs;

/// Bring every layer repository to the state declared by a snapshot
#[derive(Args, Debug)]
pub struct ReconcileArgs {
    /// Snapshot file or legacy version report.
    #[arg(value_name = "SNAPSHOT")]
    pub snapshot: PathBuf,

    /// Report the switches without performing them.
    #[arg(long)]
    pub dry_run: bool,

    /// Build id of the current build tree (e.g. `0000-32-hwtests`); a
    /// differing snapshot id is reported.
    #[arg(long, value_name = "ID")]
    pub id: Option<String>,

    /// Print the full report as JSON.
    #[arg(long)]
    pub json: bool,

    #[command(flatten)]
    pub tree: TreeArgs,
}

/// Canonicalise the bsp part of a build id through the manifest aliases.
pub fn canonical_id(id: &str, manifest: &Manifest) -> String {
    let categories = manifest.category_names();
    let mut build_id = BuildId::parse(id, &categories);
    build_id.bsp = manifest.canonical_bsp(&build_id.bsp);
    build_id.compose()
}

/// Exit code for the outcome of a run.
pub fn exit_code(outcome: &Outcome) -> u8 {
    match outcome {
        Outcome::RestartRequired { .. } => exit_codes::RESTART_REQUIRED,
        Outcome::AnchorBlocked | Outcome::Aborted => exit_codes::ERROR,
        Outcome::AnchorSwitchPending { .. }
        | Outcome::UpToDate
        | Outcome::Switched { .. }
        | Outcome::WouldSwitch { .. } => exit_codes::SUCCESS,
    }
}

fn verdict(report: &Report, anchor: &str) -> String {
    match &report.outcome {
        Outcome::AnchorBlocked => format!("Cannot bring {} to its snapshot version", anchor),
        Outcome::AnchorSwitchPending { commit } => format!(
            "{} would switch to {} (dry-run), layers are checked after that switch",
            anchor, commit
        ),
        Outcome::RestartRequired { commit } => format!(
            "Switched {} to {}, run reconcile again to continue with the layers",
            anchor, commit
        ),
        Outcome::Aborted => format!(
            "Aborting snapshot activation ({})",
            report.diagnostics.summary()
        ),
        Outcome::UpToDate => {
            "All layer repositories are already at their requested versions".to_string()
        }
        Outcome::Switched { count } => {
            format!("Switched {} layer repositories to snapshot position", count)
        }
        Outcome::WouldSwitch { count } => format!(
            "Would switch {} layer repositories to snapshot position (dry-run)",
            count
        ),
    }
}

/// Execute the `reconcile` command.
pub fn execute(args: ReconcileArgs, out: &OutputConfig) -> Result<u8> {
    let tree = args.tree.load()?;
    let snapshot = load_snapshot(&args.snapshot, &ReportOptions::from_manifest(&tree.manifest))
        .with_context(|| format!("Cannot read snapshot {}", args.snapshot.display()))?;

    let options = ReconcileOptions {
        dry_run: args.dry_run,
        current_id: args.id.as_deref().map(|id| canonical_id(id, &tree.manifest)),
    };
    let git = DefaultGitOperations;
    let report = Engine::new(&git).reconcile(&snapshot, &tree.registry, &options)?;

    if report.plan.switches().next().is_some() {
        println!(
            "{}",
            headline(out, "Switching repositories to snapshot position")
        );
        for step in report.plan.switches() {
            println!("    {}", step);
        }
    }

    let marker = if report.outcome.applied() {
        emoji(out, "✅", "[OK]")
    } else {
        emoji(out, "⚠️", "[!!]")
    };
    println!(
        "{} {}",
        marker,
        headline(out, &verdict(&report, &tree.manifest.anchor))
    );

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }

    Ok(exit_code(&report.outcome))
}
