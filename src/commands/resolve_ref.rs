//! # Resolve-Ref Command Implementation
//!
//! Shows which reference every layer repository would follow given what the
//! anchor project is checked out at, and with `--checkout` switches the
//! layers to those references.

use anyhow::Result;
use clap::Args;

use layer_sync::engine::align::{align, AlignOptions, AlignOutcome};
use layer_sync::exit_codes;
use layer_sync::output::{emoji, headline, OutputConfig};
use layer_sync::repository::DefaultGitOperations;

use super::TreeArgs;

/// Pick the reference each layer should follow based on the anchor
#[derive(Args, Debug)]
pub struct ResolveRefArgs {
    /// Reference to use for every layer. Ignored while the anchor is on a
    /// development branch unless `--force` is given.
    #[arg(long = "ref", value_name = "REF", default_value = "")]
    pub reference: String,

    /// Use `--ref` even while the anchor is on a development branch.
    #[arg(long)]
    pub force: bool,

    /// Check out the resolved references.
    #[arg(long)]
    pub checkout: bool,

    /// With `--checkout`, report the switches without performing them.
    #[arg(long)]
    pub dry_run: bool,

    /// Print the full report as JSON.
    #[arg(long)]
    pub json: bool,

    #[command(flatten)]
    pub tree: TreeArgs,
}

/// Execute the `resolve-ref` command.
pub fn execute(args: ResolveRefArgs, out: &OutputConfig) -> Result<u8> {
    let tree = args.tree.load()?;
    let options = AlignOptions {
        requested: args.reference,
        force: args.force,
        checkout: args.checkout,
        dry_run: args.dry_run,
    };
    let report = align(&DefaultGitOperations, &tree.registry, &tree.manifest.refs, &options)?;

    println!(
        "{}",
        headline(out, &format!("{} is on {}", tree.manifest.anchor, report.anchor))
    );
    for alignment in &report.alignments {
        let target = alignment
            .resolved
            .as_ref()
            .map_or("(none)", |resolved| resolved.reference.as_str());
        let marker = if alignment.switch { "->" } else { "==" };
        println!(
            "    {}: {} {} {}",
            alignment.layer, alignment.current, marker, target
        );
    }

    let (ok, message) = match &report.outcome {
        AlignOutcome::Reported => (true, None),
        AlignOutcome::Aborted => (
            false,
            Some(format!("Aborting checkout ({})", report.diagnostics.summary())),
        ),
        AlignOutcome::UpToDate => (
            true,
            Some("All layer repositories already follow the anchor".to_string()),
        ),
        AlignOutcome::Switched { count } => {
            (true, Some(format!("Switched {} layer repositories", count)))
        }
        AlignOutcome::WouldSwitch { count } => (
            true,
            Some(format!("Would switch {} layer repositories (dry-run)", count)),
        ),
    };
    if let Some(message) = message {
        let marker = if ok {
            emoji(out, "✅", "[OK]")
        } else {
            emoji(out, "⚠️", "[!!]")
        };
        println!("{} {}", marker, headline(out, &message));
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }

    Ok(if ok {
        exit_codes::SUCCESS
    } else {
        exit_codes::ERROR
    })
}
