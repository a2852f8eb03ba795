//! CLI argument parsing and command dispatch

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::commands;
use layer_sync::output::{ColorMode, OutputConfig};

/// Layer Sync - Reproduce the layer repositories of a build tree from a snapshot
#[derive(Parser, Debug)]
#[command(name = "layer-sync")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Colorize output
    #[arg(long, global = true, value_name = "WHEN", value_enum, default_value_t = ColorMode::Auto)]
    color: ColorMode,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, global = true, value_name = "LEVEL", default_value = "info")]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Bring every layer repository to the state declared by a snapshot
    Reconcile(commands::reconcile::ReconcileArgs),

    /// Convert a legacy version report into a structured snapshot
    Convert(commands::convert::ConvertArgs),

    /// Write a snapshot of the current state of the build tree
    Capture(commands::capture::CaptureArgs),

    /// Show every layer repository with its checkout and recent commits
    Layers(commands::layers::LayersArgs),

    /// Pick the reference each layer should follow based on the anchor
    ResolveRef(commands::resolve_ref::ResolveRefArgs),
}

impl Cli {
    /// Execute the CLI command and return the process exit code.
    pub fn execute(self) -> Result<u8> {
        init_logging(&self.log_level);
        let out = OutputConfig::new(self.color);

        match self.command {
            Commands::Reconcile(args) => commands::reconcile::execute(args, &out),
            Commands::Convert(args) => commands::convert::execute(args),
            Commands::Capture(args) => commands::capture::execute(args),
            Commands::Layers(args) => commands::layers::execute(args, &out),
            Commands::ResolveRef(args) => commands::resolve_ref::execute(args, &out),
        }
    }
}

/// Initialise `env_logger` at `level`; `RUST_LOG` takes precedence when set.
fn init_logging(level: &str) {
    let env = env_logger::Env::default().default_filter_or(level);
    let _ = env_logger::Builder::from_env(env)
        .format_timestamp(None)
        .format_target(false)
        .try_init();
}
