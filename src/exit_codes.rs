//! Process exit codes of the `layer-sync` binary.
//!
//! - `0`: Success
//! - `1`: General error, including an aborted snapshot activation
//! - `2`: Invalid command-line usage (handled by clap)
//! - `3`: The anchor repository was switched; re-run from the new commit

/// The command completed successfully.
pub const SUCCESS: u8 = 0;

/// The command failed or refused to activate a snapshot.
pub const ERROR: u8 = 1;

/// Invalid command-line usage. Emitted by clap itself.
pub const USAGE: u8 = 2;

/// The anchor repository moved to a new commit and the caller must restart
/// reconciliation from there.
pub const RESTART_REQUIRED: u8 = 3;
