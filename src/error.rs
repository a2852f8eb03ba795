//! # Error Handling
//!
//! This module defines the centralized error type for `layer-sync`. It uses
//! `thiserror` to derive a single `Error` enum covering every fatal failure
//! mode of the library.
//!
//! Only *fatal* conditions are represented here: an unreadable snapshot, a
//! malformed manifest, or a git invocation that exited non-zero. Validation
//! findings that merely gate activation (missing branches, dirty working
//! trees, uncovered layers) are not errors; they are collected in
//! [`crate::engine::Diagnostics`] and returned alongside the plan.
//!
//! The `Result` type alias is used to return `Result<T, Error>` from
//! functions throughout the library.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for layer-sync operations
#[derive(Error, Debug)]
pub enum Error {
    /// A legacy version report could not be parsed.
    ///
    /// `line` is the 1-based line number of the offending line, when the
    /// failure can be pinned to one.
    #[error("Version report parse error: {message}{}", line.map(|l| format!(" (line {})", l)).unwrap_or_default())]
    SnapshotParse { message: String, line: Option<usize> },

    /// A structured snapshot file is missing a required section or key.
    #[error("Snapshot format error: {message}")]
    SnapshotFormat { message: String },

    /// The project manifest is unusable.
    #[error("Manifest error: {message}")]
    Manifest { message: String },

    /// The build-tree layer list could not be read.
    #[error("Layer list error: {message}")]
    LayerList { message: String },

    /// A git command exited with a non-zero status.
    #[error("Git command failed in {}: {command} - {stderr}", path.display())]
    GitCommand {
        command: String,
        path: PathBuf,
        stderr: String,
    },

    /// A checkout did not leave the repository at the requested reference.
    #[error("Checkout of '{reference}' failed in {}: {message}", path.display())]
    Checkout {
        path: PathBuf,
        reference: String,
        message: String,
    },

    /// A layer directory could not be mapped to a repository.
    #[error("Layer registry error: {message}")]
    Registry { message: String },

    /// An I/O error, wrapped from `std::io::Error`.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A YAML parsing error, wrapped from `serde_yaml::Error`.
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// An INI parsing error, wrapped from `ini::ParseError`.
    #[error("INI parsing error: {0}")]
    Ini(#[from] ini::ParseError),

    /// A JSON serialization error, wrapped from `serde_json::Error`.
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// A regular expression error, wrapped from `regex::Error`.
    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),
}

/// A convenient type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
