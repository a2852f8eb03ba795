//! # Layer Sync Library
//!
//! Reproduces the layer repositories of an embedded Linux build tree from a
//! snapshot. A build tree is an anchor project plus a number of independently
//! versioned layer repositories wired into the build configuration; a
//! snapshot pins every one of them to an exact version, commit and branch.
//!
//! ## Quick Example
//!
//! ```
//! use layer_sync::bblayers::parse_layer_list;
//! use layer_sync::snapshot::{parse_version_report, ReportOptions};
//!
//! let list = parse_layer_list("BBLAYERS = \" \\\n  /a/meta-x \\\n  \"\n", "BBLAYERS");
//! assert_eq!(list.paths, vec!["/a/meta-x"]);
//!
//! let report = "MSC-LDK v1.0 built on Sat Sep 17 00:42:41 CEST 2016 by me@box\n\
//!               --bsp=0000 --variant=32\n\
//!               LAYER poky=v2.2\n";
//! let snapshot = parse_version_report(report, &ReportOptions::default()).unwrap();
//! assert_eq!(snapshot.id, "0000-32");
//! assert_eq!(snapshot.get("poky.git").unwrap().reference, "v2.2");
//! ```
//!
//! ## Core Concepts
//!
//! - **Snapshots (`snapshot`)**: the declared state, read from a structured
//!   snapshot file or converted from a legacy version report, and captured
//!   from a live tree.
//! - **Layer list (`bblayers`)** and **registry (`registry`)**: which
//!   repositories the build uses, under which logical names.
//! - **Repository capabilities (`repository`, `git`)**: the queries and
//!   checkouts the engine performs, behind the `GitOperations` trait.
//! - **Reference resolution (`resolver`)**: which branch a layer follows when
//!   none is declared.
//! - **Reconciliation (`engine`)**: validates a snapshot against the tree and
//!   switches repositories, all or nothing.
//! - **Manifest (`manifest`)**: naming conventions and layer categories of
//!   the project.

pub mod bblayers;
pub mod defaults;
pub mod engine;
pub mod error;
pub mod exit_codes;
pub mod git;
pub mod manifest;
pub mod output;
pub mod registry;
pub mod repository;
pub mod resolver;
pub mod snapshot;

#[cfg(test)]
mod parser_proptest;
