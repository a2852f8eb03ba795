//! Capture the live state of a build tree as a snapshot.

use log::{debug, warn};

use crate::error::Result;
use crate::registry::LayerRegistry;
use crate::repository::GitOperations;
use crate::snapshot::{now_timestamp, LayerPin, Snapshot};

/// Record the head commit, active branch and dirty flag of every repository
/// in `registry`, anchor first.
pub fn capture(
    registry: &LayerRegistry,
    git: &dyn GitOperations,
    id: &str,
    machine: &str,
) -> Result<Snapshot> {
    let mut snapshot = Snapshot::new(id);
    snapshot.timestamp = Some(now_timestamp());
    snapshot.machine = Some(machine.to_string());

    for directory in registry.directories() {
        let state = git.state(&directory.path)?;
        debug!(
            "Capturing {} at {} ({})",
            directory.name,
            state.head,
            state.branch_label()
        );
        if state.dirty {
            warn!(
                "{} has uncommitted changes, the snapshot marks it dirty",
                directory.name
            );
        }
        let mut pin = LayerPin::commit(state.head).with_dirty(state.dirty);
        pin.branch = state.branch;
        snapshot.insert(directory.name.clone(), pin);
    }

    Ok(snapshot)
}
