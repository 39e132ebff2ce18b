//! JSON persistence for whole simulations.
//!
//! Snapshots carry the grid as rows of cells alongside the robot and task
//! lists. Loading re-validates the cross-references between them, so a
//! hand-edited file cannot smuggle an inconsistent state into the world.

use std::{fs, io, path::Path, path::PathBuf};

use robot_fleet_core::SimulationError;
use thiserror::Error;

use crate::Simulation;

/// Errors raised while saving or loading snapshots.
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// The snapshot file could not be read.
    #[error("failed to read snapshot {path}")]
    Read {
        /// File that was being read.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },
    /// The snapshot file could not be written.
    #[error("failed to write snapshot {path}")]
    Write {
        /// File that was being written.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },
    /// The snapshot was not valid JSON for a simulation.
    #[error("malformed snapshot")]
    Parse(#[from] serde_json::Error),
    /// The snapshot decoded but described an inconsistent simulation.
    #[error("snapshot describes an invalid simulation")]
    Invalid(#[from] SimulationError),
}

/// Serialises the simulation into pretty-printed JSON.
pub fn to_json(simulation: &Simulation) -> Result<String, SnapshotError> {
    Ok(serde_json::to_string_pretty(simulation)?)
}

/// Decodes and validates a simulation from JSON.
pub fn from_json(json: &str) -> Result<Simulation, SnapshotError> {
    let mut simulation: Simulation = serde_json::from_str(json)?;
    simulation.restore_allocators();
    simulation.check_consistency()?;
    Ok(simulation)
}

/// Writes the simulation to `path` as JSON.
pub fn save(simulation: &Simulation, path: &Path) -> Result<(), SnapshotError> {
    let json = to_json(simulation)?;
    fs::write(path, json).map_err(|source| SnapshotError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::debug!(path = %path.display(), "snapshot saved");
    Ok(())
}

/// Reads and validates a simulation previously written by [`save`].
pub fn load(path: &Path) -> Result<Simulation, SnapshotError> {
    let json = fs::read_to_string(path).map_err(|source| SnapshotError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let simulation = from_json(&json)?;
    tracing::debug!(path = %path.display(), "snapshot loaded");
    Ok(simulation)
}
