//! Persistence sink abstraction.
//!
//! The orchestrator hands every artifact of a run to a [`PersistenceSink`]:
//! one configuration snapshot, one [`DataPackage`] per save point and one
//! [`RunReport`]. A failed write is reported back as a [`PersistenceError`];
//! the orchestrator logs and counts it and carries on, so implementations must
//! keep each artifact independent of the others.

pub mod directory;
pub mod memory;

use std::path::PathBuf;

use thiserror::Error;

use crate::types::{DataPackage, RunConfig, RunReport, StepKey};

/// Errors from writing an artifact.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialise {artifact}: {source}")]
    Serialize {
        artifact: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("write rejected: {0}")]
    Rejected(String),
}

/// Durable store for the artifacts of one run.
pub trait PersistenceSink {
    /// Store the configuration that governs the run.
    fn archive_config(&mut self, config: &RunConfig) -> Result<(), PersistenceError>;

    /// Store the data package of a save point under `key`.
    fn archive_step(&mut self, package: DataPackage, key: StepKey) -> Result<(), PersistenceError>;

    /// Store the final report.
    fn archive_report(&mut self, report: &RunReport) -> Result<(), PersistenceError>;
}
