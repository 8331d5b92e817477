//! JSON file sink: one run, one directory.
//!
//! Layout:
//!
//! ```text
//! <root>/config_snapshot.json
//! <root>/iter_003_data.json
//! <root>/iter_006_data.json
//! <root>/report.json
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::sink::{PersistenceError, PersistenceSink};
use crate::types::{DataPackage, RunConfig, RunReport, StepKey};

/// File name of the configuration snapshot.
pub const CONFIG_SNAPSHOT_FILE: &str = "config_snapshot.json";
/// File name of the run report.
pub const REPORT_FILE: &str = "report.json";

/// File name of the data package saved under `key`.
pub fn step_file_name(key: &StepKey) -> String {
    format!("iter_{key}_data.json")
}

/// Sink writing pretty-printed JSON artifacts into a directory.
///
/// The directory is created on construction and recreated before any write
/// that finds it missing. Every artifact is staged in a hidden sibling file and
/// renamed into place, so readers never observe a partial artifact.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    root: PathBuf,
}

impl DirectorySink {
    /// Open a sink rooted at `root`, creating the directory if needed.
    pub fn create(root: impl Into<PathBuf>) -> Result<Self, PersistenceError> {
        let sink = Self { root: root.into() };
        sink.ensure_root()?;
        log::info!("Output directory ready at {}", sink.root.display());
        Ok(sink)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn step_path(&self, key: &StepKey) -> PathBuf {
        self.root.join(step_file_name(key))
    }

    pub fn report_path(&self) -> PathBuf {
        self.root.join(REPORT_FILE)
    }

    fn ensure_root(&self) -> Result<(), PersistenceError> {
        if self.root.is_dir() {
            return Ok(());
        }
        fs::create_dir_all(&self.root).map_err(|source| PersistenceError::Io {
            path: self.root.clone(),
            source,
        })
    }

    fn write_json<T: Serialize>(&self, file_name: &str, value: &T) -> Result<PathBuf, PersistenceError> {
        if !self.root.is_dir() {
            log::warn!(
                "Output directory {} disappeared, recreating",
                self.root.display()
            );
        }
        self.ensure_root()?;

        let json = serde_json::to_string_pretty(value).map_err(|source| {
            PersistenceError::Serialize {
                artifact: file_name.to_string(),
                source,
            }
        })?;

        let target = self.root.join(file_name);
        let staging = self.root.join(format!(".{file_name}.partial"));
        if let Err(source) = fs::write(&staging, json) {
            let _ = fs::remove_file(&staging);
            return Err(PersistenceError::Io { path: staging, source });
        }
        if let Err(source) = fs::rename(&staging, &target) {
            let _ = fs::remove_file(&staging);
            return Err(PersistenceError::Io { path: target, source });
        }
        Ok(target)
    }
}

impl PersistenceSink for DirectorySink {
    fn archive_config(&mut self, config: &RunConfig) -> Result<(), PersistenceError> {
        let path = self.write_json(CONFIG_SNAPSHOT_FILE, config)?;
        log::info!("Configuration snapshot written to {}", path.display());
        Ok(())
    }

    fn archive_step(&mut self, package: DataPackage, key: StepKey) -> Result<(), PersistenceError> {
        let path = self.write_json(&step_file_name(&key), &package)?;
        log::info!("Step {} archived to {}", package.step, path.display());
        Ok(())
    }

    fn archive_report(&mut self, report: &RunReport) -> Result<(), PersistenceError> {
        let path = self.write_json(REPORT_FILE, report)?;
        log::info!("Report written to {}", path.display());
        Ok(())
    }
}
