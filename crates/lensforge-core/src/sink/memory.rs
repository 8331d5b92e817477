//! In-memory sink.
//!
//! Records every accepted artifact in call order. Writes can be made to fail
//! per artifact kind or per step, which lets callers observe how a run reacts
//! to persistence faults.

use std::collections::BTreeSet;

use crate::sink::{PersistenceError, PersistenceSink};
use crate::types::{DataPackage, RunConfig, RunReport, StepKey};

/// Kind of artifact handed to a sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ArtifactKind {
    Config,
    Step,
    Report,
}

/// An artifact accepted by a [`MemorySink`].
#[derive(Debug, Clone, PartialEq)]
pub enum Archived {
    Config(RunConfig),
    Step { key: StepKey, package: DataPackage },
    Report(RunReport),
}

impl Archived {
    pub fn kind(&self) -> ArtifactKind {
        match self {
            Archived::Config(_) => ArtifactKind::Config,
            Archived::Step { .. } => ArtifactKind::Step,
            Archived::Report(_) => ArtifactKind::Report,
        }
    }
}

#[derive(Debug, Default)]
pub struct MemorySink {
    archived: Vec<Archived>,
    failing_kinds: BTreeSet<ArtifactKind>,
    failing_steps: BTreeSet<u32>,
    rejected: u32,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject every write of `kind`.
    pub fn fail_on(mut self, kind: ArtifactKind) -> Self {
        self.failing_kinds.insert(kind);
        self
    }

    /// Reject the data package of `step`.
    pub fn fail_on_step(mut self, step: u32) -> Self {
        self.failing_steps.insert(step);
        self
    }

    pub fn archived(&self) -> &[Archived] {
        &self.archived
    }

    /// Number of writes that were rejected.
    pub fn rejected(&self) -> u32 {
        self.rejected
    }

    pub fn kinds(&self) -> Vec<ArtifactKind> {
        self.archived.iter().map(Archived::kind).collect()
    }

    pub fn config_snapshots(&self) -> Vec<&RunConfig> {
        self.archived
            .iter()
            .filter_map(|a| match a {
                Archived::Config(config) => Some(config),
                _ => None,
            })
            .collect()
    }

    pub fn steps(&self) -> Vec<(&StepKey, &DataPackage)> {
        self.archived
            .iter()
            .filter_map(|a| match a {
                Archived::Step { key, package } => Some((key, package)),
                _ => None,
            })
            .collect()
    }

    pub fn reports(&self) -> Vec<&RunReport> {
        self.archived
            .iter()
            .filter_map(|a| match a {
                Archived::Report(report) => Some(report),
                _ => None,
            })
            .collect()
    }

    fn check(&mut self, kind: ArtifactKind, step: Option<u32>) -> Result<(), PersistenceError> {
        let step_rejected = step.is_some_and(|s| self.failing_steps.contains(&s));
        if self.failing_kinds.contains(&kind) || step_rejected {
            self.rejected += 1;
            return Err(PersistenceError::Rejected(match step {
                Some(s) => format!("{kind:?} artifact for step {s}"),
                None => format!("{kind:?} artifact"),
            }));
        }
        Ok(())
    }
}

impl PersistenceSink for MemorySink {
    fn archive_config(&mut self, config: &RunConfig) -> Result<(), PersistenceError> {
        self.check(ArtifactKind::Config, None)?;
        self.archived.push(Archived::Config(config.clone()));
        Ok(())
    }

    fn archive_step(&mut self, package: DataPackage, key: StepKey) -> Result<(), PersistenceError> {
        self.check(ArtifactKind::Step, Some(package.step))?;
        self.archived.push(Archived::Step { key, package });
        Ok(())
    }

    fn archive_report(&mut self, report: &RunReport) -> Result<(), PersistenceError> {
        self.check(ArtifactKind::Report, None)?;
        self.archived.push(Archived::Report(report.clone()));
        Ok(())
    }
}
