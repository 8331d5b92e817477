//! The design run loop.
//!
//! [`RunOrchestrator::execute`] moves through
//!
//! ```text
//! Idle -> Validating -> ArchivingConfig -> Iterating(1..=max_iter) -> Finalizing -> Done
//!             |                                  |
//!             +-> Failed                         +-> Failed -> Finalizing -> Done
//! ```
//!
//! A configuration error stops in `Failed` without touching the sink. A step
//! computation error stops the loop at once, but the report is still built and
//! archived before the error is returned.

use std::sync::Arc;

use thiserror::Error;

use crate::clock::{Clock, SystemClock};
use crate::compute::{StepComputation, StepError};
use crate::config::{ConfigError, RunPlan};
use crate::sink::{PersistenceError, PersistenceSink};
use crate::types::{CompletionStatus, DataPackage, RunConfig, RunReport, StepKey, StepResult};

/// Errors that end a run.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigError),

    /// The loop stopped at `step`. `report` is the archived failure report.
    #[error("computation failed: {source}")]
    Computation {
        step: u32,
        #[source]
        source: StepError,
        report: Box<RunReport>,
    },
}

impl RunError {
    /// The run report, if the run got far enough to produce one.
    pub fn report(&self) -> Option<&RunReport> {
        match self {
            RunError::Configuration(_) => None,
            RunError::Computation { report, .. } => Some(&**report),
        }
    }
}

/// Position of the orchestrator in a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Idle,
    Validating,
    ArchivingConfig,
    Iterating { step: u32 },
    Failed,
    Finalizing,
    Done,
}

/// Counters accumulated over one run.
#[derive(Debug, Default)]
struct RunTally {
    final_step: u32,
    steps_completed: u32,
    saved_steps: u32,
    error_count: u32,
    persistence_failures: u32,
    final_merit: Option<f64>,
}

impl RunTally {
    fn persistence_failure(&mut self, artifact: &str, err: &PersistenceError) {
        self.persistence_failures += 1;
        log::warn!("Failed to archive {artifact}: {err}");
    }
}

/// Drives one design run at a time.
pub struct RunOrchestrator {
    computation: Arc<dyn StepComputation>,
    clock: Arc<dyn Clock>,
    phase: RunPhase,
}

impl RunOrchestrator {
    pub fn new(computation: Arc<dyn StepComputation>, clock: Arc<dyn Clock>) -> Self {
        Self {
            computation,
            clock,
            phase: RunPhase::Idle,
        }
    }

    /// Orchestrator timed by the operating system clock.
    pub fn with_system_clock(computation: Arc<dyn StepComputation>) -> Self {
        Self::new(computation, Arc::new(SystemClock::new()))
    }

    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    fn transition(&mut self, next: RunPhase) {
        log::debug!("Run phase {:?} -> {:?}", self.phase, next);
        self.phase = next;
    }

    /// Run `config` to completion, archiving artifacts through `sink`.
    ///
    /// Returns the archived report on success. On a step failure the report is
    /// still archived and travels inside [`RunError::Computation`].
    pub fn execute(
        &mut self,
        config: RunConfig,
        sink: &mut dyn PersistenceSink,
    ) -> Result<RunReport, RunError> {
        self.phase = RunPhase::Idle;
        self.transition(RunPhase::Validating);
        let plan = match config.validate() {
            Ok(plan) => plan,
            Err(err) => {
                log::error!("Rejected configuration: {err}");
                self.transition(RunPhase::Failed);
                return Err(RunError::Configuration(err));
            }
        };

        log::info!(
            "Initialising design run '{}' ({}): material={}, n={}, radius={}, {} steps, saving every {}",
            config.project_name(),
            self.computation.method_name(),
            plan.material,
            plan.refractive_index,
            plan.radius,
            plan.max_iter,
            plan.save_interval,
        );
        let started_at = self.clock.now();
        let start = self.clock.monotonic();
        let mut tally = RunTally::default();

        self.transition(RunPhase::ArchivingConfig);
        if let Err(err) = sink.archive_config(&config) {
            tally.persistence_failure("configuration snapshot", &err);
        }

        let outcome = self.iterate(&config, &plan, sink, &mut tally);

        self.transition(RunPhase::Finalizing);
        let elapsed = self.clock.monotonic().saturating_sub(start);
        let report = RunReport {
            project_name: config.project_name().to_string(),
            started_at,
            finished_at: self.clock.now(),
            duration_secs: elapsed.as_secs_f64(),
            final_step: tally.final_step,
            steps_completed: tally.steps_completed,
            max_iter: plan.max_iter,
            saved_steps: tally.saved_steps,
            error_count: tally.error_count,
            persistence_failures: tally.persistence_failures,
            completion_status: if tally.error_count == 0 {
                CompletionStatus::Success
            } else {
                CompletionStatus::Failed
            },
            final_merit: tally.final_merit,
            failure: outcome.as_ref().err().map(|err| err.to_string()),
        };
        if let Err(err) = sink.archive_report(&report) {
            log::error!("Failed to archive run report: {err}");
        }
        self.transition(RunPhase::Done);

        log::info!(
            "Design run '{}' finished: {:?} after {}/{} steps in {:.3} s",
            report.project_name,
            report.completion_status,
            report.steps_completed,
            report.max_iter,
            report.duration_secs,
        );

        match outcome {
            Ok(()) => Ok(report),
            Err(source) => Err(RunError::Computation {
                step: report.final_step,
                source,
                report: Box::new(report),
            }),
        }
    }

    fn iterate(
        &mut self,
        config: &RunConfig,
        plan: &RunPlan,
        sink: &mut dyn PersistenceSink,
        tally: &mut RunTally,
    ) -> Result<(), StepError> {
        for step in 1..=plan.max_iter {
            self.transition(RunPhase::Iterating { step });
            tally.final_step = step;
            log::info!("Computing step {}/{}", step, plan.max_iter);

            let result = match self
                .computation
                .compute_step(step, config)
                .and_then(|result| check_finite(step, result))
            {
                Ok(result) => result,
                Err(err) => {
                    tally.error_count += 1;
                    log::error!("Step {step} failed: {err}");
                    self.transition(RunPhase::Failed);
                    return Err(err);
                }
            };
            tally.steps_completed = step;
            if let Some(merit) = result.merit {
                tally.final_merit = Some(merit);
            }

            if plan.is_save_point(step) {
                let package = DataPackage {
                    step,
                    timestamp: self.clock.now(),
                    config: config.clone(),
                    result,
                };
                tally.saved_steps += 1;
                if let Err(err) = sink.archive_step(package, StepKey::new(step, plan.max_iter)) {
                    tally.persistence_failure(&format!("step {step}"), &err);
                }
            }
        }
        Ok(())
    }
}

fn check_finite(step: u32, result: StepResult) -> Result<StepResult, StepError> {
    if result.merit.is_some_and(|m| !m.is_finite()) {
        return Err(StepError::NonFinite { step, quantity: "merit value" });
    }
    if result.points.iter().flatten().any(|c| !c.is_finite()) {
        return Err(StepError::NonFinite { step, quantity: "surface point" });
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::compute::placeholder::PlaceholderStep;
    use crate::sink::memory::{ArtifactKind, MemorySink};
    use crate::types::LensParams;
    use chrono::{TimeZone, Utc};
    use std::time::Duration;

    fn config(max_iter: u32, save_interval: u32) -> RunConfig {
        let mut config = RunConfig {
            project_name: Some("Singlet".into()),
            lens_params: LensParams {
                material: Some("N-BK7".into()),
                refractive_index: Some(1.5168),
                radius: Some(50.0),
                ..Default::default()
            },
            ..Default::default()
        };
        config.simulation.max_iter = max_iter;
        config.simulation.save_interval = save_interval;
        config
    }

    fn clock() -> Arc<ManualClock> {
        Arc::new(ManualClock::with_tick(
            Utc.with_ymd_and_hms(2026, 5, 4, 8, 0, 0).unwrap(),
            Duration::from_millis(250),
        ))
    }

    struct NanMerit;

    impl StepComputation for NanMerit {
        fn compute_step(&self, _step: u32, _config: &RunConfig) -> Result<StepResult, StepError> {
            Ok(StepResult { points: vec![], merit: Some(f64::NAN) })
        }

        fn method_name(&self) -> &str {
            "nan"
        }
    }

    #[test]
    fn test_phases_on_success() {
        let mut orch = RunOrchestrator::new(Arc::new(PlaceholderStep), clock());
        assert_eq!(orch.phase(), RunPhase::Idle);
        let mut sink = MemorySink::new();
        orch.execute(config(2, 1), &mut sink).unwrap();
        assert_eq!(orch.phase(), RunPhase::Done);
    }

    #[test]
    fn test_invalid_config_stops_in_failed() {
        let mut orch = RunOrchestrator::new(Arc::new(PlaceholderStep), clock());
        let mut sink = MemorySink::new();
        let mut bad = config(3, 1);
        bad.lens_params.radius = None;

        let err = orch.execute(bad, &mut sink).unwrap_err();
        assert!(matches!(err, RunError::Configuration(ConfigError::MissingParameter("radius"))));
        assert!(err.report().is_none());
        assert_eq!(orch.phase(), RunPhase::Failed);
        assert!(sink.archived().is_empty());
    }

    #[test]
    fn test_non_finite_merit_is_a_step_failure() {
        let mut orch = RunOrchestrator::new(Arc::new(NanMerit), clock());
        let mut sink = MemorySink::new();
        let err = orch.execute(config(4, 1), &mut sink).unwrap_err();
        assert_eq!(
            err.to_string(),
            "computation failed: step 1 produced a non-finite merit value"
        );

        match err {
            RunError::Computation { step, source, report } => {
                assert_eq!(step, 1);
                assert!(matches!(source, StepError::NonFinite { .. }));
                assert_eq!(report.error_count, 1);
                assert_eq!(report.steps_completed, 0);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(orch.phase(), RunPhase::Done);
        assert_eq!(sink.kinds(), vec![ArtifactKind::Config, ArtifactKind::Report]);
    }

    #[test]
    fn test_orchestrator_is_reusable() {
        let mut orch = RunOrchestrator::new(Arc::new(PlaceholderStep), clock());
        let mut first = MemorySink::new();
        let mut second = MemorySink::new();
        orch.execute(config(2, 1), &mut first).unwrap();
        let report = orch.execute(config(3, 3), &mut second).unwrap();
        assert_eq!(report.saved_steps, 1);
        assert_eq!(second.steps().len(), 1);
    }
}
