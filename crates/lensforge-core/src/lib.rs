//! # Lensforge Core
//!
//! Run control for lens-design simulations. This crate hosts the iterative
//! design loop: it validates a run configuration, drives a pluggable step
//! computation, archives self-describing snapshots and emits a final report.
//!
//! ## Architecture
//!
//! The [`orchestrator::RunOrchestrator`] depends only on three seams:
//!
//! - [`compute::StepComputation`] produces one [`types::StepResult`] per step.
//!   The shipped [`compute::placeholder::PlaceholderStep`] returns fixed values.
//! - [`sink::PersistenceSink`] stores the configuration snapshot, data
//!   packages and the report. [`sink::directory::DirectorySink`] writes JSON
//!   files; [`sink::memory::MemorySink`] keeps everything in memory.
//! - [`clock::Clock`] supplies timestamps and elapsed time.
//!
//! ## Modules
//!
//! - [`types`] — Data model (configuration, step results, packages, reports).
//! - [`config`] — Configuration validation.
//! - [`compute`] — Step computation trait and providers.
//! - [`clock`] — Injected time source.
//! - [`sink`] — Persistence sink trait and implementations.
//! - [`orchestrator`] — The run loop and its state machine.

pub mod clock;
pub mod compute;
pub mod config;
pub mod orchestrator;
pub mod sink;
pub mod types;

pub use clock::{Clock, ManualClock, SystemClock};
pub use compute::{StepComputation, StepError};
pub use config::{ConfigError, RunPlan};
pub use orchestrator::{RunError, RunOrchestrator, RunPhase};
pub use sink::{PersistenceError, PersistenceSink};
pub use types::{
    CompletionStatus, DataPackage, LensParams, RunConfig, RunReport, SimulationSettings,
    StepKey, StepResult,
};
