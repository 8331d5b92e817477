//! Core types shared across the run pipeline.
//!
//! This module defines the run configuration, the per-step result, the
//! self-describing data package written at save points, and the final run
//! report.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Project name used when the configuration does not set one.
pub const DEFAULT_PROJECT_NAME: &str = "DefaultProject";

/// Full configuration of a design run.
///
/// Keys that the driver does not interpret are kept in `extra` so that the
/// archived snapshot is a complete copy of the input document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_name: Option<String>,
    #[serde(default)]
    pub lens_params: LensParams,
    #[serde(default)]
    pub simulation: SimulationSettings,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl RunConfig {
    /// Project name, falling back to [`DEFAULT_PROJECT_NAME`].
    pub fn project_name(&self) -> &str {
        self.project_name.as_deref().unwrap_or(DEFAULT_PROJECT_NAME)
    }
}

/// Lens description. Every field is required for a run; presence is checked
/// by [`RunConfig::validate`], not by deserialisation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LensParams {
    /// Glass or polymer identifier (e.g. "N-BK7").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub material: Option<String>,
    /// Refractive index at the design wavelength.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refractive_index: Option<f64>,
    /// Surface radius of curvature (mm).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub radius: Option<f64>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// Loop control parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationSettings {
    #[serde(default = "default_max_iter")]
    pub max_iter: u32,
    #[serde(default = "default_save_interval")]
    pub save_interval: u32,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

fn default_max_iter() -> u32 {
    10
}
fn default_save_interval() -> u32 {
    1
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            max_iter: default_max_iter(),
            save_interval: default_save_interval(),
            extra: BTreeMap::new(),
        }
    }
}

/// Output of a single design step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepResult {
    /// Sampled surface points (mm), in sample order.
    pub points: Vec<[f64; 3]>,
    /// Merit value of the design after this step, if the provider computes one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merit: Option<f64>,
}

/// Self-describing record of one saved step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataPackage {
    /// 1-based step number.
    pub step: u32,
    /// Capture time of the save, not of the computation.
    pub timestamp: DateTime<Utc>,
    /// The configuration governing the run.
    pub config: RunConfig,
    pub result: StepResult,
}

/// Sortable identifier of a saved step.
///
/// The step number is zero-padded to at least [`StepKey::MIN_WIDTH`] digits.
/// Up to 999 steps every key has width 3, so `iter_001` .. `iter_999` sort
/// lexicographically in numeric order. Longer runs widen every key of the run
/// to the digit count of `max_iter`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StepKey {
    step: u32,
    width: usize,
}

impl StepKey {
    pub const MIN_WIDTH: usize = 3;

    /// Key for `step` within a run bounded by `max_iter`.
    pub fn new(step: u32, max_iter: u32) -> Self {
        let width = max_iter.max(step).to_string().len().max(Self::MIN_WIDTH);
        Self { step, width }
    }

    pub fn step(&self) -> u32 {
        self.step
    }
}

impl fmt::Display for StepKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:0width$}", self.step, width = self.width)
    }
}

/// Outcome of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompletionStatus {
    Success,
    Failed,
}

/// Summary written once at the end of every validated run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub project_name: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Elapsed wall-clock time from the monotonic clock (seconds).
    pub duration_secs: f64,
    /// Last step attempted.
    pub final_step: u32,
    /// Steps whose computation returned a result.
    pub steps_completed: u32,
    /// Configured bound on the step count.
    pub max_iter: u32,
    /// Step packages handed to the sink.
    pub saved_steps: u32,
    /// Failed step computations.
    pub error_count: u32,
    /// Artifacts the sink failed to write before the report.
    pub persistence_failures: u32,
    pub completion_status: CompletionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_merit: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
}

impl RunReport {
    pub fn is_success(&self) -> bool {
        self.completion_status == CompletionStatus::Success
    }
}
