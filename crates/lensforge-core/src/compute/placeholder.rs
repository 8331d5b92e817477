//! Stand-in step provider.
//!
//! Produces the same fixed surface samples and a zero merit value for every
//! step. No optical computation takes place.

use crate::compute::{StepComputation, StepError};
use crate::types::{RunConfig, StepResult};

/// Fixed samples returned by [`PlaceholderStep`].
pub const PLACEHOLDER_POINTS: [[f64; 3]; 3] = [
    [0.0, 0.0, 0.0],
    [0.0, 0.5, 0.0],
    [0.0, 1.0, 0.0],
];

/// Step provider that returns placeholder values.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlaceholderStep;

impl PlaceholderStep {
    pub fn new() -> Self {
        Self
    }
}

impl StepComputation for PlaceholderStep {
    fn compute_step(&self, _step: u32, _config: &RunConfig) -> Result<StepResult, StepError> {
        Ok(StepResult {
            points: PLACEHOLDER_POINTS.to_vec(),
            merit: Some(0.0),
        })
    }

    fn method_name(&self) -> &str {
        "placeholder"
    }
}
