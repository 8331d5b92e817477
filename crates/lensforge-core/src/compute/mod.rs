//! Step computation abstraction and providers.
//!
//! The [`StepComputation`] trait is the extension point where an optical
//! design algorithm plugs into the run loop. The orchestrator calls it once
//! per step and never looks inside the result beyond the merit value.

pub mod placeholder;

use thiserror::Error;

use crate::types::{RunConfig, StepResult};

/// Errors raised by a step computation.
#[derive(Debug, Error)]
pub enum StepError {
    #[error("step {step} failed: {reason}")]
    Failed { step: u32, reason: String },

    #[error("step {step} produced a non-finite {quantity}")]
    NonFinite { step: u32, quantity: &'static str },
}

impl StepError {
    pub fn failed(step: u32, reason: impl Into<String>) -> Self {
        Self::Failed {
            step,
            reason: reason.into(),
        }
    }
}

/// Computes one iteration of a design run.
///
/// Implementations may be CPU-bound. They receive the full configuration on
/// every call and must not rely on being invoked in any particular order.
pub trait StepComputation: Send + Sync {
    /// Compute the result of `step` (1-based) under `config`.
    fn compute_step(&self, step: u32, config: &RunConfig) -> Result<StepResult, StepError>;

    /// Human-readable name of the method.
    fn method_name(&self) -> &str;
}
