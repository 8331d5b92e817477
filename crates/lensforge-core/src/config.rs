//! Configuration validation.
//!
//! A [`RunConfig`] is validated once, before the orchestrator produces any
//! side effect. Validation yields a [`RunPlan`] holding the resolved values the
//! loop runs on.

use std::path::PathBuf;

use thiserror::Error;

use crate::types::RunConfig;

/// Lens parameters that must be present in every configuration, in check order.
pub const REQUIRED_LENS_PARAMS: [&str; 3] = ["material", "refractive_index", "radius"];

/// Errors from loading or validating a run configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required parameter [lens_params.{0}]")]
    MissingParameter(&'static str),

    #[error("invalid parameter [{name}]: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("failed to read configuration {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed configuration: {0}")]
    Parse(String),
}

/// Values resolved from a valid configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct RunPlan {
    pub material: String,
    pub refractive_index: f64,
    pub radius: f64,
    pub max_iter: u32,
    pub save_interval: u32,
}

impl RunPlan {
    /// Number of step packages a complete run writes.
    pub fn expected_saves(&self) -> u32 {
        self.max_iter / self.save_interval
    }

    /// Whether `step` is a save point.
    pub fn is_save_point(&self, step: u32) -> bool {
        step % self.save_interval == 0
    }
}

impl RunConfig {
    /// Check required parameters and loop bounds.
    pub fn validate(&self) -> Result<RunPlan, ConfigError> {
        let lens = &self.lens_params;
        let material = lens
            .material
            .clone()
            .ok_or(ConfigError::MissingParameter(REQUIRED_LENS_PARAMS[0]))?;
        let refractive_index = lens
            .refractive_index
            .ok_or(ConfigError::MissingParameter(REQUIRED_LENS_PARAMS[1]))?;
        let radius = lens
            .radius
            .ok_or(ConfigError::MissingParameter(REQUIRED_LENS_PARAMS[2]))?;

        if !refractive_index.is_finite() {
            return Err(ConfigError::InvalidParameter {
                name: "lens_params.refractive_index",
                reason: format!("must be a finite number, got {refractive_index}"),
            });
        }
        if !radius.is_finite() {
            return Err(ConfigError::InvalidParameter {
                name: "lens_params.radius",
                reason: format!("must be a finite number, got {radius}"),
            });
        }

        let sim = &self.simulation;
        if sim.max_iter == 0 {
            return Err(ConfigError::InvalidParameter {
                name: "simulation.max_iter",
                reason: "must be a positive integer".into(),
            });
        }
        if sim.save_interval == 0 {
            return Err(ConfigError::InvalidParameter {
                name: "simulation.save_interval",
                reason: "must be a positive integer".into(),
            });
        }

        Ok(RunPlan {
            material,
            refractive_index,
            radius,
            max_iter: sim.max_iter,
            save_interval: sim.save_interval,
        })
    }
}
