//! Lensforge command-line interface.
//!
//! Run lens-design simulations from TOML configuration files:
//! ```sh
//! lensforge run config/default.toml
//! lensforge run job.toml --output runs/
//! lensforge validate job.toml
//! ```

mod config;
mod runner;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use lensforge_core::{ConfigError, RunError};

#[derive(Parser)]
#[command(name = "lensforge")]
#[command(about = "Lensforge: lens-design simulation driver")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a design simulation from a configuration file.
    Run {
        /// Path to the configuration file (TOML, or JSON by extension).
        #[arg(default_value = config::DEFAULT_CONFIG_PATH)]
        config: PathBuf,
        /// Base directory for run output.
        #[arg(short, long, default_value = runner::DEFAULT_OUTPUT_BASE)]
        output: PathBuf,
    },
    /// Validate a configuration file without running the simulation.
    Validate {
        /// Path to the configuration file.
        #[arg(default_value = config::DEFAULT_CONFIG_PATH)]
        config: PathBuf,
    },
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    match dispatch(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => report_failure(&err),
    }
}

fn dispatch(command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Run { config, output } => {
            println!("Lensforge Design Driver");
            println!("=======================");
            println!("Configuration: {}", config.display());
            let job = config::load_config(&config)?;

            let summary = runner::run_job(job, &output)?;
            let report = &summary.report;
            println!(
                "Simulation complete: {} steps in {:.3} s, {} snapshot(s) in {}",
                report.steps_completed,
                report.duration_secs,
                report.saved_steps,
                summary.run_dir.display()
            );
            Ok(())
        }
        Commands::Validate { config } => {
            let job = config::load_config(&config)?;
            let plan = job.validate()?;
            println!("Configuration is valid: {}", config.display());
            println!(
                "  project={}, material={}, max_iter={}, save_interval={}",
                job.project_name(),
                plan.material,
                plan.max_iter,
                plan.save_interval
            );
            Ok(())
        }
    }
}

/// User-facing category of a failed command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FailureKind {
    Configuration,
    Computation,
    Unexpected,
}

impl FailureKind {
    /// Configuration problems exit with 2, everything else with 1.
    fn exit_code(self) -> u8 {
        match self {
            FailureKind::Configuration => 2,
            FailureKind::Computation | FailureKind::Unexpected => 1,
        }
    }
}

/// Sort `err` into its category and render its message.
fn classify(err: &anyhow::Error) -> (FailureKind, String) {
    let config_err = err.downcast_ref::<ConfigError>().or_else(|| {
        match err.downcast_ref::<RunError>() {
            Some(RunError::Configuration(inner)) => Some(inner),
            _ => None,
        }
    });
    if let Some(config_err) = config_err {
        return (
            FailureKind::Configuration,
            format!("configuration error: {config_err}"),
        );
    }

    match err.downcast_ref::<RunError>() {
        Some(run_err) => (FailureKind::Computation, format!("run failed: {run_err}")),
        None => (FailureKind::Unexpected, format!("unexpected error: {err:#}")),
    }
}

fn report_failure(err: &anyhow::Error) -> ExitCode {
    let (kind, message) = classify(err);
    eprintln!("{message}");
    ExitCode::from(kind.exit_code())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use lensforge_core::sink::memory::MemorySink;
    use lensforge_core::{
        LensParams, RunConfig, RunOrchestrator, StepComputation, StepError, StepResult,
    };

    struct Diverges;

    impl StepComputation for Diverges {
        fn compute_step(&self, step: u32, _config: &RunConfig) -> Result<StepResult, StepError> {
            Err(StepError::failed(step, "surface fit diverged"))
        }

        fn method_name(&self) -> &str {
            "diverges"
        }
    }

    fn valid_config() -> RunConfig {
        RunConfig {
            lens_params: LensParams {
                material: Some("N-BK7".into()),
                refractive_index: Some(1.5168),
                radius: Some(50.0),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_read_error_is_configuration() {
        let err = anyhow::Error::from(ConfigError::Read {
            path: "config/absent.toml".into(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
        });
        let (kind, message) = classify(&err);
        assert_eq!(kind, FailureKind::Configuration);
        assert_eq!(kind.exit_code(), 2);
        assert!(message.starts_with("configuration error: failed to read configuration"));
    }

    #[test]
    fn test_parse_error_is_configuration() {
        let err = anyhow::Error::from(ConfigError::Parse("expected `]`".into()));
        let (kind, message) = classify(&err);
        assert_eq!(kind, FailureKind::Configuration);
        assert_eq!(message, "configuration error: malformed configuration: expected `]`");
    }

    #[test]
    fn test_context_keeps_configuration_category() {
        let err = anyhow::Error::from(ConfigError::MissingParameter("radius"))
            .context("while loading job");
        assert_eq!(classify(&err).0, FailureKind::Configuration);
    }

    #[test]
    fn test_run_configuration_error_is_configuration() {
        let mut sink = MemorySink::new();
        let err = RunOrchestrator::with_system_clock(Arc::new(Diverges))
            .execute(RunConfig::default(), &mut sink)
            .unwrap_err();
        let (kind, message) = classify(&anyhow::Error::from(err));
        assert_eq!(kind, FailureKind::Configuration);
        assert_eq!(kind.exit_code(), 2);
        assert_eq!(
            message,
            "configuration error: missing required parameter [lens_params.material]"
        );
    }

    #[test]
    fn test_step_failure_is_computation() {
        let mut sink = MemorySink::new();
        let err = RunOrchestrator::with_system_clock(Arc::new(Diverges))
            .execute(valid_config(), &mut sink)
            .unwrap_err();
        let (kind, message) = classify(&anyhow::Error::from(err));
        assert_eq!(kind, FailureKind::Computation);
        assert_eq!(kind.exit_code(), 1);
        assert_eq!(
            message,
            "run failed: computation failed: step 1 failed: surface fit diverged"
        );
    }

    #[test]
    fn test_other_errors_are_unexpected() {
        let err = anyhow::anyhow!("disk full").context("failed to prepare output directory");
        let (kind, message) = classify(&err);
        assert_eq!(kind, FailureKind::Unexpected);
        assert_eq!(kind.exit_code(), 1);
        assert_eq!(
            message,
            "unexpected error: failed to prepare output directory: disk full"
        );
    }
}
