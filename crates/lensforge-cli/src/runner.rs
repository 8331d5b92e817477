//! Design run driver: ties together configuration, output directory, sink and
//! orchestrator.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Local};

use lensforge_core::compute::placeholder::PlaceholderStep;
use lensforge_core::sink::directory::DirectorySink;
use lensforge_core::{RunConfig, RunOrchestrator, RunReport};

/// Default base directory for run output.
pub const DEFAULT_OUTPUT_BASE: &str = "data/output";

/// Results from a completed run.
#[derive(Debug)]
pub struct RunSummary {
    pub run_dir: PathBuf,
    pub report: RunReport,
}

/// Directory of a run started at `at`: `<base>/<project>_<YYYYmmdd-HHMMSS>`.
pub fn run_directory(base: &Path, project_name: &str, at: DateTime<Local>) -> PathBuf {
    let project: String = project_name
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    base.join(format!("{}_{}", project, at.format("%Y%m%d-%H%M%S")))
}

/// Create and return an unused run directory for a run started at `at`.
///
/// Each run gets a directory of its own: when [`run_directory`] is taken, the
/// suffixes `_1`, `_2`, ... are tried in order until one can be created.
pub fn claim_run_directory(base: &Path, project_name: &str, at: DateTime<Local>) -> Result<PathBuf> {
    fs::create_dir_all(base)
        .with_context(|| format!("failed to create output base {}", base.display()))?;
    let first = run_directory(base, project_name, at);
    let mut candidate = first.clone();
    let mut attempt = 0u32;
    loop {
        match fs::create_dir(&candidate) {
            Ok(()) => return Ok(candidate),
            Err(err) if err.kind() == ErrorKind::AlreadyExists => {
                attempt += 1;
                let mut name = first.as_os_str().to_owned();
                name.push(format!("_{attempt}"));
                candidate = PathBuf::from(name);
            }
            Err(err) => {
                return Err(err).with_context(|| {
                    format!("failed to create run directory {}", candidate.display())
                })
            }
        }
    }
}

/// Validate `config`, create its run directory under `base_dir` and run it.
///
/// The configuration is checked before the directory is created, so an
/// invalid job leaves nothing on disk.
pub fn run_job(config: RunConfig, base_dir: &Path) -> Result<RunSummary> {
    let plan = config.validate()?;
    println!(
        "Lens: material={}, n={}, radius={} mm",
        plan.material, plan.refractive_index, plan.radius
    );
    println!(
        "Iterations: {} (saving every {} step(s), {} snapshot(s))",
        plan.max_iter,
        plan.save_interval,
        plan.expected_saves()
    );

    let run_dir = claim_run_directory(base_dir, config.project_name(), Local::now())?;
    let mut sink = DirectorySink::create(&run_dir)
        .with_context(|| format!("failed to prepare output directory {}", run_dir.display()))?;
    println!("Output directory: {}", run_dir.display());

    let mut orchestrator = RunOrchestrator::with_system_clock(Arc::new(PlaceholderStep::new()));
    match orchestrator.execute(config, &mut sink) {
        Ok(report) => {
            println!("Report written to: {}", sink.report_path().display());
            Ok(RunSummary { run_dir, report })
        }
        Err(err) => {
            if err.report().is_some() {
                println!("Failure report written to: {}", sink.report_path().display());
            }
            Err(err.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use lensforge_core::{ConfigError, LensParams};

    fn job() -> RunConfig {
        let mut config = RunConfig {
            project_name: Some("Freeform".into()),
            lens_params: LensParams {
                material: Some("N-BK7".into()),
                refractive_index: Some(1.5168),
                radius: Some(50.0),
                ..Default::default()
            },
            ..Default::default()
        };
        config.simulation.max_iter = 4;
        config.simulation.save_interval = 2;
        config
    }

    #[test]
    fn test_run_directory_naming() {
        let at = Local.with_ymd_and_hms(2026, 10, 14, 8, 5, 9).unwrap();
        let dir = run_directory(Path::new("data/output"), "Free form/v2", at);
        assert_eq!(dir, Path::new("data/output/Free_form_v2_20261014-080509"));
    }

    #[test]
    fn test_claimed_directories_are_distinct() {
        let tmp = tempfile::tempdir().unwrap();
        let at = Local.with_ymd_and_hms(2026, 10, 14, 8, 5, 9).unwrap();
        let dirs: Vec<PathBuf> = (0..3)
            .map(|_| claim_run_directory(tmp.path(), "Freeform", at).unwrap())
            .collect();

        let base = tmp.path().join("Freeform_20261014-080509");
        assert_eq!(dirs[0], base);
        assert_eq!(dirs[1], tmp.path().join("Freeform_20261014-080509_1"));
        assert_eq!(dirs[2], tmp.path().join("Freeform_20261014-080509_2"));
        assert!(dirs.iter().all(|d| d.is_dir()));
    }

    #[test]
    fn test_back_to_back_runs_do_not_share_a_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let first = run_job(job(), tmp.path()).unwrap();
        let mut second_job = job();
        second_job.simulation.save_interval = 4;
        let second = run_job(second_job, tmp.path()).unwrap();

        assert_ne!(first.run_dir, second.run_dir);
        let step_files = |dir: &Path| -> Vec<String> {
            let mut names: Vec<String> = std::fs::read_dir(dir)
                .unwrap()
                .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
                .filter(|n| n.starts_with("iter_"))
                .collect();
            names.sort();
            names
        };
        assert_eq!(step_files(&first.run_dir), vec!["iter_002_data.json", "iter_004_data.json"]);
        assert_eq!(step_files(&second.run_dir), vec!["iter_004_data.json"]);
        assert_eq!(second.report.saved_steps, 1);
    }

    #[test]
    fn test_run_job_writes_artifacts() {
        let tmp = tempfile::tempdir().unwrap();
        let summary = run_job(job(), tmp.path()).unwrap();

        assert!(summary.report.is_success());
        assert!(summary.run_dir.starts_with(tmp.path()));
        for name in ["config_snapshot.json", "iter_002_data.json", "iter_004_data.json", "report.json"] {
            assert!(summary.run_dir.join(name).is_file(), "missing {name}");
        }
    }

    #[test]
    fn test_invalid_job_creates_no_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let mut config = job();
        config.lens_params.material = None;

        let err = run_job(config, tmp.path()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ConfigError>(),
            Some(ConfigError::MissingParameter("material"))
        ));
        assert_eq!(std::fs::read_dir(tmp.path()).unwrap().count(), 0);
    }
}
