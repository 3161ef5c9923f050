//! `splat run` - execute one training job end to end.

use anyhow::{Context, Result};
use colored::Colorize;
use splat_pipeline::{JobConfig, Pipeline, PipelineError, Settings, SystemRunner};
use std::path::{Path, PathBuf};

pub async fn execute(mut settings: Settings, job: PathBuf, toolchain_dir: Option<PathBuf>) -> Result<()> {
    let cwd = std::env::current_dir().context("Failed to read current directory")?;
    if toolchain_dir.is_some() {
        settings.toolchain_dir = toolchain_dir;
    }

    let job_path = resolve_job_path(&job, &settings.jobs_dir(&cwd), &cwd)
        .ok_or_else(|| PipelineError::PathNotFound { what: "job file", path: job.clone() })?;
    let config = JobConfig::load(&job_path)?.with_resolved_paths(&cwd);
    let toolchain = settings.toolchain(&cwd);

    println!("{} {}", "Job:".bold(), config.name.cyan());
    println!("  {} {}", "File:".dimmed(), job_path.display());
    println!("  {} {}", "Source:".dimmed(), config.paths.source_path.display());
    println!("  {} {}", "Model:".dimmed(), config.paths.model_path.display());
    println!("  {} {}", "Iterations:".dimmed(), config.training.iterations);
    println!();

    let runner = SystemRunner;
    let pipeline = Pipeline::new(config, toolchain, &runner);

    // Dropping the pipeline future kills the running child and restores the working directory.
    // The interrupt branch is polled first so its handler is installed before any child spawns.
    let summary = tokio::select! {
        biased;
        _ = tokio::signal::ctrl_c() => {
            tracing::warn!("interrupt received; stopping");
            return Err(PipelineError::Interrupted.into());
        }
        result = pipeline.run() => result?,
    };

    println!();
    println!("{} {}", "✓".green().bold(), format!("Job '{}' finished", summary.job_name).bold());
    println!("  {} {}", "Results:".dimmed(), summary.model_path.display());
    if let Some(results) = &summary.results_file {
        println!("  {} {}", "Metrics:".dimmed(), results.display());
    }
    Ok(())
}

/// Look for `job` as given (relative to `cwd`), then inside `jobs_dir`, then inside
/// `jobs_dir` with a `.yaml` extension added.
fn resolve_job_path(job: &Path, jobs_dir: &Path, cwd: &Path) -> Option<PathBuf> {
    let mut candidates = vec![cwd.join(job), jobs_dir.join(job)];
    if job.extension().is_none() {
        candidates.push(jobs_dir.join(job).with_extension("yaml"));
    }
    candidates.into_iter().find(|p| p.is_file())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_resolve_job_path_prefers_given_path() {
        let temp = TempDir::new().unwrap();
        let jobs = temp.path().join("config");
        fs::create_dir_all(&jobs).unwrap();
        fs::write(temp.path().join("garden.yaml"), "").unwrap();
        fs::write(jobs.join("garden.yaml"), "").unwrap();

        let found = resolve_job_path(Path::new("garden.yaml"), &jobs, temp.path());
        assert_eq!(found, Some(temp.path().join("garden.yaml")));
    }

    #[test]
    fn test_resolve_job_path_falls_back_to_jobs_dir() {
        let temp = TempDir::new().unwrap();
        let jobs = temp.path().join("config");
        fs::create_dir_all(&jobs).unwrap();
        fs::write(jobs.join("quick.yaml"), "").unwrap();

        assert_eq!(resolve_job_path(Path::new("quick.yaml"), &jobs, temp.path()), Some(jobs.join("quick.yaml")));
        assert_eq!(resolve_job_path(Path::new("quick"), &jobs, temp.path()), Some(jobs.join("quick.yaml")));
        assert_eq!(resolve_job_path(Path::new("missing.yaml"), &jobs, temp.path()), None);
    }
}
