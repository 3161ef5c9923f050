//! `splat list` - show the job files in the jobs directory.

use anyhow::{Context, Result};
use colored::Colorize;
use splat_pipeline::{list_jobs, Settings};
use std::path::PathBuf;

pub fn execute(settings: &Settings, dir: Option<PathBuf>, json_output: bool) -> Result<()> {
    let cwd = std::env::current_dir().context("Failed to read current directory")?;
    let dir = dir.map_or_else(|| settings.jobs_dir(&cwd), |d| cwd.join(d));

    let Some(jobs) = list_jobs(&dir) else {
        if json_output {
            println!("[]");
        } else {
            println!("{}", format!("Jobs directory not found: {}", dir.display()).yellow());
        }
        return Ok(());
    };

    if json_output {
        println!("{}", serde_json::to_string_pretty(&jobs)?);
        return Ok(());
    }

    println!();
    println!("{}", format!("Jobs ({})", jobs.len()).bold().cyan());
    println!();

    if jobs.is_empty() {
        println!("  {}", format!("No *.yaml files in {}", dir.display()).dimmed());
        return Ok(());
    }

    for job in &jobs {
        if let Some(error) = &job.error {
            println!("  {} {}", job.file_name.red(), format!("(unreadable: {error})").dimmed());
            continue;
        }
        let name = job.name.as_deref().unwrap_or("N/A");
        let description = job.description.as_deref().unwrap_or("N/A");
        let iterations = job.iterations.map_or_else(|| "N/A".to_string(), |n| n.to_string());
        println!("  {} ({})", job.file_name.cyan(), name.bold());
        println!("    {} {}", "description:".dimmed(), description);
        println!("    {} {}", "iterations:".dimmed(), iterations);
    }
    println!();
    println!("  {}", "Run a job with `splat run <file>`.".dimmed());
    Ok(())
}
