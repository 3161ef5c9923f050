//! Splat CLI - runs Gaussian Splatting training jobs described in YAML files.
//!
//! `splat run <job>` trains a model in segments, rendering and scoring it at each
//! evaluation boundary. `splat list` shows the jobs available in the jobs directory.

mod commands;

use clap::{CommandFactory, Parser, Subcommand};
use colored::Colorize;
use splat_pipeline::{PipelineError, Settings};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use commands::{list, run};

/// Splat - segmented Gaussian Splatting training orchestrator
#[derive(Parser, Debug)]
#[command(
    name = "splat",
    author,
    version,
    about = "Segmented Gaussian Splatting training with render and metrics passes",
    long_about = "Runs train, render and metrics scripts from a Gaussian Splatting checkout.\nTraining is split at evaluation iterations and resumes from the newest checkpoint on disk."
)]
struct Args {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List job files
    ///
    /// Shows each job in the jobs directory with its description and iteration count.
    List {
        /// Jobs directory (defaults to `config/` or the configured `jobs_dir`)
        #[arg(long)]
        dir: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run a training job
    ///
    /// The job file is looked up as given, then inside the jobs directory.
    Run {
        /// Job file (e.g. `garden.yaml` or `config/garden.yaml`)
        job: PathBuf,

        /// Gaussian Splatting checkout (defaults to `gaussian-splatting/`)
        #[arg(long)]
        toolchain_dir: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    let settings = Settings::discover_and_load();

    // Initialize tracing
    let level_name = args.log_level.as_deref().or(settings.log_level.as_deref()).unwrap_or("info");
    let level = match level_name {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };
    let subscriber = FmtSubscriber::builder().with_max_level(level).without_time().with_target(false).finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("failed to initialise logging: {e}");
    }

    // If no command provided, show help
    let Some(command) = args.command else {
        return match Args::command().print_help() {
            Ok(()) => ExitCode::SUCCESS,
            Err(_) => ExitCode::FAILURE,
        };
    };

    let result = match command {
        Command::List { dir, json } => list::execute(&settings, dir, json),
        Command::Run { job, toolchain_dir } => run::execute(settings, job, toolchain_dir).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {:#}", "Error:".red().bold(), e);
            ExitCode::from(e.downcast_ref::<PipelineError>().map_or(1, PipelineError::exit_code))
        }
    }
}
