//! Child-process execution with per-stage failure policy.
//!
//! Every external step runs through one [`ProcessRunner`]; the [`StagePolicy`] of the
//! stage decides whether output is streamed or captured and whether a non-zero exit
//! aborts the pipeline.

use crate::command::Invocation;
use crate::error::{PipelineError, PipelineResult};
use crate::job::PostProcessing;
use async_trait::async_trait;
use serde::Serialize;
use std::fmt;
use std::process::{ExitStatus, Stdio};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Train,
    Render,
    Metrics,
    /// Toolchain preparation such as the accelerated rasterizer install.
    Setup,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Train => "train",
            Self::Render => "render",
            Self::Metrics => "metrics",
            Self::Setup => "setup",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Child shares the parent's stdout/stderr.
    Inherit,
    Capture,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StagePolicy {
    pub output: OutputMode,
    pub fatal: bool,
}

impl StagePolicy {
    #[must_use]
    pub fn for_stage(stage: Stage) -> Self {
        match stage {
            Stage::Train => Self { output: OutputMode::Inherit, fatal: true },
            Stage::Render | Stage::Metrics | Stage::Setup => Self { output: OutputMode::Capture, fatal: false },
        }
    }
}

/// Exit status and (when captured) output of a finished child.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    pub code: Option<i32>,
    /// The child was terminated by SIGINT.
    pub interrupted: bool,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutput {
    #[must_use]
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    fn from_status(status: ExitStatus, stdout: &[u8], stderr: &[u8]) -> Self {
        Self {
            code: status.code(),
            interrupted: killed_by_sigint(status),
            stdout: String::from_utf8_lossy(stdout).into_owned(),
            stderr: String::from_utf8_lossy(stderr).into_owned(),
        }
    }
}

#[cfg(unix)]
fn killed_by_sigint(status: ExitStatus) -> bool {
    use std::os::unix::process::ExitStatusExt;
    const SIGINT: i32 = 2;
    status.signal() == Some(SIGINT)
}

#[cfg(not(unix))]
fn killed_by_sigint(_status: ExitStatus) -> bool {
    false
}

/// Runs an invocation to completion.
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    async fn run(&self, invocation: &Invocation, output: OutputMode) -> PipelineResult<ProcessOutput>;
}

/// Runs invocations as real child processes.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

#[async_trait]
impl ProcessRunner for SystemRunner {
    async fn run(&self, invocation: &Invocation, output: OutputMode) -> PipelineResult<ProcessOutput> {
        use tokio::process::Command;

        let mut cmd = Command::new(&invocation.program);
        cmd.args(&invocation.args);
        cmd.envs(invocation.env.iter().map(|(k, v)| (k, v)));
        if let Some(dir) = &invocation.cwd {
            cmd.current_dir(dir);
        }
        cmd.kill_on_drop(true);

        match output {
            OutputMode::Inherit => {
                cmd.stdin(Stdio::inherit()).stdout(Stdio::inherit()).stderr(Stdio::inherit());
                let status = cmd.status().await?;
                Ok(ProcessOutput::from_status(status, &[], &[]))
            }
            OutputMode::Capture => {
                cmd.stdin(Stdio::null()).stdout(Stdio::piped()).stderr(Stdio::piped());
                let out = cmd.output().await?;
                Ok(ProcessOutput::from_status(out.status, &out.stdout, &out.stderr))
            }
        }
    }
}

/// Result of a non-fatal stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageOutcome {
    /// Disabled in the job's post-processing settings.
    Skipped,
    Succeeded { stdout: String },
    /// Logged and absorbed; the pipeline carries on.
    Failed { code: Option<i32>, diagnostics: String },
}

impl StageOutcome {
    #[must_use]
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

/// Executes stages through a [`ProcessRunner`] and applies their failure policy.
pub struct Supervisor<'a> {
    runner: &'a dyn ProcessRunner,
    post_processing: PostProcessing,
}

impl<'a> Supervisor<'a> {
    #[must_use]
    pub fn new(runner: &'a dyn ProcessRunner, post_processing: PostProcessing) -> Self {
        Self { runner, post_processing }
    }

    fn enabled(&self, stage: Stage) -> bool {
        match stage {
            Stage::Render => self.post_processing.enable_render,
            Stage::Metrics => self.post_processing.enable_metrics,
            Stage::Train | Stage::Setup => true,
        }
    }

    /// Run `invocation` as `stage`.
    ///
    /// Errors only for a fatal stage that failed, or when the child was interrupted.
    /// Non-fatal failures, including a child that could not be spawned, come back as
    /// [`StageOutcome::Failed`].
    pub async fn run(&self, stage: Stage, label: &str, invocation: &Invocation) -> PipelineResult<StageOutcome> {
        if !self.enabled(stage) {
            tracing::debug!(%stage, "stage disabled; skipping");
            return Ok(StageOutcome::Skipped);
        }

        let policy = StagePolicy::for_stage(stage);
        tracing::info!(%stage, command = %invocation, "starting {label}");

        let output = match self.runner.run(invocation, policy.output).await {
            Ok(output) => output,
            Err(e) if policy.fatal => return Err(e),
            Err(e) => {
                tracing::error!(%stage, error = %e, "{label} could not be started");
                return Ok(StageOutcome::Failed { code: None, diagnostics: e.to_string() });
            }
        };

        if output.interrupted {
            return Err(PipelineError::Interrupted);
        }

        if output.success() {
            tracing::info!(%stage, "{label} finished");
            let stdout = output.stdout.trim().to_string();
            if stage == Stage::Metrics && !stdout.is_empty() {
                tracing::info!(%stage, "evaluation results:\n{stdout}");
            }
            return Ok(StageOutcome::Succeeded { stdout });
        }

        if policy.fatal {
            tracing::error!(%stage, code = ?output.code, "{label} failed");
            return Err(PipelineError::StageFailed { stage, code: output.code });
        }

        let diagnostics = output.stderr.trim().to_string();
        tracing::error!(%stage, code = ?output.code, "{label} failed: {diagnostics}");
        Ok(StageOutcome::Failed { code: output.code, diagnostics })
    }
}
