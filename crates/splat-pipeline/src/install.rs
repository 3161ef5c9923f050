//! Best-effort replacement of the default rasterizer with an accelerated build.
//!
//! Nothing here can abort a run: a missing submodule or a failing step is logged and
//! training continues with whatever rasterizer is installed.

use crate::command::Invocation;
use crate::error::PipelineResult;
use crate::job::SetupConfig;
use crate::supervisor::{Stage, StageOutcome, Supervisor};
use crate::toolchain::Toolchain;

const RASTERIZER_PACKAGE: &str = "diff-gaussian-rasterization";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallOutcome {
    /// Not requested, or the rasterizer submodule is absent.
    Skipped,
    Installed,
    Failed(String),
}

/// Install the accelerated rasterizer if `setup` asks for it.
///
/// Only an operator interrupt is returned as an error.
pub async fn install_accelerated_rasterizer(
    setup: &SetupConfig,
    toolchain: &Toolchain,
    supervisor: &Supervisor<'_>,
) -> PipelineResult<InstallOutcome> {
    if !setup.install_accelerated_rasterizer {
        return Ok(InstallOutcome::Skipped);
    }

    let dir = toolchain.rasterizer_dir();
    if !dir.is_dir() {
        tracing::warn!(dir = %dir.display(), "rasterizer submodule not found; skipping accelerated install");
        return Ok(InstallOutcome::Skipped);
    }
    tracing::info!(branch = %setup.rasterizer_branch, "installing accelerated rasterizer");

    let outcome = install_steps(setup, &dir, supervisor).await?;
    match &outcome {
        InstallOutcome::Installed => tracing::info!("accelerated rasterizer installed"),
        InstallOutcome::Failed(reason) => {
            tracing::error!(reason = %reason, "accelerated rasterizer install failed");
            tracing::warn!("continuing with the default rasterizer");
        }
        InstallOutcome::Skipped => {}
    }
    Ok(outcome)
}

async fn install_steps(
    setup: &SetupConfig,
    dir: &std::path::Path,
    supervisor: &Supervisor<'_>,
) -> PipelineResult<InstallOutcome> {
    let uninstall = Invocation::new("pip").args(["uninstall", RASTERIZER_PACKAGE, "-y"]).current_dir(dir);
    if let Some(reason) = failure(supervisor.run(Stage::Setup, "uninstall old rasterizer", &uninstall).await?) {
        return Ok(InstallOutcome::Failed(reason));
    }

    let build = dir.join("build");
    if build.exists() {
        if let Err(e) = tokio::fs::remove_dir_all(&build).await {
            return Ok(InstallOutcome::Failed(format!("failed to remove {}: {e}", build.display())));
        }
    }

    let checkout = Invocation::new("git").args(["checkout", setup.rasterizer_branch.as_str()]).current_dir(dir);
    if let Some(reason) = failure(supervisor.run(Stage::Setup, "switch rasterizer branch", &checkout).await?) {
        return Ok(InstallOutcome::Failed(reason));
    }

    let install = Invocation::new("pip").args(["install", "."]).current_dir(dir);
    if let Some(reason) = failure(supervisor.run(Stage::Setup, "install rasterizer", &install).await?) {
        return Ok(InstallOutcome::Failed(reason));
    }

    Ok(InstallOutcome::Installed)
}

fn failure(outcome: StageOutcome) -> Option<String> {
    match outcome {
        StageOutcome::Failed { code, diagnostics } => {
            Some(format!("exit code {}: {diagnostics}", code.map_or_else(|| "none".to_string(), |c| c.to_string())))
        }
        StageOutcome::Succeeded { .. } | StageOutcome::Skipped => None,
    }
}
