use crate::error::PipelineResult;
use std::path::{Path, PathBuf};

/// Changes the process working directory and restores the previous one when dropped.
///
/// Restoration happens on every exit path that unwinds or returns, including a
/// dropped future when the run is interrupted.
#[derive(Debug)]
pub struct WorkdirGuard {
    original: PathBuf,
    current: PathBuf,
}

impl WorkdirGuard {
    pub fn enter(target: &Path) -> PipelineResult<Self> {
        let original = std::env::current_dir()?;
        std::env::set_current_dir(target)?;
        tracing::debug!(dir = %target.display(), "entered working directory");
        Ok(Self { original, current: target.to_path_buf() })
    }

    #[must_use]
    pub fn original(&self) -> &Path {
        &self.original
    }

    #[must_use]
    pub fn current(&self) -> &Path {
        &self.current
    }
}

impl Drop for WorkdirGuard {
    fn drop(&mut self) {
        match std::env::set_current_dir(&self.original) {
            Ok(()) => tracing::debug!(dir = %self.original.display(), "restored working directory"),
            Err(e) => tracing::error!(
                dir = %self.original.display(),
                error = %e,
                "failed to restore working directory"
            ),
        }
    }
}
