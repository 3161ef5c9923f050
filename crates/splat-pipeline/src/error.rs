use crate::supervisor::Stage;
use std::path::PathBuf;
use thiserror::Error;

pub type PipelineResult<T> = std::result::Result<T, PipelineError>;

/// Exit code reported when the operator interrupts a run.
pub const EXIT_INTERRUPTED: u8 = 130;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("job file is missing required field: {0}")]
    MissingField(String),

    #[error("invalid job configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to parse job file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("{what} does not exist: {}", path.display())]
    PathNotFound { what: &'static str, path: PathBuf },

    #[error("{stage} stage failed (exit code {})", code.map_or_else(|| "none".to_string(), |c| c.to_string()))]
    StageFailed { stage: Stage, code: Option<i32> },

    #[error("interrupted by operator")]
    Interrupted,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl PipelineError {
    /// Process exit code for this error: 130 for interruption, 1 for everything else.
    #[must_use]
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Interrupted => EXIT_INTERRUPTED,
            _ => 1,
        }
    }
}
