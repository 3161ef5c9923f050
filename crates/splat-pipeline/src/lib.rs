//! Splat Pipeline
//!
//! Orchestration of segmented Gaussian Splatting training jobs:
//! - Loading job files (`JobConfig`)
//! - Finding completed iterations on disk and deciding where to resume
//! - Splitting training into segments around evaluation boundaries
//! - Building and supervising the external train / render / metrics processes

pub mod catalog;
pub mod command;
pub mod error;
pub mod events;
pub mod install;
pub mod inventory;
pub mod job;
pub mod layout;
pub mod pipeline;
pub mod resume;
pub mod schedule;
pub mod settings;
pub mod summary;
pub mod supervisor;
pub mod toolchain;
pub mod workdir;

pub use catalog::{list_jobs, JobEntry};
pub use command::{CommandBuilder, Invocation};
pub use error::{PipelineError, PipelineResult, EXIT_INTERRUPTED};
pub use events::{EventSink, PipelineEvent, PipelineState, TracingEventSink};
pub use install::{install_accelerated_rasterizer, InstallOutcome};
pub use inventory::CheckpointInventory;
pub use job::{JobConfig, PathsConfig, PostProcessing, ResumeFrom, SetupConfig, TrainingParams};
pub use layout::ModelLayout;
pub use pipeline::Pipeline;
pub use resume::resolve_start_iteration;
pub use schedule::{evaluation_boundaries, schedule, Segment};
pub use settings::Settings;
pub use summary::PipelineSummary;
pub use supervisor::{OutputMode, ProcessOutput, ProcessRunner, Stage, StageOutcome, Supervisor, SystemRunner};
pub use toolchain::Toolchain;
pub use workdir::WorkdirGuard;
