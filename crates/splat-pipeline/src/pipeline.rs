//! The pipeline controller.
//!
//! ```text
//! Idle -> Validating -> [InstallingExtensions] -> Scheduling -> RunningSegments -> FinalPass -> Completed
//!              \__________________________ any error __________________________/-> Aborted
//! ```
//!
//! Exactly one child process runs at a time; each stage's files must be on disk before
//! the next stage starts.

use crate::command::CommandBuilder;
use crate::error::{PipelineError, PipelineResult};
use crate::events::{EventSink, PipelineEvent, PipelineState, TracingEventSink};
use crate::install::install_accelerated_rasterizer;
use crate::inventory::CheckpointInventory;
use crate::job::JobConfig;
use crate::resume::resolve_start_iteration;
use crate::schedule::schedule;
use crate::summary::PipelineSummary;
use crate::supervisor::{ProcessRunner, Stage, StageOutcome, Supervisor};
use crate::toolchain::Toolchain;
use crate::workdir::WorkdirGuard;
use std::time::Instant;

pub struct Pipeline<'a> {
    job: JobConfig,
    toolchain: Toolchain,
    runner: &'a dyn ProcessRunner,
    events: &'a dyn EventSink,
}

impl<'a> Pipeline<'a> {
    /// `job` paths must already be absolute (see [`JobConfig::with_resolved_paths`]).
    #[must_use]
    pub fn new(job: JobConfig, toolchain: Toolchain, runner: &'a dyn ProcessRunner) -> Self {
        Self { job, toolchain, runner, events: &TracingEventSink }
    }

    #[must_use]
    pub fn with_events(mut self, events: &'a dyn EventSink) -> Self {
        self.events = events;
        self
    }

    #[must_use]
    pub fn job(&self) -> &JobConfig {
        &self.job
    }

    /// Run the whole job and summarise what it produced.
    pub async fn run(&self) -> PipelineResult<PipelineSummary> {
        let started = Instant::now();
        self.transition(PipelineState::Idle);
        tracing::info!("{}", "=".repeat(60));
        tracing::info!(job = %self.job.name, "starting pipeline");
        tracing::info!("description: {}", self.job.description());
        tracing::info!("{}", "=".repeat(60));

        match self.execute().await {
            Ok(()) => {
                self.transition(PipelineState::Completed);
                let summary = PipelineSummary::collect(&self.job.name, &self.job.paths.model_path, started.elapsed());
                summary.report();
                Ok(summary)
            }
            Err(e) => {
                self.transition(PipelineState::Aborted);
                tracing::error!(error = %e, "pipeline aborted");
                Err(e)
            }
        }
    }

    async fn execute(&self) -> PipelineResult<()> {
        self.transition(PipelineState::Validating);
        self.validate()?;

        // Scripts are resolved relative to the toolchain checkout.
        let _workdir = WorkdirGuard::enter(self.toolchain.dir())?;
        let supervisor = Supervisor::new(self.runner, self.job.post_processing.clone());

        if self.job.setup.install_accelerated_rasterizer {
            self.transition(PipelineState::InstallingExtensions);
            install_accelerated_rasterizer(&self.job.setup, &self.toolchain, &supervisor).await?;
        }

        self.transition(PipelineState::Scheduling);
        let training = &self.job.training;
        let inventory = CheckpointInventory::scan(&self.job.paths.model_path)?;
        let start = resolve_start_iteration(training, &inventory);
        let total = training.iterations;
        let segments = schedule(
            start,
            total,
            &training.test_iterations,
            &training.save_iterations,
            self.job.post_processing.enable_intermediate_eval,
        );
        self.events.on_event(PipelineEvent::Scheduled {
            start_iteration: start,
            total_iterations: total,
            segments: segments.clone(),
        });

        self.transition(PipelineState::RunningSegments);
        let builder = CommandBuilder::new(&self.job, &self.toolchain);
        if start >= total {
            tracing::info!(current = start, target = total, "model already trained; skipping training");
        } else if start > 0 {
            tracing::info!(from = start, to = total, "continuing training");
        }
        if !self.job.post_processing.enable_intermediate_eval && start < total {
            tracing::info!("intermediate evaluation disabled; training in a single run");
        }

        for (index, segment) in segments.iter().enumerate() {
            self.events.on_event(PipelineEvent::SegmentStarted { index, segment: *segment });
            let invocation = builder.train(segment);
            supervisor.run(Stage::Train, &format!("training segment {segment}"), &invocation).await?;
            self.events.on_event(PipelineEvent::StageFinished { stage: Stage::Train, iteration: Some(segment.end), ok: true });

            if segment.evaluate_after {
                self.evaluate(&supervisor, &builder, Some(segment.end)).await?;
            }
        }

        self.transition(PipelineState::FinalPass);
        self.evaluate(&supervisor, &builder, None).await
    }

    /// Toolchain and source must exist; the model directory's parent is created.
    fn validate(&self) -> PipelineResult<()> {
        let paths = &self.job.paths;
        if !paths.source_path.is_absolute() || !paths.model_path.is_absolute() {
            return Err(PipelineError::InvalidConfig("job paths must be resolved to absolute paths".to_string()));
        }
        if !self.toolchain.dir().is_dir() {
            return Err(PipelineError::PathNotFound {
                what: "toolchain directory",
                path: self.toolchain.dir().to_path_buf(),
            });
        }
        if !paths.source_path.exists() {
            return Err(PipelineError::PathNotFound { what: "source data path", path: paths.source_path.clone() });
        }
        if let Some(parent) = paths.model_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        tracing::info!("all paths validated");
        Ok(())
    }

    /// Render then score. Failures in either are logged and absorbed.
    async fn evaluate(
        &self,
        supervisor: &Supervisor<'_>,
        builder: &CommandBuilder<'_>,
        iteration: Option<u64>,
    ) -> PipelineResult<()> {
        let (render_label, metrics_label) = match iteration {
            Some(n) => (format!("render (iteration {n})"), format!("metrics (iteration {n})")),
            None => ("final render".to_string(), "final metrics".to_string()),
        };

        let render = supervisor.run(Stage::Render, &render_label, &builder.render(iteration)).await?;
        self.stage_finished(Stage::Render, iteration, &render);

        let metrics = supervisor.run(Stage::Metrics, &metrics_label, &builder.metrics(iteration)).await?;
        self.stage_finished(Stage::Metrics, iteration, &metrics);
        Ok(())
    }

    fn stage_finished(&self, stage: Stage, iteration: Option<u64>, outcome: &StageOutcome) {
        if *outcome != StageOutcome::Skipped {
            self.events.on_event(PipelineEvent::StageFinished { stage, iteration, ok: !outcome.is_failure() });
        }
    }

    fn transition(&self, state: PipelineState) {
        self.events.on_event(PipelineEvent::StateChanged { state });
    }
}
