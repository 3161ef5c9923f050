use crate::schedule::Segment;
use crate::supervisor::Stage;
use serde::Serialize;
use std::fmt;

/// States of the pipeline controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    Idle,
    Validating,
    InstallingExtensions,
    Scheduling,
    RunningSegments,
    FinalPass,
    Completed,
    Aborted,
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Idle => "idle",
            Self::Validating => "validating",
            Self::InstallingExtensions => "installing-extensions",
            Self::Scheduling => "scheduling",
            Self::RunningSegments => "running-segments",
            Self::FinalPass => "final-pass",
            Self::Completed => "completed",
            Self::Aborted => "aborted",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PipelineEvent {
    StateChanged { state: PipelineState },
    Scheduled { start_iteration: u64, total_iterations: u64, segments: Vec<Segment> },
    SegmentStarted { index: usize, segment: Segment },
    StageFinished { stage: Stage, iteration: Option<u64>, ok: bool },
}

pub trait EventSink: Send + Sync {
    fn on_event(&self, event: PipelineEvent);
}

/// Default sink: forwards events to `tracing`.
#[derive(Debug, Default)]
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn on_event(&self, event: PipelineEvent) {
        match event {
            PipelineEvent::StateChanged { state } => tracing::debug!(%state, "pipeline state"),
            PipelineEvent::Scheduled { start_iteration, total_iterations, segments } => {
                let boundaries: Vec<u64> = segments.iter().filter(|s| s.evaluate_after).map(|s| s.end).collect();
                tracing::info!(
                    start = start_iteration,
                    total = total_iterations,
                    segments = segments.len(),
                    evaluate_at = ?boundaries,
                    "training scheduled"
                );
            }
            PipelineEvent::SegmentStarted { index, segment } => {
                tracing::info!(index, %segment, "training segment started");
            }
            PipelineEvent::StageFinished { stage, iteration, ok } => {
                tracing::debug!(%stage, ?iteration, ok, "stage finished");
            }
        }
    }
}
