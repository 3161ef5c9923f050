use crate::inventory::CheckpointInventory;
use crate::job::{ResumeFrom, TrainingParams};

/// Decide the iteration a (re)run starts training from.
///
/// Resuming is best-effort: an empty inventory or a requested iteration that is not on
/// disk degrades with a warning instead of failing the run.
pub fn resolve_start_iteration(training: &TrainingParams, inventory: &CheckpointInventory) -> u64 {
    if !training.resume_training {
        return 0;
    }

    let Some(latest) = inventory.latest() else {
        tracing::warn!("resume_training is enabled but no checkpoints were found; starting from scratch");
        return 0;
    };

    match training.resume_from_iteration {
        ResumeFrom::Latest => {
            tracing::info!(iteration = latest, "resuming from latest checkpoint");
            latest
        }
        ResumeFrom::Iteration(requested) if inventory.contains(requested) => {
            tracing::info!(iteration = requested, "resuming from requested checkpoint");
            requested
        }
        ResumeFrom::Iteration(requested) => {
            tracing::warn!(
                requested,
                available = ?inventory.to_vec(),
                fallback = latest,
                "requested resume iteration has no checkpoint; using latest"
            );
            latest
        }
    }
}
