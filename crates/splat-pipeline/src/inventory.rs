//! Discovery of completed iterations in a model output directory.
//!
//! Two independent signals are read:
//! - optimizer checkpoints `chkpnt<N>.pth` directly under the model directory
//! - point-cloud snapshots `point_cloud/iteration_<N>/`
//!
//! The inventory is the deduplicated union of both. Names that do not parse are skipped.

use crate::error::{PipelineError, PipelineResult};
use crate::layout::{parse_checkpoint_name, parse_snapshot_name, ModelLayout, CHECKPOINT_EXTENSION, CHECKPOINT_PREFIX, SNAPSHOT_PREFIX};
use glob::Pattern;
use std::collections::BTreeSet;
use std::path::Path;

/// Sorted, duplicate-free set of iterations that have some persisted artifact.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckpointInventory {
    iterations: BTreeSet<u64>,
}

impl CheckpointInventory {
    /// Scan `model_dir`. A missing directory yields an empty inventory.
    pub fn scan(model_dir: &Path) -> PipelineResult<Self> {
        let layout = ModelLayout::new(model_dir);
        let mut iterations = BTreeSet::new();
        if !layout.root().is_dir() {
            return Ok(Self { iterations });
        }

        let pattern = format!("{CHECKPOINT_PREFIX}*.{CHECKPOINT_EXTENSION}");
        for path in glob_in(layout.root(), &pattern)? {
            if !path.is_file() {
                continue;
            }
            if let Some(iteration) = file_name(&path).and_then(parse_checkpoint_name) {
                iterations.insert(iteration);
            }
        }

        let snapshots = layout.point_cloud_dir();
        if snapshots.is_dir() {
            for path in glob_in(&snapshots, &format!("{SNAPSHOT_PREFIX}*"))? {
                if !path.is_dir() {
                    continue;
                }
                if let Some(iteration) = file_name(&path).and_then(parse_snapshot_name) {
                    iterations.insert(iteration);
                }
            }
        }

        tracing::debug!(model_dir = %model_dir.display(), found = iterations.len(), "scanned checkpoints");
        Ok(Self { iterations })
    }

    #[must_use]
    pub fn latest(&self) -> Option<u64> {
        self.iterations.last().copied()
    }

    #[must_use]
    pub fn contains(&self, iteration: u64) -> bool {
        self.iterations.contains(&iteration)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.iterations.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.iterations.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = u64> + '_ {
        self.iterations.iter().copied()
    }

    #[must_use]
    pub fn to_vec(&self) -> Vec<u64> {
        self.iter().collect()
    }
}

impl FromIterator<u64> for CheckpointInventory {
    fn from_iter<T: IntoIterator<Item = u64>>(iter: T) -> Self {
        Self { iterations: iter.into_iter().collect() }
    }
}

fn glob_in(dir: &Path, pattern: &str) -> PipelineResult<Vec<std::path::PathBuf>> {
    let full = format!("{}/{}", Pattern::escape(&dir.to_string_lossy()), pattern);
    let paths = glob::glob(&full)
        .map_err(|e| PipelineError::Other(anyhow::anyhow!("invalid glob pattern {full}: {e}")))?;
    // Unreadable entries are treated like unparsable names.
    Ok(paths.filter_map(Result::ok).collect())
}

fn file_name(path: &Path) -> Option<&str> {
    path.file_name().and_then(|n| n.to_str())
}
