use std::path::{Path, PathBuf};

/// Prefix of optimizer checkpoint files: `chkpnt<iteration>.pth`.
pub const CHECKPOINT_PREFIX: &str = "chkpnt";
pub const CHECKPOINT_EXTENSION: &str = "pth";
/// Prefix of point-cloud snapshot directories: `point_cloud/iteration_<iteration>/`.
pub const SNAPSHOT_PREFIX: &str = "iteration_";

/// Filesystem layout of a model output directory as written by the trainer.
#[derive(Debug, Clone)]
pub struct ModelLayout {
    root: PathBuf,
}

impl ModelLayout {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn checkpoint_path(&self, iteration: u64) -> PathBuf {
        self.root.join(format!("{CHECKPOINT_PREFIX}{iteration}.{CHECKPOINT_EXTENSION}"))
    }

    #[must_use]
    pub fn point_cloud_dir(&self) -> PathBuf {
        self.root.join("point_cloud")
    }

    #[must_use]
    pub fn snapshot_dir(&self, iteration: u64) -> PathBuf {
        self.point_cloud_dir().join(format!("{SNAPSHOT_PREFIX}{iteration}"))
    }

    #[must_use]
    pub fn results_path(&self) -> PathBuf {
        self.root.join("results.json")
    }

    /// Where the render stage writes test-view images.
    #[must_use]
    pub fn test_dir(&self) -> PathBuf {
        self.root.join("test")
    }
}

/// Parse the iteration out of a checkpoint file name such as `chkpnt7000.pth`.
pub fn parse_checkpoint_name(file_name: &str) -> Option<u64> {
    file_name
        .strip_prefix(CHECKPOINT_PREFIX)?
        .strip_suffix(CHECKPOINT_EXTENSION)?
        .strip_suffix('.')?
        .parse()
        .ok()
}

/// Parse the iteration out of a snapshot directory name such as `iteration_7000`.
pub fn parse_snapshot_name(dir_name: &str) -> Option<u64> {
    dir_name.strip_prefix(SNAPSHOT_PREFIX)?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_paths() {
        let layout = ModelLayout::new("/out/garden");
        assert_eq!(layout.checkpoint_path(7000), PathBuf::from("/out/garden/chkpnt7000.pth"));
        assert_eq!(
            layout.snapshot_dir(30000),
            PathBuf::from("/out/garden/point_cloud/iteration_30000")
        );
        assert_eq!(layout.results_path(), PathBuf::from("/out/garden/results.json"));
        assert_eq!(layout.test_dir(), PathBuf::from("/out/garden/test"));
    }

    #[test]
    fn test_name_parsing() {
        assert_eq!(parse_checkpoint_name("chkpnt7000.pth"), Some(7000));
        assert_eq!(parse_checkpoint_name("chkpnt.pth"), None);
        assert_eq!(parse_checkpoint_name("chkpntlatest.pth"), None);
        assert_eq!(parse_checkpoint_name("chkpnt7000.pt"), None);
        assert_eq!(parse_snapshot_name("iteration_30000"), Some(30000));
        assert_eq!(parse_snapshot_name("iteration_final"), None);
        assert_eq!(parse_snapshot_name("iter_1"), None);
    }
}
