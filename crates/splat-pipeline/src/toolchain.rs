use std::ffi::OsString;
use std::path::{Path, PathBuf};

pub const TRAIN_SCRIPT: &str = "train.py";
pub const RENDER_SCRIPT: &str = "render.py";
pub const METRICS_SCRIPT: &str = "metrics.py";

/// The external Gaussian Splatting checkout and how its scripts are launched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toolchain {
    dir: PathBuf,
    launcher: Vec<String>,
}

impl Toolchain {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into(), launcher: default_launcher() }
    }

    /// Replace the launcher prefix (`uv run python` by default). An empty launcher
    /// executes scripts directly.
    #[must_use]
    pub fn with_launcher(mut self, launcher: Vec<String>) -> Self {
        self.launcher = launcher;
        self
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    #[must_use]
    pub fn launcher(&self) -> &[String] {
        &self.launcher
    }

    /// Program and leading arguments that run `script`.
    #[must_use]
    pub fn command_line(&self, script: &str) -> (String, Vec<String>) {
        match self.launcher.split_first() {
            Some((program, rest)) => {
                let mut args = rest.to_vec();
                args.push(script.to_string());
                (program.clone(), args)
            }
            None => (script.to_string(), Vec::new()),
        }
    }

    #[must_use]
    pub fn rasterizer_dir(&self) -> PathBuf {
        self.dir.join("submodules").join("diff-gaussian-rasterization")
    }

    /// `PYTHONPATH` for child processes: the toolchain directory prepended to `current`
    /// unless it is already listed.
    #[must_use]
    pub fn python_path(&self, current: Option<OsString>) -> OsString {
        let existing: Vec<PathBuf> =
            current.as_ref().map(|c| std::env::split_paths(c).collect()).unwrap_or_default();
        if existing.iter().any(|p| p == &self.dir) {
            return current.unwrap_or_default();
        }
        let joined = std::iter::once(self.dir.clone()).chain(existing.into_iter().filter(|p| !p.as_os_str().is_empty()));
        std::env::join_paths(joined).unwrap_or_else(|_| self.dir.clone().into_os_string())
    }
}

#[must_use]
pub fn default_launcher() -> Vec<String> {
    ["uv", "run", "python"].iter().map(|s| (*s).to_string()).collect()
}
