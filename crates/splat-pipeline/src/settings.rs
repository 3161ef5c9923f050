//! Tool settings file support.
//!
//! Settings are layered, later layers winning:
//! 1. Defaults
//! 2. Global file (~/.splat/config.toml)
//! 3. Local file (./.splatrc)
//! 4. Environment (`SPLAT_JOBS_DIR`, `SPLAT_TOOLCHAIN_DIR`)
//!
//! Command-line flags are applied on top by the binary.

use crate::toolchain::{default_launcher, Toolchain};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Directory holding job files.
    #[serde(default)]
    pub jobs_dir: Option<PathBuf>,

    /// Gaussian Splatting checkout the scripts run from.
    #[serde(default)]
    pub toolchain_dir: Option<PathBuf>,

    /// Command prefix used to run the scripts.
    #[serde(default)]
    pub launcher: Option<Vec<String>>,

    #[serde(default)]
    pub log_level: Option<String>,
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Failed to read settings file: {0}")]
    ReadError(String),

    #[error("Failed to parse settings file: {0}")]
    ParseError(String),
}

pub type SettingsResult<T> = std::result::Result<T, SettingsError>;

impl Settings {
    pub fn load_from_file(path: &Path) -> SettingsResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| SettingsError::ReadError(format!("{}: {}", path.display(), e)))?;
        toml::from_str(&content).map_err(|e| SettingsError::ParseError(format!("{}: {}", path.display(), e)))
    }

    pub fn default_global_path() -> PathBuf {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(".splat")
            .join("config.toml")
    }

    pub fn default_local_path() -> PathBuf {
        PathBuf::from(".splatrc")
    }

    /// Load global and local files and apply environment overrides.
    ///
    /// Unreadable or malformed files are logged and skipped.
    pub fn discover_and_load() -> Self {
        let mut settings = Self::default();
        for path in [Self::default_global_path(), Self::default_local_path()] {
            if !path.exists() {
                continue;
            }
            match Self::load_from_file(&path) {
                Ok(layer) => settings.merge(layer),
                Err(e) => tracing::warn!(error = %e, "ignoring settings file"),
            }
        }
        settings.apply_env(|key| std::env::var_os(key));
        settings
    }

    /// Overlay the fields set in `other`.
    pub fn merge(&mut self, other: Self) {
        if other.jobs_dir.is_some() {
            self.jobs_dir = other.jobs_dir;
        }
        if other.toolchain_dir.is_some() {
            self.toolchain_dir = other.toolchain_dir;
        }
        if other.launcher.is_some() {
            self.launcher = other.launcher;
        }
        if other.log_level.is_some() {
            self.log_level = other.log_level;
        }
    }

    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<std::ffi::OsString>) {
        if let Some(dir) = lookup("SPLAT_JOBS_DIR") {
            self.jobs_dir = Some(PathBuf::from(dir));
        }
        if let Some(dir) = lookup("SPLAT_TOOLCHAIN_DIR") {
            self.toolchain_dir = Some(PathBuf::from(dir));
        }
    }

    /// Jobs directory resolved against `root`; `config/` by default.
    pub fn jobs_dir(&self, root: &Path) -> PathBuf {
        root.join(self.jobs_dir.as_deref().unwrap_or_else(|| Path::new("config")))
    }

    /// Toolchain resolved against `root`; `gaussian-splatting/` by default.
    pub fn toolchain(&self, root: &Path) -> Toolchain {
        let dir = root.join(self.toolchain_dir.as_deref().unwrap_or_else(|| Path::new("gaussian-splatting")));
        Toolchain::new(dir).with_launcher(self.launcher.clone().unwrap_or_else(default_launcher))
    }
}
