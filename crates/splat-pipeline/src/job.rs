use crate::error::{PipelineError, PipelineResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level keys a job file must carry.
pub const REQUIRED_FIELDS: [&str; 3] = ["name", "paths", "training"];

/// A training job as declared in a YAML job file.
///
/// Loaded once per run. The only mutation after load is [`JobConfig::with_resolved_paths`],
/// which turns relative `paths` into absolute ones before any stage executes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobConfig {
    pub name: String,
    /// Free text; non-string scalars such as `2024` are kept as their YAML text.
    #[serde(default, deserialize_with = "lenient_text")]
    pub description: Option<String>,
    pub paths: PathsConfig,
    pub training: TrainingParams,
    #[serde(default)]
    pub post_processing: PostProcessing,
    #[serde(default)]
    pub setup: SetupConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PathsConfig {
    pub source_path: PathBuf,
    pub model_path: PathBuf,
}

/// Where a resumed run should pick up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum ResumeFrom {
    /// `-1` in the job file: the newest checkpoint on disk.
    #[default]
    Latest,
    Iteration(u64),
}

impl TryFrom<i64> for ResumeFrom {
    type Error = String;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            -1 => Ok(Self::Latest),
            v if v >= 0 => Ok(Self::Iteration(v.unsigned_abs())),
            v => Err(format!("resume_from_iteration must be -1 or >= 0, got {v}")),
        }
    }
}

impl From<ResumeFrom> for i64 {
    fn from(value: ResumeFrom) -> Self {
        match value {
            ResumeFrom::Latest => -1,
            ResumeFrom::Iteration(n) => i64::try_from(n).unwrap_or(i64::MAX),
        }
    }
}

/// Parameters forwarded to the training process.
///
/// The core densification and learning-rate settings default to concrete values and
/// are always sent. A `None` (an explicit `null` in the job file, or one of the
/// remaining optimiser fields left unset) emits no flag, so the trainer's own default applies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TrainingParams {
    pub iterations: u64,

    pub eval: bool,
    pub quiet: bool,
    pub disable_viewer: bool,
    pub white_background: bool,
    #[serde(rename = "convert_SHs_python")]
    pub convert_shs_python: bool,
    #[serde(rename = "compute_cov3D_python")]
    pub compute_cov3d_python: bool,

    pub densify_grad_threshold: Option<f64>,
    pub densification_interval: Option<u64>,
    pub densify_from_iter: Option<u64>,
    pub densify_until_iter: Option<u64>,
    pub opacity_reset_interval: Option<u64>,
    pub percent_dense: Option<f64>,
    pub position_lr_init: Option<f64>,
    pub position_lr_final: Option<f64>,
    pub position_lr_delay_mult: Option<f64>,
    pub position_lr_max_steps: Option<u64>,
    pub feature_lr: Option<f64>,
    pub opacity_lr: Option<f64>,
    pub scaling_lr: Option<f64>,
    pub rotation_lr: Option<f64>,
    pub resolution: Option<i64>,
    pub lambda_dssim: Option<f64>,
    pub sh_degree: Option<u32>,
    pub data_device: Option<String>,
    pub optimizer_type: Option<String>,
    /// Accepted for compatibility with existing job files; not forwarded.
    pub camera_extent: Option<f64>,

    pub test_iterations: Vec<u64>,
    pub save_iterations: Vec<u64>,
    /// Iterations at which the trainer writes `chkpnt<N>.pth`.
    pub checkpoint_iterations: Vec<u64>,

    pub resume_training: bool,
    pub resume_from_iteration: ResumeFrom,
}

impl Default for TrainingParams {
    fn default() -> Self {
        Self {
            iterations: 30_000,
            eval: true,
            quiet: false,
            disable_viewer: true,
            white_background: false,
            convert_shs_python: false,
            compute_cov3d_python: false,
            densify_grad_threshold: Some(0.0002),
            densification_interval: Some(100),
            densify_from_iter: None,
            densify_until_iter: Some(15_000),
            opacity_reset_interval: Some(3_000),
            percent_dense: None,
            position_lr_init: Some(0.000_16),
            position_lr_final: Some(0.000_001_6),
            position_lr_delay_mult: None,
            position_lr_max_steps: None,
            feature_lr: None,
            opacity_lr: None,
            scaling_lr: Some(0.005),
            rotation_lr: None,
            resolution: Some(-1),
            lambda_dssim: Some(0.2),
            sh_degree: None,
            data_device: Some("cuda".to_string()),
            optimizer_type: Some("default".to_string()),
            camera_extent: Some(1.0),
            test_iterations: vec![7_000, 30_000],
            save_iterations: vec![7_000, 30_000],
            checkpoint_iterations: Vec::new(),
            resume_training: false,
            resume_from_iteration: ResumeFrom::Latest,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PostProcessing {
    pub enable_render: bool,
    pub enable_metrics: bool,
    pub enable_intermediate_eval: bool,
}

impl Default for PostProcessing {
    fn default() -> Self {
        Self { enable_render: true, enable_metrics: true, enable_intermediate_eval: true }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SetupConfig {
    pub install_accelerated_rasterizer: bool,
    pub rasterizer_branch: String,
}

impl Default for SetupConfig {
    fn default() -> Self {
        Self { install_accelerated_rasterizer: false, rasterizer_branch: "3dgs_accel".to_string() }
    }
}

impl JobConfig {
    /// Read and validate a job file.
    pub fn load(path: &Path) -> PipelineResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => {
                PipelineError::PathNotFound { what: "job file", path: path.to_path_buf() }
            }
            _ => PipelineError::Io(e),
        })?;
        Self::from_yaml_str(&content, path)
    }

    /// Parse a job from YAML text. `origin` is only used in error messages.
    pub fn from_yaml_str(content: &str, origin: &Path) -> PipelineResult<Self> {
        let raw: serde_yaml::Value = serde_yaml::from_str(content)
            .map_err(|source| PipelineError::Parse { path: origin.to_path_buf(), source })?;

        let mapping = raw.as_mapping().ok_or_else(|| {
            PipelineError::InvalidConfig(format!("{} is not a YAML mapping", origin.display()))
        })?;
        for key in REQUIRED_FIELDS {
            if !mapping.contains_key(key) {
                return Err(PipelineError::MissingField(key.to_string()));
            }
        }

        let job: Self = serde_yaml::from_value(raw)
            .map_err(|source| PipelineError::Parse { path: origin.to_path_buf(), source })?;
        job.validate()?;
        Ok(job)
    }

    pub fn validate(&self) -> PipelineResult<()> {
        if self.name.trim().is_empty() {
            return Err(PipelineError::InvalidConfig("name must not be empty".to_string()));
        }
        if self.paths.source_path.as_os_str().is_empty() {
            return Err(PipelineError::InvalidConfig("paths.source_path is required".to_string()));
        }
        if self.paths.model_path.as_os_str().is_empty() {
            return Err(PipelineError::InvalidConfig("paths.model_path is required".to_string()));
        }
        if self.training.iterations == 0 {
            return Err(PipelineError::InvalidConfig("training.iterations must be >= 1".to_string()));
        }
        Ok(())
    }

    /// Resolve relative `source_path` and `model_path` against `root`.
    #[must_use]
    pub fn with_resolved_paths(mut self, root: &Path) -> Self {
        self.paths.source_path = absolutize(&self.paths.source_path, root);
        self.paths.model_path = absolutize(&self.paths.model_path, root);
        self
    }

    #[must_use]
    pub fn description(&self) -> &str {
        self.description.as_deref().unwrap_or("no description")
    }
}

fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    serde_yaml::Value::deserialize(deserializer).map(|value| yaml_text(&value))
}

/// Informational text from any YAML scalar; `None` for null.
pub(crate) fn yaml_text(value: &serde_yaml::Value) -> Option<String> {
    match value {
        serde_yaml::Value::Null => None,
        serde_yaml::Value::String(s) => Some(s.clone()),
        serde_yaml::Value::Bool(b) => Some(b.to_string()),
        serde_yaml::Value::Number(n) => Some(n.to_string()),
        other => serde_yaml::to_string(other).ok().map(|s| s.trim_end().to_string()),
    }
}

fn absolutize(path: &Path, root: &Path) -> PathBuf {
    if path.is_absolute() { path.to_path_buf() } else { root.join(path) }
}
