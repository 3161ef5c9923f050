//! Argument lists for the train, render and metrics scripts.
//!
//! Building is pure apart from one filesystem probe: whether the checkpoint a
//! continuation segment would resume from exists.

use crate::job::{JobConfig, TrainingParams};
use crate::layout::ModelLayout;
use crate::schedule::Segment;
use crate::toolchain::{Toolchain, METRICS_SCRIPT, RENDER_SCRIPT, TRAIN_SCRIPT};
use std::ffi::OsString;
use std::fmt;
use std::path::PathBuf;

/// A fully resolved external process invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub env: Vec<(String, OsString)>,
    /// Working directory for the child; inherits the parent's when `None`.
    pub cwd: Option<PathBuf>,
}

impl Invocation {
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self { program: program.into(), args: Vec::new(), env: Vec::new(), cwd: None }
    }

    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<OsString>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    #[must_use]
    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    /// True if `flag` appears as an argument.
    #[must_use]
    pub fn has_flag(&self, flag: &str) -> bool {
        self.args.iter().any(|a| a == flag)
    }

    /// The argument following `flag`, if any.
    #[must_use]
    pub fn flag_value(&self, flag: &str) -> Option<&str> {
        let idx = self.args.iter().position(|a| a == flag)?;
        self.args.get(idx + 1).map(String::as_str)
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Maps one optional training parameter to its command-line flag.
pub struct ParamFlag {
    pub flag: &'static str,
    pub value: fn(&TrainingParams) -> Option<String>,
}

fn float(v: Option<f64>) -> Option<String> {
    v.map(|v| v.to_string())
}

fn uint(v: Option<u64>) -> Option<String> {
    v.map(|v| v.to_string())
}

/// Valued hyperparameters, in emission order.
pub const PARAM_FLAGS: &[ParamFlag] = &[
    ParamFlag { flag: "--densify_grad_threshold", value: |t| float(t.densify_grad_threshold) },
    ParamFlag { flag: "--densification_interval", value: |t| uint(t.densification_interval) },
    ParamFlag { flag: "--densify_from_iter", value: |t| uint(t.densify_from_iter) },
    ParamFlag { flag: "--densify_until_iter", value: |t| uint(t.densify_until_iter) },
    ParamFlag { flag: "--opacity_reset_interval", value: |t| uint(t.opacity_reset_interval) },
    ParamFlag { flag: "--percent_dense", value: |t| float(t.percent_dense) },
    ParamFlag { flag: "--position_lr_init", value: |t| float(t.position_lr_init) },
    ParamFlag { flag: "--position_lr_final", value: |t| float(t.position_lr_final) },
    ParamFlag { flag: "--position_lr_delay_mult", value: |t| float(t.position_lr_delay_mult) },
    ParamFlag { flag: "--position_lr_max_steps", value: |t| uint(t.position_lr_max_steps) },
    ParamFlag { flag: "--feature_lr", value: |t| float(t.feature_lr) },
    ParamFlag { flag: "--opacity_lr", value: |t| float(t.opacity_lr) },
    ParamFlag { flag: "--scaling_lr", value: |t| float(t.scaling_lr) },
    ParamFlag { flag: "--rotation_lr", value: |t| float(t.rotation_lr) },
    ParamFlag { flag: "--resolution", value: |t| t.resolution.map(|v| v.to_string()) },
    ParamFlag { flag: "--lambda_dssim", value: |t| float(t.lambda_dssim) },
    ParamFlag { flag: "--sh_degree", value: |t| t.sh_degree.map(|v| v.to_string()) },
    ParamFlag { flag: "--data_device", value: |t| t.data_device.clone() },
    ParamFlag { flag: "--optimizer_type", value: |t| t.optimizer_type.clone() },
];

/// Boolean switches, appended bare when true.
pub const SWITCH_FLAGS: &[(&str, fn(&TrainingParams) -> bool)] = &[
    ("--eval", |t| t.eval),
    ("--quiet", |t| t.quiet),
    ("--disable_viewer", |t| t.disable_viewer),
    ("--white_background", |t| t.white_background),
    ("--convert_SHs_python", |t| t.convert_shs_python),
    ("--compute_cov3D_python", |t| t.compute_cov3d_python),
];

/// Iteration lists, emitted as the flag followed by every value.
pub const LIST_FLAGS: &[(&str, fn(&TrainingParams) -> &[u64])] = &[
    ("--test_iterations", |t| t.test_iterations.as_slice()),
    ("--save_iterations", |t| t.save_iterations.as_slice()),
    ("--checkpoint_iterations", |t| t.checkpoint_iterations.as_slice()),
];

pub const START_CHECKPOINT_FLAG: &str = "--start_checkpoint";

pub struct CommandBuilder<'a> {
    job: &'a JobConfig,
    toolchain: &'a Toolchain,
    layout: ModelLayout,
    python_path: OsString,
}

impl<'a> CommandBuilder<'a> {
    /// `job` must already have absolute paths.
    #[must_use]
    pub fn new(job: &'a JobConfig, toolchain: &'a Toolchain) -> Self {
        let python_path = toolchain.python_path(std::env::var_os("PYTHONPATH"));
        Self { job, toolchain, layout: ModelLayout::new(&job.paths.model_path), python_path }
    }

    fn script(&self, script: &str) -> Invocation {
        let (program, args) = self.toolchain.command_line(script);
        Invocation::new(program).args(args).env("PYTHONPATH", self.python_path.clone())
    }

    fn model_path(&self) -> String {
        self.job.paths.model_path.display().to_string()
    }

    fn source_path(&self) -> String {
        self.job.paths.source_path.display().to_string()
    }

    /// Training invocation for one segment. `--iterations` is the segment's end,
    /// not the job total.
    pub fn train(&self, segment: &Segment) -> Invocation {
        let training = &self.job.training;
        let mut cmd = self
            .script(TRAIN_SCRIPT)
            .args(["--source_path".to_string(), self.source_path()])
            .args(["--model_path".to_string(), self.model_path()])
            .args(["--iterations".to_string(), segment.end.to_string()]);

        for param in PARAM_FLAGS {
            if let Some(value) = (param.value)(training) {
                cmd = cmd.arg(param.flag).arg(value);
            }
        }

        for (flag, enabled) in SWITCH_FLAGS {
            if enabled(training) {
                cmd = cmd.arg(*flag);
            }
        }

        for (flag, values) in LIST_FLAGS {
            let values = values(training);
            if !values.is_empty() {
                cmd = cmd.arg(*flag).args(values.iter().map(u64::to_string));
            }
        }

        if segment.start > 0 || !segment.is_first_segment {
            let checkpoint = self.layout.checkpoint_path(segment.start);
            if checkpoint.exists() {
                tracing::info!(checkpoint = %checkpoint.display(), "continuing from checkpoint");
                cmd = cmd.arg(START_CHECKPOINT_FLAG).arg(checkpoint.display().to_string());
            } else {
                tracing::warn!(
                    checkpoint = %checkpoint.display(),
                    "checkpoint not found; training will not resume from it"
                );
                // The trainer has no way to start at iteration N without a checkpoint.
                if !segment.is_first_segment {
                    tracing::error!(
                        start = segment.start,
                        end = segment.end,
                        "continuation segment is missing its checkpoint; results may be incorrect"
                    );
                }
            }
        }

        cmd
    }

    /// Render invocation. `iteration` selects a saved snapshot; `None` renders the
    /// trainer's default (latest) output.
    pub fn render(&self, iteration: Option<u64>) -> Invocation {
        let mut cmd = self
            .script(RENDER_SCRIPT)
            .args(["--model_path".to_string(), self.model_path()])
            .args(["--source_path".to_string(), self.source_path()]);
        if let Some(iteration) = iteration.filter(|&n| n > 0) {
            cmd = cmd.arg("--iteration").arg(iteration.to_string());
        }
        if self.job.training.quiet {
            cmd = cmd.arg("--quiet");
        }
        cmd
    }

    /// Metrics invocation. The metrics script scores whatever is rendered under the
    /// model's test area, so the iteration is only used for logging.
    pub fn metrics(&self, iteration: Option<u64>) -> Invocation {
        tracing::trace!(?iteration, "building metrics invocation");
        self.script(METRICS_SCRIPT).args(["--model_paths".to_string(), self.model_path()])
    }
}
