use crate::layout::ModelLayout;
use glob::Pattern;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// What a completed run left behind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PipelineSummary {
    pub job_name: String,
    #[serde(with = "duration_secs")]
    pub elapsed: Duration,
    pub model_path: PathBuf,
    /// `results.json`, if the metrics script wrote one.
    pub results_file: Option<PathBuf>,
    pub test_dir: Option<PathBuf>,
    pub test_images: usize,
}

impl PipelineSummary {
    /// Collect the summary by inspecting `model_path` on disk.
    #[must_use]
    pub fn collect(job_name: &str, model_path: &Path, elapsed: Duration) -> Self {
        let model_path = model_path.canonicalize().unwrap_or_else(|_| model_path.to_path_buf());
        let layout = ModelLayout::new(&model_path);

        let results = layout.results_path();
        let test_dir = layout.test_dir();
        let (test_dir, test_images) =
            if test_dir.is_dir() { (Some(test_dir.clone()), count_images(&test_dir)) } else { (None, 0) };

        Self {
            job_name: job_name.to_string(),
            elapsed,
            model_path,
            results_file: results.is_file().then_some(results),
            test_dir,
            test_images,
        }
    }

    /// Log the summary at info level.
    pub fn report(&self) {
        tracing::info!("{}", "=".repeat(60));
        tracing::info!(job = %self.job_name, "pipeline completed");
        tracing::info!("elapsed: {}", format_elapsed(self.elapsed));
        tracing::info!("results saved in: {}", self.model_path.display());
        if let Some(results) = &self.results_file {
            tracing::info!("- metrics: {}", results.display());
        }
        if let Some(test_dir) = &self.test_dir {
            tracing::info!("- test renders: {} ({} images)", test_dir.display(), self.test_images);
        }
        tracing::info!("{}", "=".repeat(60));
    }
}

/// `HH:MM:SS`; hours are not wrapped at 24.
#[must_use]
pub fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    format!("{:02}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60)
}

fn count_images(dir: &Path) -> usize {
    let pattern = format!("{}/*.png", Pattern::escape(&dir.to_string_lossy()));
    glob::glob(&pattern).map_or(0, |paths| paths.filter_map(Result::ok).filter(|p| p.is_file()).count())
}

mod duration_secs {
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_format_elapsed() {
        assert_eq!(format_elapsed(Duration::from_secs(0)), "00:00:00");
        assert_eq!(format_elapsed(Duration::from_secs(3725)), "01:02:05");
        assert_eq!(format_elapsed(Duration::from_secs(100 * 3600)), "100:00:00");
    }

    #[test]
    fn test_collect_counts_png_renders() {
        let temp = TempDir::new().unwrap();
        let model = temp.path();
        fs::create_dir_all(model.join("test/ours_30000")).unwrap();
        fs::write(model.join("test/00000.png"), b"").unwrap();
        fs::write(model.join("test/00001.png"), b"").unwrap();
        fs::write(model.join("test/notes.txt"), b"").unwrap();
        fs::write(model.join("test/ours_30000/00000.png"), b"").unwrap();
        fs::write(model.join("results.json"), b"{}").unwrap();

        let summary = PipelineSummary::collect("garden", model, Duration::from_secs(5));
        assert_eq!(summary.test_images, 2);
        assert!(summary.results_file.is_some());
        assert!(summary.model_path.is_absolute());
    }

    #[test]
    fn test_collect_on_empty_model_dir() {
        let temp = TempDir::new().unwrap();
        let summary = PipelineSummary::collect("garden", temp.path(), Duration::ZERO);
        assert_eq!(summary.test_images, 0);
        assert!(summary.results_file.is_none());
        assert!(summary.test_dir.is_none());
    }

    #[test]
    fn test_summary_serializes_elapsed_seconds() {
        let temp = TempDir::new().unwrap();
        let summary = PipelineSummary::collect("garden", temp.path(), Duration::from_millis(1500));
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["elapsed"], serde_json::json!(1.5));
        assert_eq!(json["job_name"], "garden");
    }
}
