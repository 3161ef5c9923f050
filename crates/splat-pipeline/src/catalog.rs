//! Listing of the job files available in a jobs directory.

use crate::job::yaml_text;
use glob::Pattern;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Summary of one job file, read leniently so that a broken file still lists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobEntry {
    pub path: PathBuf,
    pub file_name: String,
    pub name: Option<String>,
    pub description: Option<String>,
    pub iterations: Option<u64>,
    /// Set when the file could not be read or parsed.
    pub error: Option<String>,
}

impl JobEntry {
    fn read(path: PathBuf) -> Self {
        let file_name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
        let mut entry =
            Self { path, file_name, name: None, description: None, iterations: None, error: None };

        let parsed = std::fs::read_to_string(&entry.path)
            .map_err(|e| e.to_string())
            .and_then(|content| serde_yaml::from_str::<serde_yaml::Value>(&content).map_err(|e| e.to_string()));

        match parsed {
            Ok(value) => {
                entry.name = value.get("name").and_then(serde_yaml::Value::as_str).map(str::to_string);
                entry.description = value.get("description").and_then(yaml_text);
                entry.iterations = value
                    .get("training")
                    .and_then(|t| t.get("iterations"))
                    .and_then(serde_yaml::Value::as_u64);
            }
            Err(e) => entry.error = Some(e),
        }
        entry
    }
}

/// List `*.yaml` job files in `dir`, sorted by file name.
///
/// Returns `None` when the directory does not exist.
pub fn list_jobs(dir: &Path) -> Option<Vec<JobEntry>> {
    if !dir.is_dir() {
        return None;
    }
    let pattern = format!("{}/*.yaml", Pattern::escape(&dir.to_string_lossy()));
    let mut paths: Vec<PathBuf> = glob::glob(&pattern)
        .map(|paths| paths.filter_map(Result::ok).filter(|p| p.is_file()).collect())
        .unwrap_or_default();
    paths.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Some(paths.into_iter().map(JobEntry::read).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_missing_directory() {
        let temp = TempDir::new().unwrap();
        assert!(list_jobs(&temp.path().join("config")).is_none());
    }

    #[test]
    fn test_lists_yaml_sorted_with_summary_fields() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path();
        fs::write(
            dir.join("quick.yaml"),
            "name: quick\ndescription: fast preview\ntraining:\n  iterations: 7000\n",
        )
        .unwrap();
        fs::write(dir.join("full.yaml"), "name: full\ndescription: 2024\ntraining: {}\n").unwrap();
        fs::write(dir.join("notes.txt"), "not a job").unwrap();

        let jobs = list_jobs(dir).unwrap();
        let names: Vec<&str> = jobs.iter().map(|j| j.file_name.as_str()).collect();
        assert_eq!(names, vec!["full.yaml", "quick.yaml"]);

        assert_eq!(jobs[0].name.as_deref(), Some("full"));
        assert_eq!(jobs[0].iterations, None);
        assert_eq!(jobs[0].description.as_deref(), Some("2024"));
        assert_eq!(jobs[1].description.as_deref(), Some("fast preview"));
        assert_eq!(jobs[1].iterations, Some(7000));
    }

    #[test]
    fn test_broken_file_still_listed() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("bad.yaml"), "name: [unclosed\n").unwrap();
        fs::write(temp.path().join("empty.yaml"), "").unwrap();

        let jobs = list_jobs(temp.path()).unwrap();
        assert_eq!(jobs.len(), 2);
        assert!(jobs[0].error.is_some());
        assert!(jobs[1].error.is_none());
        assert!(jobs[1].name.is_none());
    }
}
