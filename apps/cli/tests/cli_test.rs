//! Integration tests for the `splat` binary.
//!
//! The training scripts are replaced by small shell scripts run through a `sh`
//! launcher configured in `.splatrc`.

#![cfg(unix)]

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const TRAIN_SCRIPT: &str = r#"
model=""; iters=""
while [ $# -gt 0 ]; do
  case "$1" in
    --model_path) model="$2"; shift 2 ;;
    --iterations) iters="$2"; shift 2 ;;
    *) shift ;;
  esac
done
mkdir -p "$model/point_cloud/iteration_$iters"
touch "$model/chkpnt$iters.pth"
echo "trained to $iters"
"#;

const RENDER_SCRIPT: &str = r#"
model=""
while [ $# -gt 0 ]; do
  case "$1" in
    --model_path) model="$2"; shift 2 ;;
    *) shift ;;
  esac
done
mkdir -p "$model/test"
touch "$model/test/00000.png"
"#;

const METRICS_SCRIPT: &str = r#"
model=""
while [ $# -gt 0 ]; do
  case "$1" in
    --model_paths) model="$2"; shift 2 ;;
    *) shift ;;
  esac
done
echo '{"PSNR": 27.5}' > "$model/results.json"
echo "PSNR: 27.5"
"#;

/// Lay out a project: jobs in `config/`, scripts in `gaussian-splatting/`, data in `data/`.
fn setup_project(temp: &TempDir, train_script: &str) {
    let root = temp.path();
    let toolchain = root.join("gaussian-splatting");
    fs::create_dir_all(&toolchain).unwrap();
    fs::write(toolchain.join("train.py"), train_script).unwrap();
    fs::write(toolchain.join("render.py"), RENDER_SCRIPT).unwrap();
    fs::write(toolchain.join("metrics.py"), METRICS_SCRIPT).unwrap();

    fs::create_dir_all(root.join("data/garden")).unwrap();
    fs::create_dir_all(root.join("config")).unwrap();
    fs::write(
        root.join("config/garden.yaml"),
        "name: garden\ndescription: garden scene preview\npaths:\n  source_path: data/garden\n  model_path: output/garden\ntraining:\n  iterations: 3000\n  test_iterations: [1000, 3000]\n  save_iterations: [1000, 3000]\n",
    )
    .unwrap();
    fs::write(root.join(".splatrc"), "launcher = [\"sh\"]\n").unwrap();
}

fn splat(temp: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("splat").unwrap();
    cmd.current_dir(temp.path())
        .env("HOME", temp.path())
        .env_remove("SPLAT_JOBS_DIR")
        .env_remove("SPLAT_TOOLCHAIN_DIR");
    cmd
}

fn exists(root: &Path, rel: &str) -> bool {
    root.join(rel).exists()
}

#[test]
fn test_no_command_shows_help() {
    let temp = TempDir::new().unwrap();
    splat(&temp).assert().success().stdout(predicate::str::contains("Usage"));
}

#[test]
fn test_list_jobs() {
    let temp = TempDir::new().unwrap();
    setup_project(&temp, TRAIN_SCRIPT);

    splat(&temp)
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("garden.yaml"))
        .stdout(predicate::str::contains("garden scene preview"));
}

#[test]
fn test_list_jobs_json() {
    let temp = TempDir::new().unwrap();
    setup_project(&temp, TRAIN_SCRIPT);

    let output = splat(&temp).args(["list", "--json"]).output().unwrap();
    assert!(output.status.success());
    let jobs: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(jobs[0]["name"], "garden");
    assert_eq!(jobs[0]["iterations"], 3000);
}

#[test]
fn test_list_missing_directory() {
    let temp = TempDir::new().unwrap();
    splat(&temp).arg("list").assert().success().stdout(predicate::str::contains("not found"));
}

#[test]
fn test_run_missing_job_file() {
    let temp = TempDir::new().unwrap();
    setup_project(&temp, TRAIN_SCRIPT);

    splat(&temp)
        .args(["run", "nope.yaml"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("job file does not exist"));
}

#[test]
fn test_run_missing_required_field() {
    let temp = TempDir::new().unwrap();
    setup_project(&temp, TRAIN_SCRIPT);
    fs::write(temp.path().join("config/broken.yaml"), "name: broken\ntraining: {}\n").unwrap();

    splat(&temp)
        .args(["run", "broken.yaml"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("paths"));
}

#[test]
fn test_run_missing_source_data() {
    let temp = TempDir::new().unwrap();
    setup_project(&temp, TRAIN_SCRIPT);
    fs::remove_dir_all(temp.path().join("data/garden")).unwrap();

    splat(&temp)
        .args(["run", "garden.yaml"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("source data path does not exist"));
    assert!(!exists(temp.path(), "output/garden/chkpnt1000.pth"));
}

#[test]
fn test_run_completes_job() {
    let temp = TempDir::new().unwrap();
    setup_project(&temp, TRAIN_SCRIPT);

    splat(&temp)
        .args(["run", "garden.yaml"])
        .assert()
        .success()
        .stdout(predicate::str::contains("pipeline completed"))
        .stdout(predicate::str::contains("trained to 1000"))
        .stdout(predicate::str::contains("trained to 3000"));

    let root = temp.path();
    assert!(exists(root, "output/garden/chkpnt1000.pth"));
    assert!(exists(root, "output/garden/point_cloud/iteration_3000"));
    assert!(exists(root, "output/garden/results.json"));
    assert!(exists(root, "output/garden/test/00000.png"));
}

#[test]
fn test_run_resumes_completed_job_without_training() {
    let temp = TempDir::new().unwrap();
    setup_project(&temp, TRAIN_SCRIPT);
    fs::create_dir_all(temp.path().join("output/garden/point_cloud/iteration_3000")).unwrap();
    let job = temp.path().join("config/garden.yaml");
    let mut content = fs::read_to_string(&job).unwrap();
    content.push_str("  resume_training: true\n");
    fs::write(&job, content).unwrap();

    splat(&temp)
        .args(["run", "garden.yaml"])
        .assert()
        .success()
        .stdout(predicate::str::contains("trained to").not());
    assert!(exists(temp.path(), "output/garden/results.json"));
}

#[test]
fn test_run_training_failure_exits_nonzero() {
    let temp = TempDir::new().unwrap();
    setup_project(&temp, "echo 'CUDA out of memory' >&2\nexit 3\n");

    splat(&temp)
        .args(["run", "garden.yaml"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("train stage failed (exit code 3)"));
    assert!(!exists(temp.path(), "output/garden/results.json"));
}

#[test]
fn test_run_interrupted_exits_130() {
    let temp = TempDir::new().unwrap();
    setup_project(&temp, "kill -INT $PPID\nexec sleep 5\n");

    splat(&temp)
        .args(["run", "garden.yaml"])
        .timeout(std::time::Duration::from_secs(30))
        .assert()
        .code(130)
        .stderr(predicate::str::contains("interrupted by operator"));
    assert!(!exists(temp.path(), "output/garden/results.json"));
}

#[test]
fn test_run_with_toolchain_override() {
    let temp = TempDir::new().unwrap();
    setup_project(&temp, TRAIN_SCRIPT);
    fs::rename(temp.path().join("gaussian-splatting"), temp.path().join("gs-fork")).unwrap();

    splat(&temp).args(["run", "garden.yaml"]).assert().code(1);
    splat(&temp).args(["run", "garden.yaml", "--toolchain-dir", "gs-fork"]).assert().success();
}
