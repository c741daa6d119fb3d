//! End-to-end tests for the `meridian` binary.

use assert_cmd::Command;
use predicates::prelude::*;
use std::path::Path;
use tempfile::TempDir;

fn write_config(temp: &TempDir) -> std::path::PathBuf {
    let config_path = temp.path().join("meridian.toml");
    let contents = format!(
        concat!(
            "[data]\n",
            "root = {:?}\n",
            "\n",
            "[model]\n",
            "prediction_length = 2\n",
            "\n",
            "[incremental]\n",
            "model_root = {:?}\n",
            "checkpoint_dir = {:?}\n",
            "\n",
            "[execution]\n",
            "device = \"cpu\"\n",
        ),
        temp.path().join("partitions"),
        temp.path().join("models"),
        temp.path().join("checkpoints"),
    );
    std::fs::write(&config_path, contents).unwrap();
    config_path
}

fn seed_partition(data_root: &Path, year: i32, month: u32) {
    let dir = data_root.join(format!("{year:04}")).join(format!("{month:02}"));
    std::fs::create_dir_all(&dir).unwrap();
    let mut lines = String::new();
    for day in 1..=8 {
        lines.push_str(&format!(
            "{{\"timestamp\": \"{year:04}-{month:02}-{day:02}\", \"value\": {}.0}}\n",
            day * month
        ));
    }
    std::fs::write(dir.join("part-0000.jsonl"), lines).unwrap();
}

#[test]
fn help_describes_the_tool() {
    Command::cargo_bin("meridian")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Resumable checkpointed training"));
}

#[test]
fn status_on_empty_directory_reports_not_started() {
    let temp = TempDir::new().unwrap();
    let config = write_config(&temp);
    std::fs::create_dir_all(temp.path().join("partitions")).unwrap();

    Command::cargo_bin("meridian")
        .unwrap()
        .args(["--config", config.to_str().unwrap(), "status"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Training not started"));
}

#[test]
fn train_incremental_then_status_and_rerun() {
    let temp = TempDir::new().unwrap();
    let config = write_config(&temp);
    let data_root = temp.path().join("partitions");
    seed_partition(&data_root, 2020, 1);
    seed_partition(&data_root, 2020, 2);

    Command::cargo_bin("meridian")
        .unwrap()
        .args([
            "--config",
            config.to_str().unwrap(),
            "train-incremental",
            "--start-date",
            "2020-01-01",
            "--end-date",
            "2020-02-28",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("2 processed of 2 discovered"));

    Command::cargo_bin("meridian")
        .unwrap()
        .args(["--config", config.to_str().unwrap(), "status", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("in_progress"))
        .stdout(predicate::str::contains("2020"));

    // A second invocation over the same range is a no-op resume.
    Command::cargo_bin("meridian")
        .unwrap()
        .args([
            "--config",
            config.to_str().unwrap(),
            "train-incremental",
            "--start-date",
            "2020-01-01",
            "--end-date",
            "2020-02-28",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("all partitions already processed"));
}

#[test]
fn train_fails_without_data_root() {
    let temp = TempDir::new().unwrap();

    Command::cargo_bin("meridian")
        .unwrap()
        .current_dir(temp.path())
        .args(["train", "--start-date", "2020-01-01", "--end-date", "2020-01-31"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("data root"));
}

#[test]
fn rejects_malformed_dates() {
    let temp = TempDir::new().unwrap();
    let config = write_config(&temp);
    std::fs::create_dir_all(temp.path().join("partitions")).unwrap();

    Command::cargo_bin("meridian")
        .unwrap()
        .args([
            "--config",
            config.to_str().unwrap(),
            "train",
            "--start-date",
            "01/01/2020",
            "--end-date",
            "2020-01-31",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--start-date"));
}

#[test]
fn versions_list_is_empty_before_any_commit() {
    let temp = TempDir::new().unwrap();
    let config = write_config(&temp);

    Command::cargo_bin("meridian")
        .unwrap()
        .args(["--config", config.to_str().unwrap(), "versions", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No versions tracked"));
}
