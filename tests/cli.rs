// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipecheck contributors

//! CLI integration tests for the pipecheck binary

#![allow(clippy::unwrap_used)]
#![allow(deprecated)]

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

const VALID: &str = r#"
version: 4
actions:
  generate_dataset:
    run: ehrql:v1 generate-dataset analysis/dataset.py --output output/dataset.arrow
    outputs:
      highly_sensitive:
        dataset: output/dataset.arrow
  summarise:
    run: python:latest analysis/summarise.py
    needs: [generate_dataset]
    outputs:
      moderately_sensitive:
        table: output/summary.csv
"#;

const DUPLICATE_OUTPUT: &str = r#"
version: 4
actions:
  a:
    run: python:v2 a.py
    outputs:
      moderately_sensitive:
        table: output/table.csv
  b:
    run: python:v2 b.py
    outputs:
      moderately_sensitive:
        table: output/table.csv
"#;

fn project_dir(files: &[(&str, &str)]) -> TempDir {
    let temp = TempDir::new().unwrap();
    for (name, contents) in files {
        fs::write(temp.path().join(name), contents).unwrap();
    }
    temp
}

fn pipecheck(temp: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("pipecheck").unwrap();
    cmd.current_dir(temp.path())
        .env_remove("PIPECHECK_PROJECT")
        .env("NO_COLOR", "1");
    cmd
}

#[test]
fn test_help() {
    Command::cargo_bin("pipecheck")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Validate research pipeline project files"));
}

#[test]
fn test_validate_default_file() {
    let temp = project_dir(&[("project.yaml", VALID)]);

    pipecheck(&temp)
        .arg("validate")
        .assert()
        .success()
        .stdout(predicate::str::contains("project.yaml"))
        .stdout(predicate::str::contains("2 actions"));
}

#[test]
fn test_validate_from_env() {
    let temp = project_dir(&[("other.yaml", VALID)]);

    pipecheck(&temp)
        .env("PIPECHECK_PROJECT", "other.yaml")
        .arg("validate")
        .assert()
        .success()
        .stdout(predicate::str::contains("other.yaml"));
}

#[test]
fn test_validate_json() {
    let temp = project_dir(&[("project.yaml", VALID)]);

    pipecheck(&temp)
        .args(["validate", "--format", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"generate_dataset\""))
        .stdout(predicate::str::contains("\"highly_sensitive\""));
}

#[test]
fn test_validate_reports_invalid_project() {
    let temp = project_dir(&[("project.yaml", DUPLICATE_OUTPUT)]);

    pipecheck(&temp)
        .arg("validate")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid project"))
        .stderr(predicate::str::contains("is not unique"));
}

#[test]
fn test_validate_several_files_counts_failures() {
    let temp = project_dir(&[("good.yaml", VALID), ("bad.yaml", DUPLICATE_OUTPUT)]);

    pipecheck(&temp)
        .args(["validate", "good.yaml", "bad.yaml"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("good.yaml"))
        .stderr(predicate::str::contains("1 of 2 project files are invalid"));
}

#[test]
fn test_validate_missing_file() {
    let temp = project_dir(&[]);

    pipecheck(&temp)
        .arg("validate")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read project file"));
}

#[test]
fn test_validate_syntax_error() {
    let temp = project_dir(&[("project.yaml", "version: 4\nactions: [\n")]);

    pipecheck(&temp)
        .arg("validate")
        .assert()
        .failure()
        .stderr(predicate::str::contains("line"));
}

#[test]
fn test_images() {
    let temp = project_dir(&[("project.yaml", VALID)]);

    pipecheck(&temp)
        .arg("images")
        .assert()
        .success()
        .stdout("ehrql:v1\npython:v1\n");
}

#[test]
fn test_graph_text_order() {
    let temp = project_dir(&[("project.yaml", VALID)]);

    pipecheck(&temp)
        .arg("graph")
        .assert()
        .success()
        .stdout(predicate::str::contains("1. generate_dataset"))
        .stdout(predicate::str::contains("2. summarise"));
}

#[test]
fn test_graph_mermaid() {
    let temp = project_dir(&[("project.yaml", VALID)]);

    pipecheck(&temp)
        .args(["graph", "--format", "mermaid"])
        .assert()
        .success()
        .stdout(predicate::str::contains("generate_dataset --> summarise"));
}

#[test]
fn test_graph_reports_cycle() {
    let cyclic = r#"
version: 4
actions:
  a:
    run: python:v2 a.py
    needs: [b]
    outputs:
      moderately_sensitive:
        t: out/a.csv
  b:
    run: python:v2 b.py
    needs: [a]
    outputs:
      moderately_sensitive:
        t: out/b.csv
"#;
    let temp = project_dir(&[("project.yaml", cyclic)]);

    pipecheck(&temp).arg("validate").assert().success();
    pipecheck(&temp)
        .arg("graph")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Circular dependency"));
}
