use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;

use nexus_dupes::chunk::{ChunkKind, ChunkMetadata, ChunkRecord};
use nexus_dupes::index::store::{write_index, VectorIndex};
use nexus_dupes::index::DEFAULT_INDEX_DIR;

const BUTTON: &str = r#"export function PrimaryButton({ label, onClick }) {
  return (
    <button className="btn primary" onClick={onClick}>
      {label}
    </button>
  );
}
"#;

fn nexus(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("nexus-dupes").unwrap();
    cmd.current_dir(dir)
        .arg("--config")
        .arg(dir.join("missing-config.toml"));
    cmd
}

fn record(id: &str, file: &str, name: &str, start: usize, end: usize) -> ChunkRecord {
    ChunkRecord {
        id: id.to_string(),
        file_path: file.to_string(),
        start_line: start,
        end_line: end,
        start_column: 1,
        end_column: 2,
        kind: ChunkKind::Component,
        name: Some(name.to_string()),
        metadata: ChunkMetadata::default(),
        parent_id: None,
        section_index: None,
        section_label: None,
    }
}

fn write_project(dir: &Path) {
    fs::create_dir_all(dir.join("src")).unwrap();
    fs::write(dir.join("src/Button.jsx"), BUTTON).unwrap();

    let records = vec![
        record("button", "src/Button.jsx", "PrimaryButton", 1, 7),
        record("action", "src/ActionButton.jsx", "ActionButton", 3, 9),
    ];
    let rows = vec![
        ("button".to_string(), vec![0.6, 0.8, 0.0]),
        ("action".to_string(), vec![0.6, 0.8, 0.0]),
    ];
    let index = VectorIndex::build(records, rows).unwrap();
    write_index(&dir.join(DEFAULT_INDEX_DIR), &index, "test-model").unwrap();
}

#[test]
fn check_without_index_succeeds() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("Button.jsx"), BUTTON).unwrap();

    nexus(dir.path())
        .args(["check", "Button.jsx"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No duplicate index found"));
}

#[test]
fn check_reports_duplicate() {
    let dir = tempfile::tempdir().unwrap();
    write_project(dir.path());

    nexus(dir.path())
        .args(["check", "src/Button.jsx"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Component \"PrimaryButton\" is 100% similar to \"ActionButton\" (src/ActionButton.jsx:3)",
        ));
}

#[test]
fn check_json_output() {
    let dir = tempfile::tempdir().unwrap();
    write_project(dir.path());

    nexus(dir.path())
        .args(["check", "--json", "src/Button.jsx"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"matchedLocation\": \"src/ActionButton.jsx:3\""))
        .stdout(predicate::str::contains("\"kind\": \"component\""));
}

#[test]
fn query_lists_neighbours() {
    let dir = tempfile::tempdir().unwrap();
    write_project(dir.path());

    nexus(dir.path())
        .args(["query", "button"])
        .assert()
        .success()
        .stdout(predicate::str::contains("src/ActionButton.jsx:3"));
}

#[test]
fn stats_reads_manifest() {
    let dir = tempfile::tempdir().unwrap();
    write_project(dir.path());

    nexus(dir.path())
        .arg("stats")
        .assert()
        .success()
        .stdout(predicate::str::contains("test-model"));
}

#[test]
fn chunks_lists_components() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("Button.jsx"), BUTTON).unwrap();

    nexus(dir.path())
        .args(["chunks", "Button.jsx"])
        .assert()
        .success()
        .stdout(predicate::str::contains("PrimaryButton"))
        .stdout(predicate::str::contains("component"));
}

#[test]
fn config_show_prints_defaults() {
    let dir = tempfile::tempdir().unwrap();

    nexus(dir.path())
        .args(["config", "--show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("threshold = 0.85"))
        .stdout(predicate::str::contains("provider = \"ollama\""));
}
