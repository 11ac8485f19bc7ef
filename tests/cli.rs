//! Integration tests for the typegraph CLI.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

const MODELS: &str = r#"{
    "module": "app.models",
    "types": {
        "Pair": { "fields": { "a": "int", "b": "list[str]" } },
        "Node": { "fields": { "value": "int", "next": "optional[Node]" } },
        "IntList": { "alias": "list[int]" }
    }
}"#;

fn write_schema(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, contents).unwrap();
    path
}

fn typegraph() -> Command {
    Command::cargo_bin("typegraph").unwrap()
}

#[test]
fn test_order_pair() {
    let temp = TempDir::new().unwrap();
    let schema = write_schema(&temp, "models.json", MODELS);

    let output = typegraph()
        .args(["order", "app.models.Pair", "--schema"])
        .arg(&schema)
        .output()
        .unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    let lines: Vec<&str> = stdout.lines().map(str::trim).collect();
    assert_eq!(
        lines,
        vec![
            "1. int (a)",
            "2. str",
            "3. list[str] (b)",
            "4. app.models.Pair",
        ]
    );
}

#[test]
fn test_order_recursive_json() {
    let temp = TempDir::new().unwrap();
    let schema = write_schema(&temp, "models.json", MODELS);

    let output = typegraph()
        .args(["order", "app.models.Node", "--json", "--schema"])
        .arg(&schema)
        .output()
        .unwrap();
    assert!(output.status.success());

    let nodes: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let nodes = nodes.as_array().unwrap();
    assert_eq!(nodes.len(), 4);
    assert_eq!(nodes[1]["name"], "app.models.Node");
    assert_eq!(nodes[1]["cyclic"], true);
    assert_eq!(nodes[3]["name"], "app.models.Node");
    assert_eq!(nodes[3]["cyclic"], false);
}

#[test]
fn test_order_generic_root() {
    let temp = TempDir::new().unwrap();
    let schema = write_schema(&temp, "models.json", MODELS);

    typegraph()
        .args(["order", "dict[str, app.models.IntList]", "--schema"])
        .arg(&schema)
        .assert()
        .success()
        .stdout(predicate::str::contains("dict[str, list[int]]"));
}

#[test]
fn test_graph_lists_predecessors() {
    let temp = TempDir::new().unwrap();
    let schema = write_schema(&temp, "models.json", MODELS);

    typegraph()
        .args(["graph", "app.models.Pair", "--schema"])
        .arg(&schema)
        .assert()
        .success()
        .stdout(predicate::str::contains("[0] app.models.Pair <- [1], [2]"))
        .stdout(predicate::str::contains("[2] list[str] (b) <- [3]"));
}

#[test]
fn test_types_lists_names() {
    let temp = TempDir::new().unwrap();
    let schema = write_schema(&temp, "models.json", MODELS);

    typegraph()
        .args(["types", "--schema"])
        .arg(&schema)
        .assert()
        .success()
        .stdout(predicate::str::contains("app.models.IntList = list[int]"))
        .stdout(predicate::str::contains("app.models.Node"));
}

#[test]
fn test_unknown_root_fails() {
    let temp = TempDir::new().unwrap();
    let schema = write_schema(&temp, "models.json", MODELS);

    typegraph()
        .args(["order", "app.models.Missing", "--schema"])
        .arg(&schema)
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Error: unknown root type"));
}

#[test]
fn test_bad_schema_fails() {
    let temp = TempDir::new().unwrap();
    let schema = write_schema(&temp, "broken.json", "{ not json");

    typegraph()
        .args(["types", "--schema"])
        .arg(&schema)
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to load schema"));
}

#[test]
fn test_mixed_definition_fails() {
    let temp = TempDir::new().unwrap();
    let schema = write_schema(
        &temp,
        "mixed.json",
        r#"{ "module": "app", "types": { "A": { "fields": { "b": "int" }, "alias": "int" } } }"#,
    );

    typegraph()
        .args(["types", "--schema"])
        .arg(&schema)
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("failed to load schema"))
        .stderr(predicate::str::contains("mixed.json"));
}
