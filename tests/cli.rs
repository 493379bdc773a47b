// CLI integration tests for the table, map, diff and dupes commands.
use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;

fn cmd() -> Command {
    Command::cargo_bin("recordkit").expect("binary")
}

fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, content).expect("write fixture");
    path
}

fn json_stdout(output: &[u8]) -> Value {
    serde_json::from_slice(output).expect("valid json")
}

#[test]
fn table_prints_typed_columns() {
    let temp = tempfile::tempdir().expect("tempdir");
    let file = write(temp.path(), "people.csv", "id,name,age\n1,ana,30\n2,bo,\n");

    let output = cmd()
        .args(["table", file.to_str().unwrap(), "--format", "json"])
        .output()
        .expect("run");

    assert!(output.status.success());
    let json = json_stdout(&output.stdout);
    assert_eq!(json["name"], "people");
    assert_eq!(json["columns"][2]["type"], "Int");
    assert_eq!(json["columns"][2]["nullable"], true);
    assert_eq!(json["rows"][1]["age"], Value::Null);
}

#[test]
fn table_terminal_output_uses_name_override() {
    let temp = tempfile::tempdir().expect("tempdir");
    let file = write(temp.path(), "robots.json", r#"[{"Name": "R2", "Legs": 3}]"#);

    cmd()
        .args(["table", file.to_str().unwrap(), "--name", "Fleet"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Fleet (1 rows)"))
        .stdout(predicate::str::contains("R2"));
}

#[test]
fn map_reshapes_records() {
    let temp = tempfile::tempdir().expect("tempdir");
    let file = write(
        temp.path(),
        "robots.json",
        r#"[{"Name": "Robot13", "Legs": 2, "Battery": 12}]"#,
    );

    let output = cmd()
        .args([
            "map",
            file.to_str().unwrap(),
            "--shape",
            "name:text,FlyCount:int,Battery:float,Note:text?",
            "--ignore-case",
            "--format",
            "json",
        ])
        .output()
        .expect("run");

    assert!(output.status.success());
    let json = json_stdout(&output.stdout);
    let row = &json["rows"][0];
    assert_eq!(row["name"], "Robot13");
    assert_eq!(row["FlyCount"], 0);
    assert_eq!(row["Battery"], 12.0);
    assert_eq!(row["Note"], Value::Null);
}

#[test]
fn map_rejects_unknown_types() {
    let temp = tempfile::tempdir().expect("tempdir");
    let file = write(temp.path(), "a.json", r#"[{"x": 1}]"#);

    cmd()
        .args(["map", file.to_str().unwrap(), "--shape", "x:blob"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Unknown field type"));
}

#[test]
fn diff_exits_one_when_rows_need_inserting() {
    let temp = tempfile::tempdir().expect("tempdir");
    let inner = write(temp.path(), "inner.csv", "id,name\n1,a\n2,b\n3,c\n");
    let outer = write(temp.path(), "outer.csv", "id,name\n2,b\n3,C\n4,d\n5,e\n");

    let output = cmd()
        .args([
            "diff",
            inner.to_str().unwrap(),
            outer.to_str().unwrap(),
            "--key",
            "id",
            "--format",
            "json",
        ])
        .output()
        .expect("run");

    assert_eq!(output.status.code(), Some(1));
    let json = json_stdout(&output.stdout);
    let inserted: Vec<_> = json["inserts"]
        .as_array()
        .expect("inserts")
        .iter()
        .map(|r| r["id"].as_i64().unwrap())
        .collect();
    assert_eq!(inserted, vec![4, 5]);
    assert_eq!(json["updates"][1]["changed_columns"][0], "name");
}

#[test]
fn diff_exits_zero_without_inserts() {
    let temp = tempfile::tempdir().expect("tempdir");
    let inner = write(temp.path(), "inner.json", r#"[{"id": 1}, {"id": 2}]"#);
    let outer = write(temp.path(), "outer.json", r#"[{"id": 2}, {"id": 2}]"#);

    cmd()
        .args(["diff", inner.to_str().unwrap(), outer.to_str().unwrap(), "--distinct"])
        .assert()
        .success()
        .stdout(predicate::str::contains("0 to insert, 1 to update"));
}

#[test]
fn diff_reports_unknown_key_column() {
    let temp = tempfile::tempdir().expect("tempdir");
    let inner = write(temp.path(), "inner.csv", "id\n1\n");
    let outer = write(temp.path(), "outer.csv", "id\n1\n");

    cmd()
        .args([
            "diff",
            inner.to_str().unwrap(),
            outer.to_str().unwrap(),
            "--key",
            "code",
        ])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Invalid key"));
}

#[test]
fn diff_against_header_only_inner_inserts_everything() {
    let temp = tempfile::tempdir().expect("tempdir");
    let inner = write(temp.path(), "inner.csv", "id,name\n");
    let outer = write(temp.path(), "outer.csv", "id,name\n1,a\n2,b\n");

    for key in [&["--key", "id"][..], &[][..]] {
        let output = cmd()
            .args(["diff", inner.to_str().unwrap(), outer.to_str().unwrap()])
            .args(key)
            .args(["--format", "json"])
            .output()
            .expect("run");

        assert_eq!(output.status.code(), Some(1), "key args {:?}", key);
        let json = json_stdout(&output.stdout);
        assert_eq!(json["stats"]["inserts"], 2);
        assert_eq!(json["stats"]["updates"], 0);
    }
}

#[test]
fn diff_matches_int_keys_against_float_keys() {
    let temp = tempfile::tempdir().expect("tempdir");
    let inner = write(temp.path(), "inner.csv", "id,name\n1,a\n2,b\n");
    let outer = write(temp.path(), "outer.csv", "id,name\n1,a\n2.5,b\n");

    let output = cmd()
        .args([
            "diff",
            inner.to_str().unwrap(),
            outer.to_str().unwrap(),
            "--key",
            "id",
            "--format",
            "json",
        ])
        .output()
        .expect("run");

    assert_eq!(output.status.code(), Some(1));
    let json = json_stdout(&output.stdout);
    assert_eq!(json["stats"]["inserts"], 1);
    assert_eq!(json["stats"]["updates"], 1);
    assert_eq!(json["inserts"][0]["id"], 2.5);
}

#[test]
fn dupes_compares_composite_keys_by_cell() {
    let temp = tempfile::tempdir().expect("tempdir");
    let file = write(temp.path(), "pairs.csv", "a,b\nx|y,z\nx,y|z\n");

    let output = cmd()
        .args(["dupes", file.to_str().unwrap(), "--key", "a,b", "--format", "json"])
        .output()
        .expect("run");

    assert!(output.status.success());
    assert_eq!(json_stdout(&output.stdout), serde_json::json!([]));
}

#[test]
fn dupes_lists_repeated_keys() {
    let temp = tempfile::tempdir().expect("tempdir");
    let file = write(
        temp.path(),
        "words.csv",
        "word\na\na\nc\nb\na\nb\n",
    );

    let output = cmd()
        .args(["dupes", file.to_str().unwrap(), "--key", "word", "--format", "json"])
        .output()
        .expect("run");

    assert!(output.status.success());
    let json = json_stdout(&output.stdout);
    assert_eq!(
        json,
        serde_json::json!([
            {"key": "a", "rows": [1, 2, 5]},
            {"key": "b", "rows": [4, 6]}
        ])
    );
}

#[test]
fn missing_file_is_an_error() {
    cmd()
        .args(["table", "does-not-exist.csv"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Failed to parse file"));
}
