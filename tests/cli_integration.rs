// CLI integration tests for the table command flows.
use std::path::Path;
use std::process::{Command, Output};

use serde_json::{Value, json};

fn cmd(store: &Path) -> Command {
    let exe = env!("CARGO_BIN_EXE_kvtable");
    let mut command = Command::new(exe);
    command.arg("--store").arg(store).env_remove("RUST_LOG");
    command
}

fn run(store: &Path, args: &[&str]) -> Output {
    cmd(store).args(args).output().expect("spawn kvtable")
}

fn stdout_json(output: &Output) -> Value {
    serde_json::from_slice(&output.stdout).expect("valid json on stdout")
}

fn stderr_json(output: &Output) -> Value {
    let text = String::from_utf8_lossy(&output.stderr);
    let line = text.lines().last().expect("stderr line");
    serde_json::from_str(line).expect("valid json on stderr")
}

fn write_user_schema(dir: &Path) -> String {
    let path = dir.join("users.schema.json");
    std::fs::write(
        &path,
        r#"[{"name":"firstName","type":"str"},
            {"name":"loginCount","type":"int","default":0},
            {"name":"createdAt","type":"timestamp"}]"#,
    )
    .expect("write schema");
    path.to_str().expect("utf8 path").to_string()
}

#[test]
fn insert_get_filter_flow() {
    let temp = tempfile::tempdir().expect("tempdir");
    let store = temp.path().join("store.json");
    let schema = write_user_schema(temp.path());

    let rows = [
        ("1", r#"{"firstName":"John","loginCount":5,"createdAt":12345}"#),
        ("2", r#"{"firstName":"Jane","loginCount":2,"createdAt":13367}"#),
        ("3", r#"{"firstName":"Joe","loginCount":10,"createdAt":12399}"#),
        ("4", r#"{"firstName":"John","loginCount":11,"createdAt":12468}"#),
    ];
    for (id, data) in rows {
        let insert = run(&store, &["--schema", &schema, "insert", "users", id, data]);
        assert!(insert.status.success(), "insert {id} failed");
    }

    let get = run(&store, &["get", "users", "2"]);
    assert!(get.status.success());
    assert_eq!(
        stdout_json(&get),
        json!({"id": 2, "firstName": "Jane", "loginCount": 2, "createdAt": 13367})
    );

    let filter = run(&store, &["filter", "users", r#"{"loginCount":{">=":4}}"#]);
    assert!(filter.status.success());
    let ids = stdout_json(&filter)["rows"]
        .as_array()
        .expect("rows")
        .iter()
        .map(|row| row["id"].clone())
        .collect::<Vec<_>>();
    assert_eq!(ids, vec![json!(1), json!(3), json!(4)]);

    let count = run(&store, &["count", "users"]);
    assert_eq!(stdout_json(&count)["count"], json!(4));
}

#[test]
fn errors_map_to_exit_codes_and_json() {
    let temp = tempfile::tempdir().expect("tempdir");
    let store = temp.path().join("store.json");
    let schema = write_user_schema(temp.path());

    let missing = run(&store, &["get", "users", "nobody"]);
    assert_eq!(missing.status.code(), Some(3));
    assert_eq!(stderr_json(&missing)["error"]["kind"], json!("NotFound"));

    let invalid = run(
        &store,
        &["--schema", &schema, "insert", "users", "1", r#"{"loginCount":"x"}"#],
    );
    assert_eq!(invalid.status.code(), Some(5));
    let err = stderr_json(&invalid);
    assert_eq!(err["error"]["kind"], json!("Validation"));
    let fields = err["error"]["issues"]
        .as_array()
        .expect("issues")
        .iter()
        .map(|issue| issue["field"].as_str().unwrap_or_default().to_string())
        .collect::<Vec<_>>();
    assert_eq!(fields, vec!["firstName", "loginCount", "createdAt"]);

    let ok = run(
        &store,
        &["--schema", &schema, "insert", "users", "1", r#"{"firstName":"A","createdAt":1}"#],
    );
    assert!(ok.status.success());
    let dup = run(
        &store,
        &["--schema", &schema, "insert", "users", "1", r#"{"firstName":"B","createdAt":2}"#],
    );
    assert_eq!(dup.status.code(), Some(4));

    let bad_lookup = run(&store, &["filter", "users", r#"{"firstName":{"~=":"A"}}"#]);
    assert_eq!(bad_lookup.status.code(), Some(6));
    assert_eq!(stderr_json(&bad_lookup)["error"]["kind"], json!("InvalidLookup"));

    let bad_json = run(&store, &["insert", "users", "2", "not-json"]);
    assert_eq!(bad_json.status.code(), Some(2));
}

#[test]
fn update_delete_drop_flow() {
    let temp = tempfile::tempdir().expect("tempdir");
    let store = temp.path().join("store.json");

    let update = run(&store, &["update", "notes", "\"n1\"", r#"{"body":"hi"}"#]);
    assert!(update.status.success());
    assert_eq!(stdout_json(&update), json!({"id": "n1", "body": "hi"}));

    let exists = run(&store, &["exists", "notes", "n1"]);
    assert_eq!(stdout_json(&exists)["exists"], json!(true));

    let delete_missing = run(&store, &["delete", "notes", "ghost"]);
    assert!(delete_missing.status.success());

    let all = run(&store, &["all", "notes"]);
    assert_eq!(stdout_json(&all)["rows"].as_array().map(Vec::len), Some(1));

    let dropped = run(&store, &["drop", "notes"]);
    assert!(dropped.status.success());
    assert_eq!(stdout_json(&dropped)["removed"], json!(1));

    let count = run(&store, &["count", "notes"]);
    assert_eq!(stdout_json(&count)["count"], json!(0));
}
