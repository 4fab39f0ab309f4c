//! Purpose: Verify tables persist through `FileStore` across process-like reopen cycles.
//! Exports: Integration tests only.
//! Role: Cover the on-disk layout that the CLI relies on.
//! Invariants: The store file is a flat JSON object of string values.

use kvtable::api::{FieldSpec, FieldType, FileStore, RowId, Schema, Table};
use serde_json::{Map, Value, json};

fn object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => panic!("expected object, got {other}"),
    }
}

fn schema() -> Schema {
    Schema::new(vec![
        FieldSpec::new("title", FieldType::Str),
        FieldSpec::new("done", FieldType::Bool).with_default(false),
    ])
    .expect("schema")
}

#[test]
fn rows_survive_reopen() {
    let temp = tempfile::tempdir().expect("tempdir");
    let path = temp.path().join("todo.json");

    {
        let store = FileStore::open(&path).expect("open");
        let mut table = Table::new(store, "todo", schema()).expect("table");
        table.insert("a", &object(json!({"title": "write"}))).unwrap();
        table.insert("b", &object(json!({"title": "test", "done": true}))).unwrap();
        table.update("a", &object(json!({"done": true}))).unwrap();
        table.delete("b").unwrap();
    }

    let store = FileStore::open(&path).expect("reopen");
    let mut table = Table::new(store, "todo", schema()).expect("table");
    assert_eq!(table.ids().unwrap(), vec![RowId::from("a")]);
    assert_eq!(
        table.get("a").unwrap().to_value(),
        json!({"id": "a", "title": "write", "done": true})
    );
}

#[test]
fn on_disk_layout_is_flat_json() {
    let temp = tempfile::tempdir().expect("tempdir");
    let path = temp.path().join("store.json");

    let store = FileStore::open(&path).expect("open");
    let mut table = Table::new(store, "todo", schema()).expect("table");
    table.insert(1, &object(json!({"title": "x"}))).unwrap();
    drop(table);

    let raw: Value =
        serde_json::from_str(&std::fs::read_to_string(&path).expect("read")).expect("json");
    assert_eq!(raw["todo_list"], json!("[1]"));
    let detail: Value = serde_json::from_str(raw["todo_detail_1"].as_str().unwrap()).unwrap();
    assert_eq!(detail, json!({"title": "x", "done": false}));
}

#[test]
fn drop_leaves_no_table_keys_on_disk() {
    let temp = tempfile::tempdir().expect("tempdir");
    let path = temp.path().join("store.json");

    let store = FileStore::open(&path).expect("open");
    let mut table = Table::new(store, "todo", schema()).expect("table");
    table.insert(1, &object(json!({"title": "x"}))).unwrap();
    table.insert(2, &object(json!({"title": "y"}))).unwrap();
    table.drop().unwrap();
    let store = table.into_store();
    assert!(store.is_empty());

    let reopened = FileStore::open(&path).expect("reopen");
    assert!(reopened.is_empty());
}
