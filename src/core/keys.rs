//! Purpose: Row identifiers and the store key names derived from a table name.
//! Exports: `RowId`, `index_key`, `detail_key`, `check_table_name`.
//! Role: Single place that knows the persisted key layout.
//! Invariants: Index lives at `<table>_list`; rows live at `<table>_detail_<id>`.
//! Invariants: A string id renders without quotes; any other id renders as compact JSON.
//! Invariants: Two ids name the same row exactly when their rendered forms match.
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::error::{Error, ErrorKind};

/// Caller-chosen row identifier. Any JSON value is accepted; strings and
/// integers are the common cases.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RowId(Value);

impl RowId {
    pub fn new(value: impl Into<Value>) -> Self {
        Self(value.into())
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn into_value(self) -> Value {
        self.0
    }

    /// True when both ids address the same detail entry, e.g. `1` and `"1"`.
    pub fn same_key(&self, other: &RowId) -> bool {
        match (&self.0, &other.0) {
            (Value::String(a), Value::String(b)) => a == b,
            _ => self.to_string() == other.to_string(),
        }
    }
}

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            Value::String(text) => f.write_str(text),
            other => write!(f, "{other}"),
        }
    }
}

impl From<Value> for RowId {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

impl From<&str> for RowId {
    fn from(value: &str) -> Self {
        Self(Value::from(value))
    }
}

impl From<String> for RowId {
    fn from(value: String) -> Self {
        Self(Value::from(value))
    }
}

impl From<i64> for RowId {
    fn from(value: i64) -> Self {
        Self(Value::from(value))
    }
}

impl From<i32> for RowId {
    fn from(value: i32) -> Self {
        Self(Value::from(value))
    }
}

impl From<u64> for RowId {
    fn from(value: u64) -> Self {
        Self(Value::from(value))
    }
}

pub fn check_table_name(name: &str) -> Result<(), Error> {
    if name.is_empty() {
        return Err(Error::new(ErrorKind::Usage)
            .with_message("table name must not be empty")
            .with_hint("Pick a short name such as `users`; it prefixes every stored key."));
    }
    Ok(())
}

pub fn index_key(table: &str) -> String {
    format!("{table}_list")
}

pub fn detail_key(table: &str, id: &RowId) -> String {
    format!("{table}_detail_{id}")
}
