//! Purpose: Declare typed table fields and validate row data against them.
//! Exports: `FieldType`, `FieldSpec`, `Schema`.
//! Role: Gatekeeper run before any row write reaches the store.
//! Invariants: Validation is non-short-circuiting; every field is checked in declaration order.
//! Invariants: Validation never mutates caller data; defaults land in a returned copy.
//! Invariants: Field names are unique, non-empty, and never `id`.
use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::core::error::{Error, ErrorKind, IssueCode, ValidationIssue};
use crate::json::parse;

/// Key under which a row's id is attached when a row is rendered as JSON.
pub const ID_FIELD: &str = "id";

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum FieldType {
    #[default]
    Str,
    Int,
    Float,
    Timestamp,
    Bool,
    Obj,
    /// A type name read from schema text that is not recognised. Kept so the
    /// problem is reported per row rather than rejected up front.
    Unknown(String),
}

impl FieldType {
    pub fn parse(name: &str) -> Self {
        match name {
            "str" => Self::Str,
            "int" => Self::Int,
            "float" => Self::Float,
            "timestamp" => Self::Timestamp,
            "bool" => Self::Bool,
            "obj" => Self::Obj,
            other => Self::Unknown(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Str => "str",
            Self::Int => "int",
            Self::Float => "float",
            Self::Timestamp => "timestamp",
            Self::Bool => "bool",
            Self::Obj => "obj",
            Self::Unknown(name) => name,
        }
    }

    /// `None` for unknown types; they have no validator.
    fn accepts(&self, value: &Value) -> Option<bool> {
        let ok = match self {
            Self::Str => value.is_string(),
            Self::Int | Self::Timestamp => is_integral(value),
            Self::Float => value.is_number(),
            Self::Bool => value.is_boolean(),
            Self::Obj => true,
            Self::Unknown(_) => return None,
        };
        Some(ok)
    }
}

fn is_integral(value: &Value) -> bool {
    let Value::Number(number) = value else {
        return false;
    };
    if number.is_i64() || number.is_u64() {
        return true;
    }
    number
        .as_f64()
        .is_some_and(|float| float.is_finite() && float.fract() == 0.0)
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for FieldType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for FieldType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Ok(Self::parse(&name))
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    #[serde(rename = "type", default)]
    pub field_type: FieldType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(default = "required_by_default")]
    pub required: bool,
}

fn required_by_default() -> bool {
    true
}

impl FieldSpec {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            default: None,
            required: true,
        }
    }

    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Schema {
    fields: Vec<FieldSpec>,
}

impl Schema {
    pub fn new(fields: Vec<FieldSpec>) -> Result<Self, Error> {
        let mut seen = HashSet::new();
        for field in &fields {
            if field.name.is_empty() {
                return Err(Error::new(ErrorKind::Usage).with_message("field name must not be empty"));
            }
            if field.name == ID_FIELD {
                return Err(Error::new(ErrorKind::Usage)
                    .with_message("field name `id` is reserved")
                    .with_hint("The row id is passed separately to insert/update and attached on read."));
            }
            if !seen.insert(field.name.as_str()) {
                return Err(Error::new(ErrorKind::Usage)
                    .with_message(format!("duplicate field `{}`", field.name)));
            }
        }
        Ok(Self { fields })
    }

    /// Parses the JSON array form: `[{"name": "age", "type": "int", "default": 0}, ...]`.
    pub fn from_json_str(text: &str) -> Result<Self, Error> {
        let fields: Vec<FieldSpec> = parse::from_str(text, "schema").map_err(|err| {
            Error::new(ErrorKind::Usage)
                .with_message(err.message().unwrap_or("invalid schema").to_string())
                .with_hint(
                    "Expected a JSON array like [{\"name\":\"age\",\"type\":\"int\",\"default\":0}].",
                )
                .with_source(err)
        })?;
        Self::new(fields)
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|field| field.name == name)
    }

    /// Returns `data` with declared defaults filled in, or every problem found.
    /// Keys not declared in the schema pass through untouched.
    pub fn validate(&self, data: &Map<String, Value>) -> Result<Map<String, Value>, Vec<ValidationIssue>> {
        let mut row = data.clone();
        let mut issues = Vec::new();

        for field in &self.fields {
            let Some(value) = row.get(&field.name) else {
                if let Some(default) = &field.default {
                    row.insert(field.name.clone(), default.clone());
                } else if field.required {
                    issues.push(ValidationIssue::new(
                        &field.name,
                        IssueCode::MissingField,
                        "missing field",
                    ));
                }
                continue;
            };

            match field.field_type.accepts(value) {
                None => issues.push(ValidationIssue::new(
                    &field.name,
                    IssueCode::InvalidFieldType,
                    format!("invalid field type `{}`", field.field_type),
                )),
                Some(false) => issues.push(ValidationIssue::new(
                    &field.name,
                    IssueCode::InvalidDataType,
                    format!("invalid data type: expected {}, got {}", field.field_type, kind_name(value)),
                )),
                Some(true) => {}
            }
        }

        if issues.is_empty() { Ok(row) } else { Err(issues) }
    }
}

pub(crate) fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::{FieldSpec, FieldType, Schema};
    use crate::core::error::{ErrorKind, IssueCode};
    use serde_json::{Map, Value, json};

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    fn users() -> Schema {
        Schema::new(vec![
            FieldSpec::new("firstName", FieldType::Str),
            FieldSpec::new("loginCount", FieldType::Int).with_default(0),
            FieldSpec::new("createdAt", FieldType::Timestamp),
            FieldSpec::new("nickname", FieldType::Str).optional(),
        ])
        .expect("schema")
    }

    #[test]
    fn defaults_are_applied_to_a_copy() {
        let input = object(json!({"firstName": "Ann", "createdAt": 12345}));
        let row = users().validate(&input).expect("valid");
        assert_eq!(row.get("loginCount"), Some(&json!(0)));
        assert!(!input.contains_key("loginCount"));
        assert!(!row.contains_key("nickname"));
    }

    #[test]
    fn all_issues_are_collected_in_declaration_order() {
        let input = object(json!({"loginCount": "five"}));
        let issues = users().validate(&input).expect_err("invalid");
        let summary = issues
            .iter()
            .map(|issue| (issue.field.as_str(), issue.code))
            .collect::<Vec<_>>();
        assert_eq!(
            summary,
            vec![
                ("firstName", IssueCode::MissingField),
                ("loginCount", IssueCode::InvalidDataType),
                ("createdAt", IssueCode::MissingField),
            ]
        );
    }

    #[test]
    fn integral_types_reject_fractions() {
        let schema = Schema::new(vec![
            FieldSpec::new("n", FieldType::Int),
            FieldSpec::new("at", FieldType::Timestamp),
            FieldSpec::new("f", FieldType::Float),
        ])
        .unwrap();
        assert!(schema.validate(&object(json!({"n": 3.0, "at": 1_700_000_000_000u64, "f": 2}))).is_ok());

        let issues = schema
            .validate(&object(json!({"n": 3.5, "at": 1.25, "f": "2"})))
            .expect_err("invalid");
        assert_eq!(issues.len(), 3);
        assert!(issues.iter().all(|issue| issue.code == IssueCode::InvalidDataType));
    }

    #[test]
    fn unknown_type_is_reported_when_field_present() {
        let schema = Schema::from_json_str(r#"[{"name":"blob","type":"bytes"},{"name":"note"}]"#)
            .expect("schema");
        assert_eq!(schema.fields()[1].field_type, FieldType::Str);

        let issues = schema
            .validate(&object(json!({"blob": "x", "note": "hi"})))
            .expect_err("invalid");
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].code, IssueCode::InvalidFieldType);
        assert!(issues[0].message.contains("bytes"));
    }

    #[test]
    fn obj_accepts_anything_and_undeclared_keys_pass_through() {
        let schema = Schema::new(vec![FieldSpec::new("meta", FieldType::Obj)]).unwrap();
        let row = schema
            .validate(&object(json!({"meta": [1, {"a": null}], "extra": true})))
            .expect("valid");
        assert_eq!(row.get("extra"), Some(&json!(true)));
    }

    #[test]
    fn schema_rejects_duplicate_and_reserved_names() {
        let dup = Schema::new(vec![
            FieldSpec::new("a", FieldType::Str),
            FieldSpec::new("a", FieldType::Int),
        ])
        .expect_err("dup");
        assert_eq!(dup.kind(), ErrorKind::Usage);

        let reserved = Schema::new(vec![FieldSpec::new("id", FieldType::Int)]).expect_err("id");
        assert_eq!(reserved.kind(), ErrorKind::Usage);
    }

    #[test]
    fn schema_json_reads_defaults_and_required() {
        let schema = Schema::from_json_str(
            r#"[{"name":"count","type":"int","default":0},{"name":"tag","required":false}]"#,
        )
        .unwrap();
        assert_eq!(schema.field("count").and_then(|f| f.default.clone()), Some(json!(0)));
        assert!(!schema.field("tag").unwrap().required);
        assert!(Schema::from_json_str("{}").is_err());
    }
}
