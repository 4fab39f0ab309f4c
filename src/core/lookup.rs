//! Purpose: Compile and evaluate row filters for `Table::filter`.
//! Exports: `Operator`, `Lookup`, `MissingFieldPolicy`, `Criteria`.
//! Role: Declarative `{field: {op: value}}` lookups plus caller predicates behind one tagged type.
//! Invariants: Unknown operators fail at compile time, before any row is read.
//! Invariants: Clauses are AND-combined across fields and across operators within a field.
//! Invariants: Values of different JSON kinds are unequal and unordered.
use std::cmp::Ordering;
use std::fmt;

use serde_json::{Number, Value};

use crate::core::error::{Error, ErrorKind};
use crate::core::schema::kind_name;
use crate::core::table::Row;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Operator {
    Eq,
    Gt,
    Gte,
    Lt,
    Lte,
    Ne,
}

impl Operator {
    pub fn parse(text: &str) -> Result<Self, Error> {
        match text {
            "=" => Ok(Self::Eq),
            ">" => Ok(Self::Gt),
            ">=" => Ok(Self::Gte),
            "<" => Ok(Self::Lt),
            "<=" => Ok(Self::Lte),
            "!=" => Ok(Self::Ne),
            other => Err(Error::new(ErrorKind::InvalidLookup)
                .with_message(format!("unsupported lookup operator `{other}`"))
                .with_hint("Supported operators: =, !=, >, >=, <, <=")),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Gt => ">",
            Self::Gte => ">=",
            Self::Lt => "<",
            Self::Lte => "<=",
            Self::Ne => "!=",
        }
    }

    /// `row_value OP operand`.
    pub fn evaluate(self, row_value: &Value, operand: &Value) -> bool {
        match self {
            Self::Eq => values_equal(row_value, operand),
            Self::Ne => !values_equal(row_value, operand),
            Self::Gt => compare(row_value, operand) == Some(Ordering::Greater),
            Self::Gte => matches!(
                compare(row_value, operand),
                Some(Ordering::Greater | Ordering::Equal)
            ),
            Self::Lt => compare(row_value, operand) == Some(Ordering::Less),
            Self::Lte => matches!(
                compare(row_value, operand),
                Some(Ordering::Less | Ordering::Equal)
            ),
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn values_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => compare_numbers(a, b) == Some(Ordering::Equal),
        _ => left == right,
    }
}

fn compare(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => compare_numbers(a, b),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        _ => None,
    }
}

fn compare_numbers(a: &Number, b: &Number) -> Option<Ordering> {
    if let (Some(a), Some(b)) = (a.as_i64(), b.as_i64()) {
        return Some(a.cmp(&b));
    }
    if let (Some(a), Some(b)) = (a.as_u64(), b.as_u64()) {
        return Some(a.cmp(&b));
    }
    a.as_f64()?.partial_cmp(&b.as_f64()?)
}

/// What a lookup does with a row that lacks a filtered field.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum MissingFieldPolicy {
    /// The field's clauses are skipped; the row can still match.
    #[default]
    Skip,
    /// The row does not match.
    Exclude,
}

#[derive(Clone, Debug, PartialEq)]
struct Clause {
    op: Operator,
    operand: Value,
}

#[derive(Clone, Debug, PartialEq)]
struct FieldClauses {
    field: String,
    clauses: Vec<Clause>,
}

/// A compiled declarative filter.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Lookup {
    fields: Vec<FieldClauses>,
    missing: MissingFieldPolicy,
}

impl Lookup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compiles `{field: {op: value, ...}, ...}`.
    pub fn compile(spec: &Value) -> Result<Self, Error> {
        let Value::Object(fields) = spec else {
            return Err(shape_error(format!(
                "lookup must be an object of fields, got {}",
                kind_name(spec)
            )));
        };

        let mut lookup = Self::new();
        for (field, ops) in fields {
            let Value::Object(ops) = ops else {
                return Err(shape_error(format!(
                    "lookup for `{field}` must be an object of operators, got {}",
                    kind_name(ops)
                )));
            };
            for (op, operand) in ops {
                lookup = lookup.with(field, Operator::parse(op)?, operand.clone());
            }
        }
        Ok(lookup)
    }

    pub fn with(mut self, field: impl Into<String>, op: Operator, operand: impl Into<Value>) -> Self {
        let field = field.into();
        let clause = Clause {
            op,
            operand: operand.into(),
        };
        match self.fields.iter_mut().find(|entry| entry.field == field) {
            Some(entry) => entry.clauses.push(clause),
            None => self.fields.push(FieldClauses {
                field,
                clauses: vec![clause],
            }),
        }
        self
    }

    pub fn with_missing_fields(mut self, policy: MissingFieldPolicy) -> Self {
        self.missing = policy;
        self
    }

    pub fn missing_fields(&self) -> MissingFieldPolicy {
        self.missing
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn matches(&self, row: &Row) -> bool {
        self.fields.iter().all(|entry| match row.get(&entry.field) {
            Some(value) => entry
                .clauses
                .iter()
                .all(|clause| clause.op.evaluate(value, &clause.operand)),
            None => self.missing == MissingFieldPolicy::Skip,
        })
    }
}

fn shape_error(message: String) -> Error {
    Error::new(ErrorKind::InvalidLookup)
        .with_message(message)
        .with_hint(r#"Example: {"age": {">=": 18}, "name": {"=": "Ann"}}"#)
}

/// How `Table::filter` selects rows. Chosen once by the caller; never
/// re-inspected per row.
pub enum Criteria<'a> {
    All,
    Predicate(Box<dyn Fn(&Row) -> bool + 'a>),
    Lookup(Lookup),
}

impl<'a> Criteria<'a> {
    pub fn predicate(f: impl Fn(&Row) -> bool + 'a) -> Self {
        Self::Predicate(Box::new(f))
    }

    /// Compiles a declarative lookup; fails with `InvalidLookup` on bad input.
    pub fn lookup(spec: &Value) -> Result<Self, Error> {
        Lookup::compile(spec).map(Self::Lookup)
    }

    pub fn matches(&self, row: &Row) -> bool {
        match self {
            Self::All => true,
            Self::Predicate(f) => f(row),
            Self::Lookup(lookup) => lookup.matches(row),
        }
    }
}

impl Default for Criteria<'_> {
    fn default() -> Self {
        Self::All
    }
}

impl From<Lookup> for Criteria<'_> {
    fn from(lookup: Lookup) -> Self {
        Self::Lookup(lookup)
    }
}

impl fmt::Debug for Criteria<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str("All"),
            Self::Predicate(_) => f.write_str("Predicate(..)"),
            Self::Lookup(lookup) => f.debug_tuple("Lookup").field(lookup).finish(),
        }
    }
}
