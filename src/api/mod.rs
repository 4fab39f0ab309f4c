//! Purpose: Define the stable public Rust API boundary for kvtable.
//! Exports: Tables, rows, schemas, lookups, stores, and the error model.
//! Role: Public, additive-only surface used by the CLI and by embedding crates.
//! Invariants: Callers never need to reach into `core` paths directly.

pub use crate::core::error::{Error, ErrorKind, IssueCode, ValidationIssue, to_exit_code};
pub use crate::core::file_store::FileStore;
pub use crate::core::keys::RowId;
pub use crate::core::lookup::{Criteria, Lookup, MissingFieldPolicy, Operator};
pub use crate::core::schema::{FieldSpec, FieldType, ID_FIELD, Schema};
pub use crate::core::store::{MemoryStore, Store};
pub use crate::core::table::{Row, Table};
