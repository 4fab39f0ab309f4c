//! Purpose: Library crate behind the `kvtable` CLI: schema-checked tables over a key-value store.
//! Exports: `api` (stable surface) and `core` (keys, schema, index, lookup, table, stores).
//! Role: Embeddable engine; the binary is a thin JSON-in/JSON-out shell over `api`.
//! Invariants: All persisted data is plain JSON text under `<table>_list` / `<table>_detail_<id>`.
//! Invariants: Operations are synchronous and single-owner; no internal locking.
pub mod api;
pub mod core;
mod json;
