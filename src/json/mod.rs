//! Purpose: Internal JSON decoding boundary shared by store and table reads.
//! Exports: `parse` module with decode helpers.
//! Role: Single seam for persisted-text decoding so callsites avoid ad hoc error mapping.
//! Invariants: Every read of persisted text goes through this module.

pub(crate) mod parse;
