// Core modules implementing keys, schema validation, the index cache, lookups, and tables.
pub mod error;
pub mod file_store;
pub mod index;
pub mod keys;
pub mod lookup;
pub mod schema;
pub mod store;
pub mod table;
