//! Purpose: Resolve which store file the CLI opens.
//! Exports: `STORE_ENV`, `default_store_path`, `resolve_store_path`.
//! Role: Keep flag, environment, and default resolution in one place.
//! Invariants: Precedence is `--store` flag, then `KVTABLE_STORE`, then `~/.kvtable/store.json`.
//! Invariants: An empty environment value counts as unset.

use std::ffi::OsString;
use std::path::PathBuf;

pub(crate) const STORE_ENV: &str = "KVTABLE_STORE";

pub(crate) fn default_store_path() -> PathBuf {
    store_path_from(std::env::var_os(STORE_ENV), std::env::var_os("HOME"))
}

pub(crate) fn resolve_store_path(flag: Option<PathBuf>) -> PathBuf {
    flag.unwrap_or_else(default_store_path)
}

fn store_path_from(env_value: Option<OsString>, home: Option<OsString>) -> PathBuf {
    if let Some(path) = env_value.filter(|value| !value.is_empty()) {
        return PathBuf::from(path);
    }
    PathBuf::from(home.unwrap_or_default())
        .join(".kvtable")
        .join("store.json")
}
