//! Purpose: Decode persisted JSON text into typed values.
//! Exports: `from_str`, `to_string`.
//! Role: Maps serde_json failures onto `Corrupt`/`Internal` errors with context.
//! Invariants: Decode failures never panic and always name what was being read.

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::core::error::{Error, ErrorKind};

pub(crate) fn from_str<T: DeserializeOwned>(input: &str, context: &str) -> Result<T, Error> {
    serde_json::from_str(input).map_err(|err| {
        Error::new(ErrorKind::Corrupt)
            .with_message(format!("failed to decode {context}"))
            .with_hint(format!(
                "line {}, column {}: the stored text is not the expected JSON shape",
                err.line(),
                err.column()
            ))
            .with_source(err)
    })
}

pub(crate) fn to_string<T: Serialize + ?Sized>(value: &T, context: &str) -> Result<String, Error> {
    serde_json::to_string(value).map_err(|err| {
        Error::new(ErrorKind::Internal)
            .with_message(format!("failed to encode {context}"))
            .with_source(err)
    })
}
