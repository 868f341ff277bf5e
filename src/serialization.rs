//! Text encoding of cached values.
//!
//! Values are stored as plain text:
//!
//! - strings are stored raw, without JSON quoting
//! - numbers and booleans are stored as their display form
//! - `null`, sequences and maps are stored as JSON text
//!
//! Reading attempts a JSON decode first and falls back to the raw text.
//! A stored number and a stored numeric string are therefore
//! indistinguishable: `5` and `"5"` both land in the store as `5`. The
//! requested type decides how such a value is read back.

use crate::error::{Error, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

/// Encode a value into the text form written to the store.
///
/// # Errors
///
/// Returns `Error::Serialization` if the value cannot be represented as JSON
/// (e.g. a map with non-string keys).
pub fn serialize_value<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    let text = match serde_json::to_value(value)? {
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        structured => serde_json::to_string(&structured)?,
    };
    Ok(text)
}

/// Decode stored text into `T`.
///
/// # Errors
///
/// Returns `Error::Serialization` if the text is neither JSON decodable
/// into `T` nor usable as a raw string value of `T`.
pub fn deserialize_value<T: DeserializeOwned>(raw: &str) -> Result<T> {
    match serde_json::from_str::<T>(raw) {
        Ok(value) => Ok(value),
        Err(json_err) => serde_json::from_value(Value::String(raw.to_string())).map_err(|_| {
            Error::Serialization(format!(
                "stored value does not match the requested type: {}",
                json_err
            ))
        }),
    }
}
