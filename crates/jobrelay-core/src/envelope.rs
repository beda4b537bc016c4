//! Decoding of the uniform `{"data": <value>}` envelope every sibling
//! backend wraps its responses in.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::Value;

use crate::error::{Error, Result};

/// Timestamp layout used on the wire: UTC, second precision, literal `Z`.
const TIMESTAMP_LAYOUT: &str = "%Y-%m-%dT%H:%M:%SZ";

fn parse_envelope(bytes: &[u8]) -> Result<serde_json::Map<String, Value>> {
    let value: Value = serde_json::from_slice(bytes)
        .map_err(|e| Error::Decode(format!("invalid envelope json: {e}")))?;
    match value {
        Value::Object(map) => Ok(map),
        other => Err(Error::Decode(format!(
            "envelope is not a json object: {other}"
        ))),
    }
}

/// Extract the `data` field as an untyped JSON value.
///
/// A missing `data` key resolves to `Value::Null` rather than an error; a
/// backend that answers `{}` is treated as having answered nothing.
pub fn decode_opaque(bytes: &[u8]) -> Result<Value> {
    let mut map = parse_envelope(bytes)?;
    Ok(map.remove("data").unwrap_or(Value::Null))
}

/// Extract the `data` field as a timestamp in the fixed wire layout.
///
/// Anything other than a string matching the layout exactly (absent key,
/// wrong type, offsets, sub-second precision) is a decode failure.
pub fn decode_timestamp(bytes: &[u8]) -> Result<DateTime<Utc>> {
    let map = parse_envelope(bytes)?;
    let raw = map
        .get("data")
        .and_then(Value::as_str)
        .ok_or_else(|| Error::Decode("envelope data is not a string".into()))?;
    let naive = NaiveDateTime::parse_from_str(raw, TIMESTAMP_LAYOUT)
        .map_err(|e| Error::Decode(format!("bad timestamp '{raw}': {e}")))?;
    Ok(naive.and_utc())
}
