//! Defensive JSON decoding for `--json` output.
//!
//! The tool's JSON mode is best-effort: output may be empty, truncated, a
//! bare array, or an array wrapped in an object. Elements are decoded one at a
//! time so a single odd element only drops itself.

use serde::de::{Deserialize, DeserializeOwned, Deserializer};
use serde_json::Value;

use super::Parsed;

/// Decode a list of records.
///
/// Accepts a bare array, `null` (no records), or an object holding the array
/// under one of `keys`.
pub fn parse_list<T: DeserializeOwned>(
    command: &'static str,
    text: &str,
    keys: &[&str],
) -> Parsed<T> {
    let value = match parse_value(text) {
        Ok(value) => value,
        Err(reason) => return Parsed::failed(command, reason),
    };

    let items = match value {
        Value::Null => return Parsed::ok(Vec::new()),
        Value::Array(items) => items,
        Value::Object(mut map) => {
            match keys.iter().find_map(|k| map.remove(*k)) {
                Some(Value::Array(items)) => items,
                Some(Value::Null) => return Parsed::ok(Vec::new()),
                _ => return Parsed::failed(command, "object without a record list"),
            }
        }
        other => {
            return Parsed::failed(command, format!("expected a list, got {}", kind_of(&other)));
        }
    };

    decode_items(command, items)
}

/// Decode a single record.
///
/// Accepts an object, or an array whose first element is the record.
pub fn parse_one<T: DeserializeOwned>(command: &'static str, text: &str) -> Parsed<T> {
    let value = match parse_value(text) {
        Ok(value) => value,
        Err(reason) => return Parsed::failed(command, reason),
    };

    let value = match value {
        Value::Array(items) => match items.into_iter().next() {
            Some(first) => first,
            None => return Parsed::ok(Vec::new()),
        },
        other => other,
    };

    match serde_json::from_value(value) {
        Ok(record) => Parsed::ok(vec![record]),
        Err(e) => Parsed::failed(command, e.to_string()),
    }
}

fn parse_value(text: &str) -> Result<Value, String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err("empty output".to_string());
    }
    serde_json::from_str(trimmed).map_err(|e| e.to_string())
}

fn decode_items<T: DeserializeOwned>(command: &'static str, items: Vec<Value>) -> Parsed<T> {
    let total = items.len();
    let mut records = Vec::with_capacity(total);
    let mut skipped = 0;

    for item in items {
        match serde_json::from_value(item) {
            Ok(record) => records.push(record),
            Err(e) => {
                skipped += 1;
                tracing::debug!(command, error = %e, "skipping malformed element");
            }
        }
    }

    if total > 0 && records.is_empty() {
        return Parsed::failed(command, format!("all {total} elements malformed"));
    }
    if skipped > 0 {
        tracing::warn!(command, skipped, total, "skipped malformed elements");
    }
    Parsed::ok(records)
}

/// Field helper for lists nested inside a single record.
///
/// Each element decodes on its own and a malformed one is dropped. A value
/// that is not an array at all reads as an empty list.
pub fn lenient_list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let Value::Array(items) = Value::deserialize(deserializer)? else {
        return Ok(Vec::new());
    };
    Ok(items
        .into_iter()
        .filter_map(|item| match serde_json::from_value(item) {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::warn!(error = %e, "dropping malformed nested element");
                None
            }
        })
        .collect())
}

/// Field helper for optional scalars whose type drifts: a value of the wrong
/// type reads as absent.
pub fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
