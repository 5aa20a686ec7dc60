//! Tolerant field decoders for records coming from the document store.
//!
//! The store does not enforce types, so prices arrive as numbers or numeric
//! strings, flags as booleans or "true"/"false", and references either as a
//! plain name or as a populated `{ _id, name }` object.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

fn number_from(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    n.filter(|n| n.is_finite())
}

fn name_from(value: Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s),
        Value::Object(mut map) => match map.remove("name") {
            Some(Value::String(s)) => Some(s),
            _ => None,
        },
        _ => None,
    }
}

pub(crate) fn number<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
    let value = Option::<Value>::deserialize(d)?;
    Ok(value.as_ref().and_then(number_from).unwrap_or(0.0))
}

pub(crate) fn optional_number<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
    let value = Option::<Value>::deserialize(d)?;
    Ok(value.as_ref().and_then(number_from))
}

pub(crate) fn count<'de, D: Deserializer<'de>>(d: D) -> Result<u64, D::Error> {
    let n = number(d)?;
    Ok(if n > 0.0 { n as u64 } else { 0 })
}

pub(crate) fn flag<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
    let value = Option::<Value>::deserialize(d)?;
    Ok(match value {
        Some(Value::Bool(b)) => b,
        Some(Value::String(s)) => s.trim().eq_ignore_ascii_case("true"),
        Some(Value::Number(n)) => n.as_f64().is_some_and(|n| n != 0.0),
        _ => false,
    })
}

pub(crate) fn name<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    Ok(optional_name(d)?.unwrap_or_default())
}

pub(crate) fn optional_name<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    let value = Option::<Value>::deserialize(d)?;
    Ok(value.and_then(name_from).filter(|s| !s.is_empty()))
}
