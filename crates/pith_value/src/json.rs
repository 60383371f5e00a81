//! JSON text bridging for host values.

use crate::error::ValueResult;
use crate::value::Value;

/// Parses JSON text into a [`Value`].
pub fn from_json(text: &str) -> ValueResult<Value> {
    Ok(serde_json::from_str(text)?)
}

/// Renders a [`Value`] as compact JSON.
pub fn to_json(value: &Value) -> ValueResult<String> {
    Ok(serde_json::to_string(value)?)
}

/// Renders a [`Value`] as indented JSON.
pub fn to_json_pretty(value: &Value) -> ValueResult<String> {
    Ok(serde_json::to_string_pretty(value)?)
}
