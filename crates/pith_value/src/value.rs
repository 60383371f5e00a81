//! Dynamic host value type.

use crate::error::{ValueError, ValueResult};
use serde::de::{self, MapAccess, SeqAccess, Visitor};
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// A string-keyed mapping of host values.
pub type Dictionary = BTreeMap<String, Value>;

/// Largest integer a double represents exactly (2^53).
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_992.0;

/// A value as seen by the host environment.
///
/// The host knows six shapes: null, boolean, number (always a double),
/// string, dictionary and array. Every value crossing the host boundary is
/// one of these, copied rather than shared.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// Null (also stands in for "undefined").
    #[default]
    Null,
    /// Boolean value.
    Bool(bool),
    /// Double-precision number.
    Number(f64),
    /// UTF-8 string.
    Text(String),
    /// Ordered sequence of values.
    Array(Vec<Value>),
    /// String-keyed mapping; key order carries no meaning.
    Dictionary(Dictionary),
}

/// The shape of a [`Value`], used in error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    /// `Value::Null`.
    Null,
    /// `Value::Bool`.
    Bool,
    /// `Value::Number`.
    Number,
    /// `Value::Text`.
    Text,
    /// `Value::Array`.
    Array,
    /// `Value::Dictionary`.
    Dictionary,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueKind::Null => "null",
            ValueKind::Bool => "boolean",
            ValueKind::Number => "number",
            ValueKind::Text => "string",
            ValueKind::Array => "array",
            ValueKind::Dictionary => "dictionary",
        };
        f.write_str(name)
    }
}

impl Value {
    /// Returns the shape of this value.
    #[must_use]
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Null => ValueKind::Null,
            Value::Bool(_) => ValueKind::Bool,
            Value::Number(_) => ValueKind::Number,
            Value::Text(_) => ValueKind::Text,
            Value::Array(_) => ValueKind::Array,
            Value::Dictionary(_) => ValueKind::Dictionary,
        }
    }

    /// Check if this value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Get this value as a boolean, if it is one.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Get this value as a number, if it is one.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Get this value as a string, if it is one.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Get this value as an array, if it is one.
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    /// Get this value as a dictionary, if it is one.
    pub fn as_dictionary(&self) -> Option<&Dictionary> {
        match self {
            Value::Dictionary(d) => Some(d),
            _ => None,
        }
    }

    /// Look up a key in this dictionary value.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_dictionary().and_then(|d| d.get(key))
    }

    /// Returns the string content or a type mismatch error.
    pub fn expect_text(&self) -> ValueResult<&str> {
        self.as_text()
            .ok_or_else(|| ValueError::type_mismatch(ValueKind::Text, self.kind()))
    }

    /// Returns the numeric content or a type mismatch error.
    pub fn expect_number(&self) -> ValueResult<f64> {
        self.as_number()
            .ok_or_else(|| ValueError::type_mismatch(ValueKind::Number, self.kind()))
    }

    /// Returns the array content or a type mismatch error.
    pub fn expect_array(&self) -> ValueResult<&[Value]> {
        self.as_array()
            .ok_or_else(|| ValueError::type_mismatch(ValueKind::Array, self.kind()))
    }

    /// Returns element `index` of an array value.
    ///
    /// Fails if this is not an array or the array is too short.
    pub fn element(&self, index: usize) -> ValueResult<&Value> {
        let items = self.expect_array()?;
        items.get(index).ok_or(ValueError::MissingElement {
            expected: index + 1,
            found: items.len(),
        })
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(f64::from(n))
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Value::Number(f64::from(n))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<Dictionary> for Value {
    fn from(d: Dictionary) -> Self {
        Value::Dictionary(d)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::Array(v.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

impl From<()> for Value {
    fn from((): ()) -> Self {
        Value::Null
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            // Integral doubles go out as integers so JSON reads "3", not "3.0".
            #[allow(clippy::cast_possible_truncation)]
            Value::Number(n) if n.fract() == 0.0 && n.abs() <= MAX_SAFE_INTEGER => {
                serializer.serialize_i64(*n as i64)
            }
            Value::Number(n) => serializer.serialize_f64(*n),
            Value::Text(s) => serializer.serialize_str(s),
            Value::Array(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Dictionary(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (key, value) in entries {
                    map.serialize_entry(key, value)?;
                }
                map.end()
            }
        }
    }
}

struct ValueVisitor;

impl<'de> Visitor<'de> for ValueVisitor {
    type Value = Value;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("null, boolean, number, string, array or dictionary")
    }

    fn visit_unit<E: de::Error>(self) -> Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_none<E: de::Error>(self) -> Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<Value, D::Error> {
        Deserialize::deserialize(deserializer)
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<Value, E> {
        Ok(Value::Bool(v))
    }

    #[allow(clippy::cast_precision_loss)]
    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Value, E> {
        Ok(Value::Number(v as f64))
    }

    #[allow(clippy::cast_precision_loss)]
    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Value, E> {
        Ok(Value::Number(v as f64))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Value, E> {
        Ok(Value::Number(v))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Value, E> {
        Ok(Value::Text(v.to_string()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<Value, E> {
        Ok(Value::Text(v))
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Value, A::Error> {
        let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(item) = seq.next_element()? {
            items.push(item);
        }
        Ok(Value::Array(items))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Value, A::Error> {
        let mut entries = Dictionary::new();
        while let Some((key, value)) = map.next_entry::<String, Value>()? {
            entries.insert(key, value);
        }
        Ok(Value::Dictionary(entries))
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(ValueVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_accessors() {
        assert!(Value::Null.is_null());
        assert!(!Value::Bool(true).is_null());

        assert_eq!(Value::Bool(true).as_bool(), Some(true));
        assert_eq!(Value::Number(1.0).as_bool(), None);

        assert_eq!(Value::Number(42.0).as_number(), Some(42.0));
        assert_eq!(Value::from("42").as_number(), None);

        assert_eq!(Value::from("hello").as_text(), Some("hello"));
        assert_eq!(
            Value::from(vec![1, 2]).as_array(),
            Some(&[Value::Number(1.0), Value::Number(2.0)][..])
        );
    }

    #[test]
    fn dictionary_get() {
        let mut record = Dictionary::new();
        record.insert("id".to_string(), Value::from("n1"));
        record.insert("title".to_string(), Value::from("Groceries"));
        let value = Value::from(record);

        assert_eq!(value.get("title"), Some(&Value::from("Groceries")));
        assert_eq!(value.get("missing"), None);
        assert_eq!(Value::Null.get("id"), None);
    }

    #[test]
    fn expect_reports_kinds() {
        let err = Value::Number(1.0).expect_text().unwrap_err();
        assert_eq!(
            err,
            ValueError::type_mismatch(ValueKind::Text, ValueKind::Number)
        );
        assert_eq!(err.to_string(), "expected string, found number");
    }

    #[test]
    fn element_bounds() {
        let value = Value::from(vec!["a"]);
        assert_eq!(value.element(0).unwrap(), &Value::from("a"));
        assert!(matches!(
            value.element(3),
            Err(ValueError::MissingElement {
                expected: 4,
                found: 1
            })
        ));
        assert!(Value::Null.element(0).is_err());
    }

    #[test]
    fn from_impls() {
        assert_eq!(Value::from(true), Value::Bool(true));
        assert_eq!(Value::from(42i32), Value::Number(42.0));
        assert_eq!(Value::from(42u32), Value::Number(42.0));
        assert_eq!(Value::from(2.5f64), Value::Number(2.5));
        assert_eq!(Value::from("hi".to_string()), Value::Text("hi".to_string()));
        assert_eq!(Value::from(None::<String>), Value::Null);
        assert_eq!(Value::from(Some("x")), Value::from("x"));
        assert_eq!(Value::from(()), Value::Null);
    }

    #[test]
    fn kind_names() {
        assert_eq!(ValueKind::Dictionary.to_string(), "dictionary");
        assert_eq!(Value::from(vec![Value::Null]).kind(), ValueKind::Array);
    }
}
