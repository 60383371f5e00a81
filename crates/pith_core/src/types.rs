//! Result shapes returned to the host.

use pith_value::{Dictionary, Value};

/// A record in dictionary form: column name to value.
pub type Record = Dictionary;

/// A record in positional form: values in result-column order.
pub type RecordArray = Vec<Value>;

/// One result of a cache-aware read.
///
/// The host branches on this shape: a bare id string means "you already
/// hold this record", anything else is the full record.
#[derive(Debug, Clone, PartialEq)]
pub enum Cached<T> {
    /// The host already holds this record; only its id is returned.
    Reference(String),
    /// The full record.
    Full(T),
}

impl<T> Cached<T> {
    /// Returns true for a bare-id reference.
    #[must_use]
    pub fn is_reference(&self) -> bool {
        matches!(self, Cached::Reference(_))
    }

    /// Returns the full record, if this is one.
    #[must_use]
    pub fn full(&self) -> Option<&T> {
        match self {
            Cached::Full(record) => Some(record),
            Cached::Reference(_) => None,
        }
    }

    /// Returns the referenced id, if this is a reference.
    #[must_use]
    pub fn reference(&self) -> Option<&str> {
        match self {
            Cached::Reference(id) => Some(id),
            Cached::Full(_) => None,
        }
    }
}

impl<T: Into<Value>> From<Cached<T>> for Value {
    fn from(cached: Cached<T>) -> Self {
        match cached {
            Cached::Reference(id) => Value::Text(id),
            Cached::Full(record) => record.into(),
        }
    }
}

/// Result of a positional-array query.
///
/// On the host side this is one sequence: the column names first, then one
/// entry per row. A query that matched nothing is an empty sequence, without
/// the column entry.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ArrayQueryResult {
    /// Result column names, in position order.
    pub columns: Vec<String>,
    /// One entry per matching row.
    pub rows: Vec<Cached<RecordArray>>,
}

impl ArrayQueryResult {
    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true if no row matched.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl From<ArrayQueryResult> for Value {
    fn from(result: ArrayQueryResult) -> Self {
        if result.rows.is_empty() {
            return Value::Array(Vec::new());
        }
        let mut items = Vec::with_capacity(result.rows.len() + 1);
        items.push(Value::from(result.columns));
        items.extend(result.rows.into_iter().map(Value::from));
        Value::Array(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_becomes_bare_string() {
        let value = Value::from(Cached::<Record>::Reference("n1".to_string()));
        assert_eq!(value, Value::from("n1"));
    }

    #[test]
    fn full_record_becomes_dictionary() {
        let mut record = Record::new();
        record.insert("id".to_string(), Value::from("n1"));
        let value = Value::from(Cached::Full(record.clone()));
        assert_eq!(value, Value::Dictionary(record));
    }

    #[test]
    fn array_result_prefixes_columns() {
        let result = ArrayQueryResult {
            columns: vec!["id".to_string(), "title".to_string()],
            rows: vec![
                Cached::Full(vec![Value::from("a"), Value::from("A")]),
                Cached::Reference("b".to_string()),
            ],
        };

        let value = Value::from(result);

        assert_eq!(
            value,
            Value::Array(vec![
                Value::from(vec!["id", "title"]),
                Value::from(vec!["a", "A"]),
                Value::from("b"),
            ])
        );
    }

    #[test]
    fn empty_array_result_has_no_columns_entry() {
        let result = ArrayQueryResult {
            columns: vec!["id".to_string()],
            rows: Vec::new(),
        };
        assert_eq!(Value::from(result), Value::Array(Vec::new()));
    }
}
