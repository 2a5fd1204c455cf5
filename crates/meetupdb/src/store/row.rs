//! Row values staged for insertion.

use std::fmt::Write;

use indexmap::IndexMap;
pub use rusqlite::types::Value;

/// One row of a table, as column name to value, in column order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    values: IndexMap<&'static str, Value>,
}

impl Row {
    /// Create an empty row.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a column value.
    pub fn with(mut self, column: &'static str, value: impl Into<Value>) -> Self {
        self.values.insert(column, value.into());
        self
    }

    /// Get a column value.
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.values.get(column)
    }

    /// Column names in insertion order.
    pub fn columns(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.values.keys().copied()
    }

    /// Whether this row has exactly the given column set, in any order.
    pub fn has_columns(&self, columns: &[&'static str]) -> bool {
        self.values.len() == columns.len() && columns.iter().all(|c| self.values.contains_key(c))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Human-readable form of a value, for error messages.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::Integer(i) => i.to_string(),
        Value::Real(f) => f.to_string(),
        Value::Text(s) => format!("'{}'", s),
        Value::Blob(b) => format!("<{} bytes>", b.len()),
    }
}

/// Hashable identity of a natural key.
pub(crate) fn key_repr<'v>(values: impl IntoIterator<Item = &'v Value>) -> String {
    let mut repr = String::new();
    for value in values {
        // Debug output distinguishes types, so Text("1") and Integer(1) differ.
        let _ = write!(repr, "{:?}\u{1f}", value);
    }
    repr
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_builder() {
        let row = Row::new()
            .with("slug", "brno".to_string())
            .with("latitude", 49.19)
            .with("address", None::<String>);

        assert_eq!(row.len(), 3);
        assert_eq!(row.get("slug"), Some(&Value::Text("brno".into())));
        assert_eq!(row.get("address"), Some(&Value::Null));
        assert_eq!(row.columns().collect::<Vec<_>>(), ["slug", "latitude", "address"]);
    }

    #[test]
    fn test_has_columns_ignores_order() {
        let row = Row::new().with("a", 1i64).with("b", 2i64);
        assert!(row.has_columns(&["b", "a"]));
        assert!(!row.has_columns(&["a"]));
        assert!(!row.has_columns(&["a", "c"]));
    }

    #[test]
    fn test_key_repr_distinguishes_types() {
        let text = Value::Text("1".into());
        let int = Value::Integer(1);
        assert_ne!(key_repr([&text]), key_repr([&int]));
        assert_eq!(key_repr([&int, &text]), key_repr(vec![&Value::Integer(1), &Value::Text("1".into())]));
    }
}
