//! Typed field values and relational rows
//!
//! Rows are stored in key-ordered maps, so `Value` carries a total order
//! (`Null < Int < Text < Blob`, then payload order within a variant).

use serde::{Deserialize, Serialize};
use std::fmt;

/// A single typed field value
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Value {
    /// Absent value (nullable columns only)
    Null,
    /// 32-bit integer column value
    Int(i32),
    /// Text column value
    Text(String),
    /// Binary stream column value
    Blob(Vec<u8>),
}

impl Value {
    /// Whether this value is `Null`
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// The text payload, if any
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// The integer payload, if any
    pub const fn as_int(&self) -> Option<i32> {
        match self {
            Self::Int(n) => Some(*n),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "NULL"),
            Self::Int(n) => write!(f, "{n}"),
            Self::Text(s) => write!(f, "{s}"),
            Self::Blob(b) => write!(f, "<{} bytes>", b.len()),
        }
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Self::Int(n)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<Vec<u8>> for Value {
    fn from(b: Vec<u8>) -> Self {
        Self::Blob(b)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map_or(Self::Null, Into::into)
    }
}

/// A named table plus an ordered list of typed field values.
///
/// Columns not listed are treated as `Null`. When a `Row` is used as a
/// predicate (update/delete), only its listed fields participate in matching.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    table: String,
    fields: Vec<(String, Value)>,
}

impl Row {
    /// Start an empty row for the named table
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            fields: Vec::new(),
        }
    }

    /// Set a field, replacing any earlier value for the same column
    #[must_use]
    pub fn set(mut self, column: &str, value: impl Into<Value>) -> Self {
        let value = value.into();
        if let Some(slot) = self.fields.iter_mut().find(|(name, _)| name == column) {
            slot.1 = value;
        } else {
            self.fields.push((column.to_string(), value));
        }
        self
    }

    /// The table this row belongs to
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Field value for a column, `None` when the column is not listed
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    /// Iterate over the listed fields in declaration order
    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }
}

/// Conversion from a typed table struct into a generic [`Row`]
pub trait TableRow {
    /// The builtin table this struct maps to
    const TABLE: &'static str;

    /// Convert into a generic row
    fn into_row(self) -> Row;
}

impl<T: TableRow> From<T> for Row {
    fn from(typed: T) -> Self {
        typed.into_row()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_ordering() {
        assert!(Value::Null < Value::Int(0));
        assert!(Value::Int(i32::MAX) < Value::Text(String::new()));
        assert!(Value::Text("z".into()) < Value::Blob(vec![]));
        assert!(Value::Int(1) < Value::Int(2));
        assert!(Value::Text("a".into()) < Value::Text("b".into()));
    }

    #[test]
    fn test_value_from_option() {
        assert_eq!(Value::from(None::<&str>), Value::Null);
        assert_eq!(Value::from(Some("x")), Value::Text("x".into()));
    }

    #[test]
    fn test_row_set_replaces() {
        let row = Row::new("Property").set("Value", "a").set("Value", "b");
        assert_eq!(row.get("Value"), Some(&Value::Text("b".into())));
        assert_eq!(row.fields().count(), 1);
    }

    #[test]
    fn test_row_missing_field_is_none() {
        let row = Row::new("Property").set("Property", "Manufacturer");
        assert!(row.get("Value").is_none());
    }
}
