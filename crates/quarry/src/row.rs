//! Row mapping traits and utilities

use crate::error::{Error, ExecResult};
use crate::value::Value;
use chrono::NaiveDateTime;
use std::sync::Arc;
use uuid::Uuid;

/// A result row detached from any driver.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    columns: Arc<[String]>,
    values: Vec<Value>,
}

impl Row {
    /// Build a row; `columns` is shared across all rows of one result set.
    pub fn new(columns: Arc<[String]>, values: Vec<Value>) -> Self {
        debug_assert_eq!(columns.len(), values.len());
        Self { columns, values }
    }

    /// Convenience constructor for tests and in-memory executors.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let (columns, values): (Vec<String>, Vec<Value>) = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .unzip();
        Self::new(columns.into(), values)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Raw value by column name.
    pub fn value(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .position(|c| c == column)
            .and_then(|i| self.values.get(i))
    }

    /// Raw value by position.
    pub fn value_at(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// Typed access by column name, returning [`Error::Decode`] on failure.
    pub fn try_get<T: FromValue>(&self, column: &str) -> ExecResult<T> {
        let value = self
            .value(column)
            .ok_or_else(|| Error::decode(column, "no such column"))?;
        T::from_value(value).map_err(|message| Error::decode(column, message))
    }

    /// Typed access by position.
    pub fn try_get_at<T: FromValue>(&self, index: usize) -> ExecResult<T> {
        let name = self
            .columns
            .get(index)
            .cloned()
            .unwrap_or_else(|| format!("#{index}"));
        let value = self
            .values
            .get(index)
            .ok_or_else(|| Error::decode(&name, "no such column"))?;
        T::from_value(value).map_err(|message| Error::decode(name, message))
    }
}

/// Conversion out of a [`Value`]. The error is a human-readable reason.
pub trait FromValue: Sized {
    fn from_value(value: &Value) -> Result<Self, String>;
}

fn mismatch(expected: &str, got: &Value) -> String {
    format!("expected {expected}, got {}", got.debug_repr())
}

impl FromValue for Value {
    fn from_value(value: &Value) -> Result<Self, String> {
        Ok(value.clone())
    }
}

impl FromValue for i64 {
    fn from_value(value: &Value) -> Result<Self, String> {
        match value {
            Value::Int(i) => Ok(*i),
            other => Err(mismatch("integer", other)),
        }
    }
}

impl FromValue for i32 {
    fn from_value(value: &Value) -> Result<Self, String> {
        let wide = i64::from_value(value)?;
        i32::try_from(wide).map_err(|e| e.to_string())
    }
}

impl FromValue for u64 {
    fn from_value(value: &Value) -> Result<Self, String> {
        let wide = i64::from_value(value)?;
        u64::try_from(wide).map_err(|e| e.to_string())
    }
}

impl FromValue for f64 {
    fn from_value(value: &Value) -> Result<Self, String> {
        match value {
            Value::Float(f) => Ok(*f),
            Value::Int(i) => Ok(*i as f64),
            other => Err(mismatch("float", other)),
        }
    }
}

impl FromValue for bool {
    fn from_value(value: &Value) -> Result<Self, String> {
        match value {
            Value::Bool(b) => Ok(*b),
            other => Err(mismatch("bool", other)),
        }
    }
}

impl FromValue for String {
    fn from_value(value: &Value) -> Result<Self, String> {
        match value {
            Value::Text(s) => Ok(s.clone()),
            other => Err(mismatch("text", other)),
        }
    }
}

impl FromValue for NaiveDateTime {
    fn from_value(value: &Value) -> Result<Self, String> {
        match value {
            Value::Timestamp(ts) => Ok(*ts),
            other => Err(mismatch("timestamp", other)),
        }
    }
}

impl FromValue for Uuid {
    fn from_value(value: &Value) -> Result<Self, String> {
        match value {
            Value::Uuid(u) => Ok(*u),
            Value::Text(s) => Uuid::parse_str(s).map_err(|e| e.to_string()),
            other => Err(mismatch("uuid", other)),
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: &Value) -> Result<Self, String> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

impl<T: FromValue> FromValue for Vec<T> {
    fn from_value(value: &Value) -> Result<Self, String> {
        match value {
            Value::List(items) => items.iter().map(T::from_value).collect(),
            other => Err(mismatch("list", other)),
        }
    }
}

/// Trait for types that can be constructed from a result row.
///
/// # Example
///
/// ```
/// use quarry::{ExecResult, FromRow, Row};
///
/// struct User {
///     id: i64,
///     email: Option<String>,
/// }
///
/// impl FromRow for User {
///     fn from_row(row: &Row) -> ExecResult<Self> {
///         Ok(Self {
///             id: row.try_get("id")?,
///             email: row.try_get("email")?,
///         })
///     }
/// }
///
/// let row = Row::from_pairs([("id", quarry::Value::from(1)), ("email", quarry::Value::Null)]);
/// let user = User::from_row(&row)?;
/// assert_eq!(user.id, 1);
/// assert!(user.email.is_none());
/// # Ok::<(), quarry::Error>(())
/// ```
pub trait FromRow: Sized {
    /// Convert a row into Self
    fn from_row(row: &Row) -> ExecResult<Self>;
}

impl FromRow for Row {
    fn from_row(row: &Row) -> ExecResult<Self> {
        Ok(row.clone())
    }
}

/// Single-column rows, e.g. `SELECT COUNT(*) ...`.
impl FromRow for i64 {
    fn from_row(row: &Row) -> ExecResult<Self> {
        row.try_get_at(0)
    }
}

impl FromRow for String {
    fn from_row(row: &Row) -> ExecResult<Self> {
        row.try_get_at(0)
    }
}
