//! Table descriptions and inferred parameter types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A column as declared in the table schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub declared_type: String,
}

impl Column {
    pub fn new(name: impl Into<String>, declared_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            declared_type: declared_type.into(),
        }
    }

    /// Parameter type inferred from the declared SQL type.
    pub fn param_type(&self) -> ParamType {
        ParamType::from_declared(&self.declared_type)
    }
}

/// The ordered column list a condition is resolved against.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    pub name: String,
    pub columns: Vec<Column>,
}

impl Table {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
        }
    }

    /// Append a column (builder style).
    pub fn column(mut self, name: impl Into<String>, declared_type: impl Into<String>) -> Self {
        self.columns.push(Column::new(name, declared_type));
        self
    }

    /// Look up a column by its 1-based position.
    pub fn by_index(&self, index: usize) -> Option<&Column> {
        index.checked_sub(1).and_then(|i| self.columns.get(i))
    }

    /// Look up a column by name, ignoring ASCII case.
    pub fn by_name(&self, name: &str) -> Option<&Column> {
        self.columns
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }
}

/// Type of a bound parameter, as seen by generated call sites.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ParamType {
    Integer,
    String,
    Boolean,
    Float,
    Timestamp,
    /// No better guess for the declared type.
    Any,
    /// The parameter of an `IN (?)` predicate.
    List(Box<ParamType>),
}

impl ParamType {
    /// Map a declared SQL type (e.g. `VARCHAR(64)`, `int unsigned`) to a parameter type.
    ///
    /// Only the leading keyword matters.
    pub fn from_declared(declared: &str) -> Self {
        let base: String = declared
            .trim()
            .chars()
            .take_while(|c| c.is_ascii_alphanumeric() || *c == '_')
            .collect::<String>()
            .to_ascii_uppercase();

        match base.as_str() {
            "INT" | "INTEGER" | "TINYINT" | "SMALLINT" | "MEDIUMINT" | "BIGINT" | "INT2"
            | "INT4" | "INT8" | "SERIAL" | "BIGSERIAL" | "SMALLSERIAL" => Self::Integer,
            "CHAR" | "VARCHAR" | "CHARACTER" | "NCHAR" | "NVARCHAR" | "TEXT" | "TINYTEXT"
            | "MEDIUMTEXT" | "LONGTEXT" | "ENUM" => Self::String,
            "BOOL" | "BOOLEAN" => Self::Boolean,
            "DECIMAL" | "NUMERIC" | "FLOAT" | "FLOAT4" | "FLOAT8" | "DOUBLE" | "REAL" => {
                Self::Float
            }
            "DATE" | "TIME" | "DATETIME" | "TIMESTAMP" | "TIMESTAMPTZ" | "TIMETZ" | "YEAR" => {
                Self::Timestamp
            }
            _ => Self::Any,
        }
    }

    /// Wrap in a list type.
    pub fn list(self) -> Self {
        Self::List(Box::new(self))
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer => f.write_str("int"),
            Self::String => f.write_str("string"),
            Self::Boolean => f.write_str("bool"),
            Self::Float => f.write_str("float"),
            Self::Timestamp => f.write_str("timestamp"),
            Self::Any => f.write_str("any"),
            Self::List(inner) => write!(f, "[]{inner}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declared_types_map_by_leading_keyword() {
        assert_eq!(ParamType::from_declared("tinyint(4)"), ParamType::Integer);
        assert_eq!(ParamType::from_declared("INT UNSIGNED"), ParamType::Integer);
        assert_eq!(ParamType::from_declared("varchar(255)"), ParamType::String);
        assert_eq!(
            ParamType::from_declared("enum('on','off')"),
            ParamType::String
        );
        assert_eq!(
            ParamType::from_declared("character varying"),
            ParamType::String
        );
        assert_eq!(ParamType::from_declared("boolean"), ParamType::Boolean);
        assert_eq!(ParamType::from_declared("DECIMAL(10,2)"), ParamType::Float);
        assert_eq!(
            ParamType::from_declared("double precision"),
            ParamType::Float
        );
        assert_eq!(ParamType::from_declared("datetime"), ParamType::Timestamp);
        assert_eq!(ParamType::from_declared("jsonb"), ParamType::Any);
        assert_eq!(ParamType::from_declared(""), ParamType::Any);
    }

    #[test]
    fn list_type_display() {
        assert_eq!(ParamType::Integer.list().to_string(), "[]int");
        assert_eq!(ParamType::Timestamp.to_string(), "timestamp");
    }

    #[test]
    fn lookup_by_index_and_name() {
        let table = Table::new("users")
            .column("id", "BIGINT")
            .column("Email", "VARCHAR(64)");

        assert_eq!(table.by_index(1).map(|c| c.name.as_str()), Some("id"));
        assert!(table.by_index(0).is_none());
        assert!(table.by_index(3).is_none());
        assert_eq!(table.by_name("email").map(|c| c.name.as_str()), Some("Email"));
        assert!(table.by_name("name").is_none());
    }

    #[test]
    fn table_deserializes_from_json() {
        let table: Table = serde_json::from_str(
            r#"{"name":"users","columns":[{"name":"id","declared_type":"INT"}]}"#,
        )
        .unwrap();
        assert_eq!(table.columns[0].param_type(), ParamType::Integer);
    }
}
