//! quarry-cond
//!
//! A compact boolean language for WHERE conditions, resolved against a table description.
//!
//! # Syntax
//!
//! - `3`: column 3 (1-based) equals a parameter
//! - `email.LIKE`, `2.IN`, `deleted_at.ISNULL`: `<field>.<OPERATOR>`, field by index or name
//! - `a&b`: AND, `a|b`: OR (`&` binds tighter)
//! - `{a&b}|c`: one level of grouping; nested braces are rejected
//!
//! Operators: `EQ NE LT GT LE GE IN LIKE ISNULL ISNOTNULL`, case-insensitive.
//!
//! # Example
//!
//! ```
//! use quarry_cond::{parse_condition, ParamType, Table};
//!
//! let table = Table::new("users").column("id", "INT").column("name", "VARCHAR(32)");
//! let sql = parse_condition("1|name.LIKE", &table)?.to_sql();
//!
//! assert_eq!(sql.sql, "id = ? OR name LIKE ?");
//! assert_eq!(sql.param_types, vec![ParamType::Integer, ParamType::String]);
//! # Ok::<(), quarry_cond::ParseError>(())
//! ```

pub mod condition;
pub mod error;
pub mod operator;
pub mod parse;
pub mod table;

pub use condition::{Condition, ConditionSql, FieldRef, Predicate};
pub use error::{ParseError, ParseResult};
pub use operator::Operator;
pub use parse::parse_condition;
pub use table::{Column, ParamType, Table};

/// Parse and render in one step.
pub fn condition_to_sql(text: &str, table: &Table) -> ParseResult<ConditionSql> {
    parse_condition(text, table).map(|c| c.to_sql())
}
