//! The parsed condition tree and its SQL rendering.

use crate::operator::Operator;
use crate::table::{Column, ParamType};
use std::fmt;

/// How a predicate named its column in the source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldRef {
    /// 1-based column position.
    Index(usize),
    /// Column name as written (matched case-insensitively).
    Name(String),
}

impl fmt::Display for FieldRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldRef::Index(i) => write!(f, "{i}"),
            FieldRef::Name(n) => f.write_str(n),
        }
    }
}

/// A single `field.OP` unit, already resolved against the table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Predicate {
    pub field: FieldRef,
    pub column: Column,
    pub op: Operator,
}

/// Boolean tree produced by [`crate::parse_condition`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    Simple(Predicate),
    And(Box<Condition>, Box<Condition>),
    Or(Box<Condition>, Box<Condition>),
    /// A `{...}` group. Logically the inner tree; rendered in parentheses.
    Group(Box<Condition>),
}

/// Rendered WHERE fragment plus the types of its `?` parameters, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConditionSql {
    pub sql: String,
    pub param_types: Vec<ParamType>,
}

impl Condition {
    /// Render the condition as SQL with `?` placeholders.
    pub fn to_sql(&self) -> ConditionSql {
        let mut out = ConditionSql {
            sql: String::new(),
            param_types: Vec::new(),
        };
        self.write_sql(&mut out);
        out
    }

    /// The condition beneath any outer group markers.
    pub fn ungrouped(&self) -> &Condition {
        match self {
            Condition::Group(inner) => inner.ungrouped(),
            other => other,
        }
    }

    /// Visit every predicate left to right.
    pub fn predicates(&self) -> Vec<&Predicate> {
        let mut out = Vec::new();
        self.collect_predicates(&mut out);
        out
    }

    fn collect_predicates<'a>(&'a self, out: &mut Vec<&'a Predicate>) {
        match self {
            Condition::Simple(p) => out.push(p),
            Condition::And(l, r) | Condition::Or(l, r) => {
                l.collect_predicates(out);
                r.collect_predicates(out);
            }
            Condition::Group(inner) => inner.collect_predicates(out),
        }
    }

    fn write_sql(&self, out: &mut ConditionSql) {
        match self {
            Condition::Simple(p) => p.write_sql(out),
            Condition::And(l, r) => {
                l.write_sql(out);
                out.sql.push_str(" AND ");
                r.write_sql(out);
            }
            Condition::Or(l, r) => {
                l.write_sql(out);
                out.sql.push_str(" OR ");
                r.write_sql(out);
            }
            Condition::Group(inner) => {
                out.sql.push('(');
                inner.write_sql(out);
                out.sql.push(')');
            }
        }
    }
}

impl Predicate {
    fn write_sql(&self, out: &mut ConditionSql) {
        let col = &self.column.name;
        let ty = self.column.param_type();
        let fragment = match self.op {
            Operator::Eq => format!("{col} = ?"),
            Operator::Ne => format!("{col} != ?"),
            Operator::Lt => format!("{col} < ?"),
            Operator::Gt => format!("{col} > ?"),
            Operator::Le => format!("{col} <= ?"),
            Operator::Ge => format!("{col} >= ?"),
            Operator::In => format!("{col} IN (?)"),
            Operator::Like => format!("{col} LIKE ?"),
            Operator::IsNull => format!("{col} IS NULL"),
            Operator::IsNotNull => format!("{col} IS NOT NULL"),
        };
        out.sql.push_str(&fragment);
        if self.op.takes_param() {
            out.param_types.push(match self.op {
                Operator::In => ty.list(),
                Operator::Like => ParamType::String,
                _ => ty,
            });
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::Simple(p) => write!(f, "{}.{}", p.field, p.op),
            Condition::And(l, r) => write!(f, "{l}&{r}"),
            Condition::Or(l, r) => write!(f, "{l}|{r}"),
            Condition::Group(inner) => write!(f, "{{{inner}}}"),
        }
    }
}
