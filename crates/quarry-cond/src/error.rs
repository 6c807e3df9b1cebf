//! Error types for quarry-cond

use thiserror::Error;

/// Result type for condition parsing.
pub type ParseResult<T> = Result<T, ParseError>;

/// Reasons a condition string is rejected.
///
/// Every variant is a caller error in the condition text; none of them is worth retrying.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// `{` and `}` do not pair up.
    #[error("unbalanced braces in condition '{0}'")]
    UnbalancedBraces(String),

    /// A group was opened inside another group.
    #[error(
        "nested braces are not supported in condition '{0}'; \
         flatten it into a disjunction of conjunctions, e.g. {{1&2}}|{{1&3}}"
    )]
    NestedBraces(String),

    /// An operand of `&` / `|` or a group body is empty.
    #[error("empty expression in condition '{0}'")]
    EmptyExpression(String),

    /// A non-numeric unit without the `.OPERATOR` suffix.
    #[error("missing operator in '{0}', expected <field>.<OPERATOR>")]
    MissingOperator(String),

    /// The suffix after `.` is not a known operator.
    #[error("unknown operator '{0}'")]
    UnknownOperator(String),

    /// A 1-based column index outside `[1, columns]`.
    #[error("column index {index} out of range, table has {columns} columns")]
    IndexOutOfRange { index: usize, columns: usize },

    /// A column name that is not part of the table.
    #[error("unknown field '{0}'")]
    UnknownField(String),
}

impl ParseError {
    /// Check if the error is about brace structure rather than a single unit.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            Self::UnbalancedBraces(_) | Self::NestedBraces(_) | Self::EmptyExpression(_)
        )
    }
}
