use crate::error::ParseError;
use std::fmt;
use std::str::FromStr;

/// Comparison operators accepted after `field.`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
    In,
    Like,
    IsNull,
    IsNotNull,
}

impl Operator {
    pub const ALL: [Operator; 10] = [
        Operator::Eq,
        Operator::Ne,
        Operator::Lt,
        Operator::Gt,
        Operator::Le,
        Operator::Ge,
        Operator::In,
        Operator::Like,
        Operator::IsNull,
        Operator::IsNotNull,
    ];

    /// Keyword as written in condition strings.
    pub fn keyword(self) -> &'static str {
        match self {
            Operator::Eq => "EQ",
            Operator::Ne => "NE",
            Operator::Lt => "LT",
            Operator::Gt => "GT",
            Operator::Le => "LE",
            Operator::Ge => "GE",
            Operator::In => "IN",
            Operator::Like => "LIKE",
            Operator::IsNull => "ISNULL",
            Operator::IsNotNull => "ISNOTNULL",
        }
    }

    /// Whether the predicate binds a parameter.
    pub fn takes_param(self) -> bool {
        !matches!(self, Operator::IsNull | Operator::IsNotNull)
    }
}

impl FromStr for Operator {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Operator::ALL
            .into_iter()
            .find(|op| op.keyword().eq_ignore_ascii_case(s))
            .ok_or_else(|| ParseError::UnknownOperator(s.to_string()))
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operators_parse_case_insensitively() {
        assert_eq!("eq".parse::<Operator>().unwrap(), Operator::Eq);
        assert_eq!("IsNotNull".parse::<Operator>().unwrap(), Operator::IsNotNull);
        assert_eq!(" like ".parse::<Operator>().unwrap(), Operator::Like);
    }

    #[test]
    fn only_null_checks_bind_nothing() {
        let unbound: Vec<_> = Operator::ALL
            .into_iter()
            .filter(|op| !op.takes_param())
            .collect();
        assert_eq!(unbound, vec![Operator::IsNull, Operator::IsNotNull]);
    }

    #[test]
    fn unknown_operator_is_reported_verbatim() {
        assert_eq!(
            "BETWEEN".parse::<Operator>().unwrap_err(),
            ParseError::UnknownOperator("BETWEEN".to_string())
        );
    }
}
