//! Recursive-descent parsing of condition strings.
//!
//! Precedence, lowest first: `|`, `&`, `{...}`, simple unit. Only one level of braces is
//! accepted; anything deeper is rejected before parsing starts.

use crate::condition::{Condition, FieldRef, Predicate};
use crate::error::{ParseError, ParseResult};
use crate::operator::Operator;
use crate::table::Table;

/// Parse `text` into a [`Condition`] resolved against `table`.
///
/// ```
/// use quarry_cond::{parse_condition, Table};
///
/// let table = Table::new("users")
///     .column("status", "ENUM('on','off')")
///     .column("email", "VARCHAR(64)")
///     .column("age", "TINYINT");
///
/// let cond = parse_condition("{1&status.GT}|age.LT", &table)?;
/// assert_eq!(cond.to_sql().sql, "(status = ? AND status > ?) OR age < ?");
/// # Ok::<(), quarry_cond::ParseError>(())
/// ```
pub fn parse_condition(text: &str, table: &Table) -> ParseResult<Condition> {
    check_braces(text)?;
    Parser { source: text, table }.parse(text)
}

fn check_braces(text: &str) -> ParseResult<()> {
    let mut depth: i32 = 0;
    for c in text.chars() {
        match c {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth < 0 {
                    return Err(ParseError::UnbalancedBraces(text.to_string()));
                }
            }
            _ => {}
        }
    }
    if depth != 0 {
        return Err(ParseError::UnbalancedBraces(text.to_string()));
    }

    for c in text.chars() {
        match c {
            '{' => {
                depth += 1;
                if depth > 1 {
                    return Err(ParseError::NestedBraces(text.to_string()));
                }
            }
            '}' => depth -= 1,
            _ => {}
        }
    }
    Ok(())
}

/// Byte offset of the first `sep` outside any brace group.
fn split_top_level(text: &str, sep: char) -> Option<(&str, &str)> {
    let mut depth = 0usize;
    for (i, c) in text.char_indices() {
        match c {
            '{' => depth += 1,
            '}' => depth = depth.saturating_sub(1),
            c if c == sep && depth == 0 => {
                return Some((&text[..i], &text[i + c.len_utf8()..]));
            }
            _ => {}
        }
    }
    None
}

struct Parser<'a> {
    source: &'a str,
    table: &'a Table,
}

impl Parser<'_> {
    fn parse(&self, text: &str) -> ParseResult<Condition> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ParseError::EmptyExpression(self.source.to_string()));
        }

        if let Some((left, right)) = split_top_level(text, '|') {
            return Ok(Condition::Or(
                Box::new(self.parse(left)?),
                Box::new(self.parse(right)?),
            ));
        }
        if let Some((left, right)) = split_top_level(text, '&') {
            return Ok(Condition::And(
                Box::new(self.parse(left)?),
                Box::new(self.parse(right)?),
            ));
        }
        if let Some(inner) = single_group(text) {
            return Ok(Condition::Group(Box::new(self.parse(inner)?)));
        }

        self.parse_unit(text).map(Condition::Simple)
    }

    fn parse_unit(&self, unit: &str) -> ParseResult<Predicate> {
        if is_index(unit) {
            let field = FieldRef::Index(parse_index(unit));
            return self.resolve(field, Operator::Eq);
        }

        let Some((field, op)) = unit.rsplit_once('.') else {
            return Err(ParseError::MissingOperator(unit.to_string()));
        };
        let field = field.trim();
        if field.is_empty() {
            return Err(ParseError::EmptyExpression(self.source.to_string()));
        }
        let op: Operator = op.parse()?;

        let field = if is_index(field) {
            FieldRef::Index(parse_index(field))
        } else {
            FieldRef::Name(field.to_string())
        };
        self.resolve(field, op)
    }

    fn resolve(&self, field: FieldRef, op: Operator) -> ParseResult<Predicate> {
        let column = match &field {
            FieldRef::Index(index) => {
                self.table
                    .by_index(*index)
                    .ok_or(ParseError::IndexOutOfRange {
                        index: *index,
                        columns: self.table.columns.len(),
                    })?
            }
            FieldRef::Name(name) => self
                .table
                .by_name(name)
                .ok_or_else(|| ParseError::UnknownField(name.clone()))?,
        };
        Ok(Predicate {
            field,
            column: column.clone(),
            op,
        })
    }
}

/// `{...}` spanning the whole text, returning the body.
fn single_group(text: &str) -> Option<&str> {
    let body = text.strip_prefix('{')?.strip_suffix('}')?;
    (!body.contains('{') && !body.contains('}')).then_some(body)
}

fn is_index(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

fn parse_index(s: &str) -> usize {
    // Overflowing indices are out of range anyway.
    s.parse().unwrap_or(usize::MAX)
}
