//! Identifier checks for SQL spliced in as text (ORDER BY columns).
//!
//! Accepted forms, per dotted part:
//! - unquoted: `[A-Za-z_][A-Za-z0-9_$]*`
//! - quoted: `"..."` with `""` as the escape for `"`, no NUL

use crate::error::{Error, ExecResult};

/// Validate `s` as a possibly dotted, possibly quoted SQL identifier.
pub fn validate_identifier(s: &str) -> ExecResult<()> {
    if s.is_empty() {
        return Err(Error::validation("Identifier cannot be empty"));
    }
    if s.contains('\0') {
        return Err(Error::validation("Identifier cannot contain NUL character"));
    }

    let mut rest = s;
    loop {
        rest = if let Some(quoted) = rest.strip_prefix('"') {
            skip_quoted(quoted)?
        } else {
            skip_unquoted(rest)?
        };

        match rest.strip_prefix('.') {
            Some("") => return Err(Error::validation("Trailing '.' in identifier")),
            Some(next) => rest = next,
            None if rest.is_empty() => return Ok(()),
            None => {
                let c = rest.chars().next().unwrap_or_default();
                return Err(Error::validation(format!(
                    "Invalid character in identifier: '{c}'"
                )));
            }
        }
    }
}

fn skip_quoted(s: &str) -> ExecResult<&str> {
    let mut chars = s.char_indices().peekable();
    let mut len = 0usize;
    while let Some((i, c)) = chars.next() {
        if c != '"' {
            len += 1;
            continue;
        }
        if matches!(chars.peek(), Some((_, '"'))) {
            chars.next();
            len += 1;
            continue;
        }
        if len == 0 {
            return Err(Error::validation("Empty quoted identifier"));
        }
        return Ok(&s[i + 1..]);
    }
    Err(Error::validation("Unclosed quoted identifier"))
}

fn skip_unquoted(s: &str) -> ExecResult<&str> {
    let end = s
        .char_indices()
        .find(|&(i, c)| {
            let ok = if i == 0 {
                c == '_' || c.is_ascii_alphabetic()
            } else {
                c == '_' || c == '$' || c.is_ascii_alphanumeric()
            };
            !ok
        })
        .map_or(s.len(), |(i, _)| i);

    if end == 0 {
        return match s.chars().next() {
            None | Some('.') => Err(Error::validation("Empty identifier segment")),
            Some(c) => Err(Error::validation(format!(
                "Invalid identifier start character: '{c}'"
            ))),
        };
    }
    Ok(&s[end..])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_dotted_and_quoted() {
        for ok in [
            "users",
            "u.created_at",
            "public.users.id",
            r#""CamelCase""#,
            r#""has""quote""#,
            r#"public."UserTable".id"#,
            "my_var$1",
        ] {
            assert!(validate_identifier(ok).is_ok(), "{ok}");
        }
    }

    #[test]
    fn rejects_injection_shaped_input() {
        for bad in [
            "",
            "1table",
            "my table",
            "id; DROP TABLE users",
            "id DESC",
            "schema..table",
            "schema.",
            r#""unclosed"#,
            r#""""#,
        ] {
            assert!(validate_identifier(bad).is_err(), "{bad}");
        }
    }
}
