//! Lightweight SQL text inspection. Not a parser: just enough to classify statements and
//! find the top-level `FROM` of a SELECT.

/// The type of SQL operation being performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryType {
    /// SELECT query (including `WITH ... SELECT`)
    Select,
    /// INSERT statement
    Insert,
    /// UPDATE statement
    Update,
    /// DELETE statement
    Delete,
    /// Other SQL (e.g., DDL, custom)
    Other,
}

impl QueryType {
    /// Detect query type from SQL string. `WITH` statements are classified by the statement
    /// that follows their CTE list.
    pub fn from_sql(sql: &str) -> Self {
        let trimmed = strip_sql_prefix(sql);
        if starts_with_keyword(trimmed, "WITH") {
            return find_top_level_keyword(trimmed, &["SELECT", "INSERT", "UPDATE", "DELETE"])
                .map_or(QueryType::Other, |at| Self::from_leading_keyword(&trimmed[at..]));
        }
        Self::from_leading_keyword(trimmed)
    }

    fn from_leading_keyword(s: &str) -> Self {
        if starts_with_keyword(s, "SELECT") {
            QueryType::Select
        } else if starts_with_keyword(s, "INSERT") {
            QueryType::Insert
        } else if starts_with_keyword(s, "UPDATE") {
            QueryType::Update
        } else if starts_with_keyword(s, "DELETE") {
            QueryType::Delete
        } else {
            QueryType::Other
        }
    }
}

/// Skip leading whitespace, comments and opening parentheses.
pub(crate) fn strip_sql_prefix(sql: &str) -> &str {
    let mut s = sql;
    loop {
        let before = s;
        s = s.trim_start();
        if s.starts_with("--") {
            match s.find('\n') {
                Some(pos) => {
                    s = &s[pos + 1..];
                    continue;
                }
                None => return "",
            }
        }
        if s.starts_with("/*") {
            match s.find("*/") {
                Some(pos) => {
                    s = &s[pos + 2..];
                    continue;
                }
                None => return "",
            }
        }
        if let Some(rest) = s.strip_prefix('(') {
            s = rest;
            continue;
        }
        if s == before {
            break;
        }
    }
    s
}

/// Case-insensitive keyword match at the start of `s`, followed by a word boundary.
pub(crate) fn starts_with_keyword(s: &str, keyword: &str) -> bool {
    match s.get(0..keyword.len()) {
        Some(prefix) => {
            prefix.eq_ignore_ascii_case(keyword)
                && !s[keyword.len()..]
                    .chars()
                    .next()
                    .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        None => false,
    }
}

/// Byte offset of the first `FROM` keyword outside parentheses, quotes and comments.
pub(crate) fn find_top_level_from(sql: &str) -> Option<usize> {
    find_top_level_keyword(sql, &["FROM"])
}

/// Number of `?` markers outside quotes and comments.
pub(crate) fn count_markers(sql: &str) -> usize {
    let mut markers = 0;
    scan_code(sql, |_, byte, _| {
        if byte == b'?' {
            markers += 1;
        }
        false
    });
    markers
}

fn find_top_level_keyword(sql: &str, keywords: &[&str]) -> Option<usize> {
    let bytes = sql.as_bytes();
    scan_code(sql, |i, byte, depth| {
        depth == 0
            && byte.is_ascii_alphabetic()
            && (i == 0 || !is_word_byte(bytes[i - 1]))
            && keywords.iter().any(|kw| starts_with_keyword(&sql[i..], kw))
    })
}

/// Walk the bytes of `sql` that are code (not quoted, not commented) along with their paren
/// depth, stopping at the first one `hit` accepts.
fn scan_code(sql: &str, mut hit: impl FnMut(usize, u8, usize) -> bool) -> Option<usize> {
    let bytes = sql.as_bytes();
    let mut depth = 0usize;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\'' | b'"' | b'`' => {
                let quote = bytes[i];
                i += 1;
                while i < bytes.len() && bytes[i] != quote {
                    i += 1;
                }
            }
            b'-' if bytes.get(i + 1) == Some(&b'-') => {
                while i < bytes.len() && bytes[i] != b'\n' {
                    i += 1;
                }
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                i += 2;
                while i + 1 < bytes.len() && !(bytes[i] == b'*' && bytes[i + 1] == b'/') {
                    i += 1;
                }
                i += 1;
            }
            b'(' => depth += 1,
            b')' => depth = depth.saturating_sub(1),
            byte => {
                if hit(i, byte, depth) {
                    return Some(i);
                }
            }
        }
        i += 1;
    }
    None
}

fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}
