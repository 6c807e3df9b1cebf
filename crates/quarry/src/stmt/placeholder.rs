//! `#{expr}` placeholder handling.

use crate::error::{BuildError, BuildResult};
use crate::scope::Scope;
use regex::Regex;
use std::fmt::Write as _;
use std::sync::OnceLock;

fn placeholder_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"#\{([^}]*)\}").expect("invalid built-in placeholder regex"))
}

/// Replace every `#{expr}` with `?`, returning the rewritten text and the expressions in order.
///
/// Idempotent: output without `#{...}` tokens comes back unchanged with no expressions.
///
/// ```
/// use quarry::stmt::extract_placeholders;
///
/// let (sql, args) = extract_placeholders("a = #{x.Y} AND b = #{z}");
/// assert_eq!(sql, "a = ? AND b = ?");
/// assert_eq!(args, ["x.Y", "z"]);
/// ```
pub fn extract_placeholders(text: &str) -> (String, Vec<String>) {
    let re = placeholder_re();
    let mut args = Vec::new();
    let rewritten = re.replace_all(text, |caps: &regex::Captures<'_>| {
        args.push(caps[1].trim().to_string());
        "?"
    });
    (rewritten.into_owned(), args)
}

/// Substitute each `#{expr}` with the textual value it resolves to, e.g. for cache keys.
///
/// ```
/// use quarry::{BuildError, Scope, resolve_template};
///
/// let scope = Scope::new().bind("id", 42);
/// assert_eq!(resolve_template("user:#{id}", &scope)?, "user:42");
/// assert_eq!(
///     resolve_template("user:#{uid}", &scope),
///     Err(BuildError::UnresolvedArgument("uid".into()))
/// );
/// # Ok::<(), BuildError>(())
/// ```
pub fn resolve_template(template: &str, scope: &Scope) -> BuildResult<String> {
    let mut out = String::with_capacity(template.len());
    let mut last = 0;
    for caps in placeholder_re().captures_iter(template) {
        let (Some(whole), Some(expr)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let path = expr.as_str().trim();
        let value = scope
            .lookup(path)
            .ok_or_else(|| BuildError::UnresolvedArgument(path.to_string()))?;
        out.push_str(&template[last..whole.start()]);
        let _ = write!(out, "{value}");
        last = whole.end();
    }
    out.push_str(&template[last..]);
    Ok(out)
}

/// Whether `text` still carries a `#{` marker.
pub(crate) fn has_placeholder_marker(text: &str) -> bool {
    text.contains("#{")
}
