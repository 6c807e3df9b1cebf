//! SQL assembly.
//!
//! [`SqlBuilder`] is the imperative API: callers that already evaluated their conditions
//! append fragments and values directly. [`build_sql`] walks a [`StatementNode`] sequence
//! against a [`Scope`] and drives the same builder.
//!
//! Conventions:
//! - fragments are joined with a single space
//! - a non-empty WHERE clause renders as `WHERE 1=1 AND a AND b`, so branches never need to
//!   know whether they come first
//! - a SET clause renders as `SET a, b`

use crate::error::{BuildError, BuildResult};
use crate::scope::Scope;
use crate::stmt::{BranchCond, Foreach, Stmt, StatementNode, has_placeholder_marker};
use crate::value::Value;

/// Final SQL text (with `?` markers) and its bound values, in order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BuiltSql {
    pub sql: String,
    pub args: Vec<Value>,
}

impl BuiltSql {
    pub fn new(sql: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            sql: sql.into(),
            args,
        }
    }
}

/// A rendered piece of SQL and the values it binds.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Fragment {
    pub text: String,
    pub args: Vec<Value>,
}

impl Fragment {
    pub fn new(text: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            text: text.into(),
            args,
        }
    }
}

/// Conditional members of a WHERE or SET clause.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Clause {
    fragments: Vec<Fragment>,
}

impl Clause {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, text: &str, args: Vec<Value>) -> &mut Self {
        if !text.trim().is_empty() {
            self.fragments.push(Fragment::new(text.trim(), args));
        }
        self
    }

    pub fn push_if(&mut self, cond: bool, text: &str, args: Vec<Value>) -> &mut Self {
        if cond {
            self.push(text, args);
        }
        self
    }

    /// Push the first fragment whose condition holds, else `otherwise`.
    pub fn push_choose(
        &mut self,
        branches: impl IntoIterator<Item = (bool, Fragment)>,
        otherwise: Option<Fragment>,
    ) -> &mut Self {
        let chosen = branches
            .into_iter()
            .find_map(|(cond, fragment)| cond.then_some(fragment))
            .or(otherwise);
        if let Some(fragment) = chosen {
            self.push(&fragment.text, fragment.args);
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }
}

/// Imperative SQL builder.
///
/// # Example
///
/// ```
/// use quarry::{Clause, SqlBuilder, Value};
///
/// let name: Option<&str> = Some("ann");
/// let min_age: Option<i64> = None;
///
/// let mut where_ = Clause::new();
/// where_
///     .push_if(name.is_some(), "name = ?", vec![name.into()])
///     .push_if(min_age.is_some(), "age >= ?", vec![min_age.into()]);
///
/// let mut b = SqlBuilder::new();
/// b.append("SELECT * FROM users", vec![]).append_where(where_);
/// let built = b.finish();
///
/// assert_eq!(built.sql, "SELECT * FROM users WHERE 1=1 AND name = ?");
/// assert_eq!(built.args, vec![Value::from("ann")]);
/// ```
#[must_use]
#[derive(Debug, Clone, Default)]
pub struct SqlBuilder {
    parts: Vec<String>,
    args: Vec<Value>,
}

impl SqlBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a fragment and its values. Empty text is skipped (its values are not).
    pub fn append(&mut self, text: &str, args: Vec<Value>) -> &mut Self {
        let text = text.trim();
        if !text.is_empty() {
            self.parts.push(text.to_string());
        }
        self.args.extend(args);
        self
    }

    pub fn append_if(&mut self, cond: bool, text: &str, args: Vec<Value>) -> &mut Self {
        if cond {
            self.append(text, args);
        }
        self
    }

    /// Append `WHERE 1=1 AND ...`; an empty clause appends nothing.
    pub fn append_where(&mut self, clause: Clause) -> &mut Self {
        if clause.is_empty() {
            return self;
        }

        let mut text = String::from("WHERE 1=1");
        for fragment in clause.fragments {
            text.push(' ');
            if !starts_with_connective(&fragment.text) {
                text.push_str("AND ");
            }
            text.push_str(&fragment.text);
            self.args.extend(fragment.args);
        }
        self.parts.push(text);
        self
    }

    /// Append `SET a, b`. An UPDATE without assignments is malformed, so an empty clause is
    /// an error.
    pub fn append_set(&mut self, clause: Clause) -> BuildResult<&mut Self> {
        if clause.is_empty() {
            return Err(BuildError::EmptySet);
        }

        let mut assignments = Vec::with_capacity(clause.fragments.len());
        for fragment in clause.fragments {
            assignments.push(fragment.text.trim_end_matches(',').trim_end().to_string());
            self.args.extend(fragment.args);
        }
        self.parts.push(format!("SET {}", assignments.join(", ")));
        Ok(self)
    }

    /// Append `open item sep item ... close`. No items appends nothing.
    pub fn append_loop(
        &mut self,
        open: &str,
        separator: &str,
        close: &str,
        items: Vec<Fragment>,
    ) -> &mut Self {
        if items.is_empty() {
            return self;
        }

        let mut text = String::from(open);
        for (i, item) in items.into_iter().enumerate() {
            if i > 0 {
                text.push_str(separator);
            }
            text.push_str(&item.text);
            self.args.extend(item.args);
        }
        text.push_str(close);
        self.append(&text, Vec::new())
    }

    /// SQL rendered so far.
    pub fn sql(&self) -> String {
        self.parts.join(" ")
    }

    pub fn args(&self) -> &[Value] {
        &self.args
    }

    pub fn finish(self) -> BuiltSql {
        BuiltSql {
            sql: self.parts.join(" "),
            args: self.args,
        }
    }
}

fn starts_with_connective(text: &str) -> bool {
    ["AND", "OR"].iter().any(|kw| {
        text.get(..kw.len())
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case(kw))
            && text[kw.len()..].starts_with(|c: char| c.is_whitespace() || c == '(')
    })
}

/// Render a statement sequence against `scope`.
///
/// # Example
///
/// ```
/// use quarry::{Scope, build_sql};
/// use quarry::stmt::{BranchCond, Guard, IfStmt, StatementNode};
///
/// let nodes = vec![
///     StatementNode::raw("UPDATE users"),
///     StatementNode::Set(BranchCond::IfChain(vec![
///         IfStmt::new(Guard::present("name"), "name = #{name}"),
///         IfStmt::new(Guard::present("email"), "email = #{email}"),
///     ])),
///     StatementNode::simple("WHERE id = #{id}"),
/// ];
/// let scope = Scope::new().bind("id", 7).bind("email", "a@b.c");
///
/// let built = build_sql(&nodes, &scope)?;
/// assert_eq!(built.sql, "UPDATE users SET email = ? WHERE id = ?");
/// assert_eq!(built.args.len(), 2);
/// # Ok::<(), quarry::BuildError>(())
/// ```
pub fn build_sql(nodes: &[StatementNode], scope: &Scope) -> BuildResult<BuiltSql> {
    let mut builder = SqlBuilder::new();
    for node in nodes {
        render_node(&mut builder, node, scope)?;
    }
    Ok(builder.finish())
}

fn render_node(b: &mut SqlBuilder, node: &StatementNode, scope: &Scope) -> BuildResult<()> {
    match node {
        StatementNode::Raw(text) => {
            if has_placeholder_marker(text) {
                return Err(BuildError::UnresolvedPlaceholder(text.clone()));
            }
            b.append(text, Vec::new());
        }
        StatementNode::Simple(stmt) => {
            let fragment = render_stmt(stmt, scope)?;
            b.append(&fragment.text, fragment.args);
        }
        StatementNode::If(branch) => {
            if branch.guard.eval(scope) {
                let fragment = render_stmt(&branch.stmt, scope)?;
                b.append(&fragment.text, fragment.args);
            }
        }
        StatementNode::IfChain(branches) => {
            for branch in branches.iter().filter(|br| br.guard.eval(scope)) {
                let fragment = render_stmt(&branch.stmt, scope)?;
                b.append(&fragment.text, fragment.args);
            }
        }
        StatementNode::Choose(choose) => {
            if let Some(stmt) = choose.select(scope) {
                let fragment = render_stmt(stmt, scope)?;
                b.append(&fragment.text, fragment.args);
            }
        }
        StatementNode::Where(cond) => {
            b.append_where(render_clause(cond, scope)?);
        }
        StatementNode::Set(cond) => {
            b.append_set(render_clause(cond, scope)?)?;
        }
        StatementNode::Foreach(each) => render_foreach(b, each, scope)?,
        StatementNode::Empty => {}
    }
    Ok(())
}

fn render_clause(cond: &BranchCond, scope: &Scope) -> BuildResult<Clause> {
    let mut clause = Clause::new();
    for stmt in cond.select(scope) {
        let fragment = render_stmt(stmt, scope)?;
        clause.push(&fragment.text, fragment.args);
    }
    Ok(clause)
}

fn check_text(text: &str) -> BuildResult<()> {
    if has_placeholder_marker(text) {
        return Err(BuildError::UnresolvedPlaceholder(text.to_string()));
    }
    Ok(())
}

fn render_stmt(stmt: &Stmt, scope: &Scope) -> BuildResult<Fragment> {
    check_text(stmt.text())?;
    let args = stmt
        .args()
        .iter()
        .map(|path| {
            scope
                .lookup(path)
                .cloned()
                .ok_or_else(|| BuildError::UnresolvedArgument(path.clone()))
        })
        .collect::<BuildResult<Vec<_>>>()?;
    Ok(Fragment::new(stmt.text(), args))
}

fn render_foreach(b: &mut SqlBuilder, each: &Foreach, scope: &Scope) -> BuildResult<()> {
    check_text(each.body.text())?;
    let collection = scope
        .lookup(&each.collection)
        .ok_or_else(|| BuildError::UnresolvedArgument(each.collection.clone()))?;
    let items = collection
        .as_list()
        .ok_or_else(|| BuildError::NotACollection(each.collection.clone()))?;
    if items.is_empty() {
        return Err(BuildError::EmptyCollection(each.collection.clone()));
    }

    let mut fragments = Vec::with_capacity(items.len());
    for item in items {
        let args = each
            .body
            .args()
            .iter()
            .map(|path| {
                resolve_item_path(path, &each.item, item)
                    .or_else(|| scope.lookup(path))
                    .cloned()
                    .ok_or_else(|| BuildError::UnresolvedArgument(path.clone()))
            })
            .collect::<BuildResult<Vec<_>>>()?;
        fragments.push(Fragment::new(each.body.text(), args));
    }

    b.append_loop(&each.open, &each.separator, &each.close, fragments);
    Ok(())
}

fn resolve_item_path<'a>(path: &str, item_name: &str, item: &'a Value) -> Option<&'a Value> {
    let path = path.trim();
    if path == item_name {
        return Some(item);
    }
    let rest = path.strip_prefix(item_name)?.strip_prefix('.')?;
    rest.split('.').try_fold(item, |value, segment| value.get(segment))
}
