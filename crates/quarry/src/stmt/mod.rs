//! Dynamic SQL statement model.
//!
//! A data-access call is described as a sequence of [`StatementNode`]s. Text inside a node is
//! stored with its `#{expr}` placeholders already replaced by `?`; the expressions are kept
//! alongside and resolved against a [`Scope`] when the sequence is built (see
//! [`crate::build_sql`]).
//!
//! ```
//! use quarry::stmt::{BranchCond, Guard, IfStmt, StatementNode};
//!
//! let nodes = vec![
//!     StatementNode::raw("SELECT id, name FROM users"),
//!     StatementNode::Where(BranchCond::IfChain(vec![
//!         IfStmt::new(Guard::present("name"), "name = #{name}"),
//!         IfStmt::new(Guard::truthy("active"), "active = true"),
//!     ])),
//! ];
//! # let _ = nodes;
//! ```

mod placeholder;

pub use placeholder::{extract_placeholders, resolve_template};

pub(crate) use placeholder::has_placeholder_marker;

use crate::scope::Scope;

/// Parameterized text with its `#{}` placeholders extracted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Stmt {
    text: String,
    args: Vec<String>,
}

impl Stmt {
    /// Extract placeholders from `template`.
    pub fn new(template: &str) -> Self {
        let (text, args) = extract_placeholders(template);
        Self { text, args }
    }

    /// Text that already uses `?`, with its argument expressions.
    ///
    /// Placeholders left in `text` are reported when the statement is built.
    pub fn prepared(text: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            text: text.into(),
            args,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }
}

impl From<&str> for Stmt {
    fn from(template: &str) -> Self {
        Stmt::new(template)
    }
}

/// Runtime condition deciding whether a branch renders.
#[derive(Debug, Clone, PartialEq)]
pub enum Guard {
    Const(bool),
    /// The path resolves to a truthy value (see [`crate::Value::is_truthy`]).
    Truthy(String),
    /// The path resolves to a non-null value.
    Present(String),
    Not(Box<Guard>),
    All(Vec<Guard>),
    Any(Vec<Guard>),
}

impl Guard {
    pub fn truthy(path: impl Into<String>) -> Self {
        Guard::Truthy(path.into())
    }

    pub fn present(path: impl Into<String>) -> Self {
        Guard::Present(path.into())
    }

    /// Evaluate against `scope`; missing paths count as null.
    pub fn eval(&self, scope: &Scope) -> bool {
        match self {
            Guard::Const(b) => *b,
            Guard::Truthy(path) => scope.lookup(path).is_some_and(|v| v.is_truthy()),
            Guard::Present(path) => scope.lookup(path).is_some_and(|v| !v.is_null()),
            Guard::Not(inner) => !inner.eval(scope),
            Guard::All(guards) => guards.iter().all(|g| g.eval(scope)),
            Guard::Any(guards) => guards.iter().any(|g| g.eval(scope)),
        }
    }
}

impl std::ops::Not for Guard {
    type Output = Guard;

    fn not(self) -> Guard {
        Guard::Not(Box::new(self))
    }
}

impl From<bool> for Guard {
    fn from(b: bool) -> Self {
        Guard::Const(b)
    }
}

/// A guarded statement.
#[derive(Debug, Clone, PartialEq)]
pub struct IfStmt {
    pub guard: Guard,
    pub stmt: Stmt,
}

impl IfStmt {
    pub fn new(guard: impl Into<Guard>, template: &str) -> Self {
        Self {
            guard: guard.into(),
            stmt: Stmt::new(template),
        }
    }
}

/// First-match branch selection with an optional fallback.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Choose {
    pub whens: Vec<IfStmt>,
    pub otherwise: Option<Stmt>,
}

impl Choose {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn when(mut self, guard: impl Into<Guard>, template: &str) -> Self {
        self.whens.push(IfStmt::new(guard, template));
        self
    }

    pub fn otherwise(mut self, template: &str) -> Self {
        self.otherwise = Some(Stmt::new(template));
        self
    }

    /// The statement that renders for `scope`, if any.
    pub fn select(&self, scope: &Scope) -> Option<&Stmt> {
        self.whens
            .iter()
            .find(|w| w.guard.eval(scope))
            .map(|w| &w.stmt)
            .or(self.otherwise.as_ref())
            .filter(|s| !s.is_empty())
    }
}

/// One rendering of `body` per collection item.
///
/// Inside `body`, `#{item}` / `#{item.field}` refer to the current element (with `item`
/// being whatever name was configured); other paths resolve against the outer scope.
#[derive(Debug, Clone, PartialEq)]
pub struct Foreach {
    pub collection: String,
    pub item: String,
    pub separator: String,
    pub open: String,
    pub close: String,
    pub body: Stmt,
}

impl Foreach {
    pub fn new(collection: impl Into<String>, item: impl Into<String>, body: &str) -> Self {
        Self {
            collection: collection.into(),
            item: item.into(),
            separator: String::new(),
            open: String::new(),
            close: String::new(),
            body: Stmt::new(body),
        }
    }

    pub fn separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }

    pub fn open(mut self, open: impl Into<String>) -> Self {
        self.open = open.into();
        self
    }

    pub fn close(mut self, close: impl Into<String>) -> Self {
        self.close = close.into();
        self
    }
}

/// Conditional content of a `Where` / `Set` wrapper.
#[derive(Debug, Clone, PartialEq)]
pub enum BranchCond {
    If(IfStmt),
    /// Every true branch, in order.
    IfChain(Vec<IfStmt>),
    Choose(Choose),
}

impl BranchCond {
    /// Statements that render for `scope`, in order.
    pub fn select<'a>(&'a self, scope: &Scope) -> Vec<&'a Stmt> {
        match self {
            BranchCond::If(branch) => branch
                .guard
                .eval(scope)
                .then_some(&branch.stmt)
                .into_iter()
                .collect(),
            BranchCond::IfChain(branches) => branches
                .iter()
                .filter(|b| b.guard.eval(scope))
                .map(|b| &b.stmt)
                .collect(),
            BranchCond::Choose(choose) => choose.select(scope).into_iter().collect(),
        }
    }
}

/// One unit of a dynamic statement sequence.
#[derive(Debug, Clone, PartialEq)]
pub enum StatementNode {
    /// Emitted verbatim; must not contain placeholders.
    Raw(String),
    Simple(Stmt),
    /// Prefixed with `WHERE 1=1`, branches ANDed.
    Where(BranchCond),
    /// Prefixed with `SET`, branches comma-joined.
    Set(BranchCond),
    If(IfStmt),
    IfChain(Vec<IfStmt>),
    Choose(Choose),
    Foreach(Foreach),
    Empty,
}

impl StatementNode {
    pub fn raw(text: impl Into<String>) -> Self {
        StatementNode::Raw(text.into())
    }

    pub fn simple(template: &str) -> Self {
        StatementNode::Simple(Stmt::new(template))
    }

    pub fn when(guard: impl Into<Guard>, template: &str) -> Self {
        StatementNode::If(IfStmt::new(guard, template))
    }
}

#[cfg(test)]
mod tests;
