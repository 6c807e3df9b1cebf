//! # quarry
//!
//! Data-access middleware: dynamic SQL built from statement fragments, executed through an
//! interceptor pipeline.
//!
//! ## Features
//!
//! - **Condition language**: `{1&age.LT}|email.LIKE` parsed against a table description
//!   (re-exported from `quarry-cond` as [`cond`])
//! - **Dynamic statements**: `#{expr}` placeholders, conditional WHERE/SET clauses, `choose`
//!   and `foreach` nodes, rendered to `?`-parameterized SQL by [`build_sql`]
//! - **Interceptor pipeline**: cache-aside with per-key single-flight, pagination with a
//!   COUNT companion query, SQL debug logging, slow-query reporting, user interceptors
//! - **Executor-agnostic**: anything implementing [`Executor`]; a `tokio-postgres` adapter is
//!   available behind the `postgres` feature
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use quarry::stmt::{BranchCond, Guard, IfStmt, StatementNode};
//! use quarry::{build_sql, Engine, ExecOption, Executor, Page, Scope, SqlDebugInterceptor};
//!
//! # async fn demo(executor: Arc<dyn Executor>) -> quarry::ExecResult<()> {
//! let engine = Engine::builder()
//!     .with_pagination()
//!     .with_sql_debug(SqlDebugInterceptor::new())
//!     .build();
//!
//! let nodes = [
//!     StatementNode::raw("SELECT id, name FROM users"),
//!     StatementNode::Where(BranchCond::IfChain(vec![
//!         IfStmt::new(Guard::present("name"), "name LIKE #{name}"),
//!         IfStmt::new(Guard::present("min_age"), "age >= #{min_age}"),
//!     ])),
//! ];
//! let scope = Scope::new().bind("name", "a%");
//! let page = Arc::new(Page::new(1, 20).desc("id"));
//!
//! let option = ExecOption::new(executor, build_sql(&nodes, &scope)?).with_page(page.clone());
//! let rows = engine.query(option).await?;
//! println!("{} of {} rows", rows.len(), page.total_count());
//! # Ok(()) }
//! ```

pub mod builder;
pub mod cache;
pub mod chain;
pub mod config;
pub mod engine;
pub mod error;
pub mod exec;
pub mod ident;
pub mod interceptor;
pub mod page;
pub mod row;
pub mod scope;
pub mod sql;
pub mod stmt;
pub mod transaction;
pub mod value;

#[cfg(feature = "postgres")]
pub mod postgres;

pub use quarry_cond as cond;
pub use quarry_cond::{ParseError, Table, parse_condition};

pub use builder::{BuiltSql, Clause, Fragment, SqlBuilder, build_sql};
pub use chain::{FnInterceptor, Handler, Interceptor, Next, Reply};
pub use config::EngineConfig;
pub use engine::{Engine, EngineBuilder};
pub use error::{BuildError, BuildResult, Error, ExecResult};
pub use exec::{ExecContext, ExecOption, Executor};
pub use ident::validate_identifier;
pub use interceptor::{PaginationInterceptor, SlowQueryInterceptor, SqlDebugInterceptor};
pub use page::{OrderItem, Page};
pub use row::{FromRow, FromValue, Row};
pub use scope::Scope;
pub use sql::QueryType;
pub use stmt::resolve_template;
pub use transaction::{Transaction, TransactionManager, transactional};
pub use value::Value;
