//! The executor capability and the per-call execution record.

use crate::builder::BuiltSql;
use crate::chain::Interceptor;
use crate::error::ExecResult;
use crate::page::Page;
use crate::row::Row;
use crate::value::Value;
use futures_util::future::BoxFuture;
use std::any::Any;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Something that runs SQL with `?` parameters: a connection, a pool, a transaction.
///
/// Methods return boxed futures so executors can be shared as `Arc<dyn Executor>`.
pub trait Executor: Send + Sync {
    /// Execute a statement, returning the affected row count.
    fn execute<'a>(&'a self, sql: &'a str, args: &'a [Value]) -> BoxFuture<'a, ExecResult<u64>>;

    /// Run a query and collect all rows.
    fn query<'a>(&'a self, sql: &'a str, args: &'a [Value])
    -> BoxFuture<'a, ExecResult<Vec<Row>>>;

    /// Run a query expecting at most one row.
    fn query_row<'a>(
        &'a self,
        sql: &'a str,
        args: &'a [Value],
    ) -> BoxFuture<'a, ExecResult<Option<Row>>> {
        Box::pin(async move { Ok(self.query(sql, args).await?.into_iter().next()) })
    }
}

impl<E: Executor + ?Sized> Executor for Arc<E> {
    fn execute<'a>(&'a self, sql: &'a str, args: &'a [Value]) -> BoxFuture<'a, ExecResult<u64>> {
        (**self).execute(sql, args)
    }

    fn query<'a>(
        &'a self,
        sql: &'a str,
        args: &'a [Value],
    ) -> BoxFuture<'a, ExecResult<Vec<Row>>> {
        (**self).query(sql, args)
    }

    fn query_row<'a>(
        &'a self,
        sql: &'a str,
        args: &'a [Value],
    ) -> BoxFuture<'a, ExecResult<Option<Row>>> {
        (**self).query_row(sql, args)
    }
}

/// Per-call additions to the engine's pipeline.
#[derive(Clone, Default)]
pub struct ExecContext {
    pub(crate) cache: Option<Arc<dyn Interceptor>>,
    pub(crate) interceptors: Vec<Arc<dyn Interceptor>>,
    pub(crate) timeout: Option<Duration>,
}

impl ExecContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `interceptor` for this call only, after the engine's own user interceptors.
    pub fn with_interceptor(mut self, interceptor: impl Interceptor + 'static) -> Self {
        self.interceptors.push(Arc::new(interceptor));
        self
    }

    pub fn with_interceptor_arc(mut self, interceptor: Arc<dyn Interceptor>) -> Self {
        self.interceptors.push(interceptor);
        self
    }

    /// Bound the whole call (all interceptors and the terminal handler).
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Attach a cache interceptor; it runs first. See [`crate::cache`].
    pub fn with_cache(mut self, cache: Arc<dyn Interceptor>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn has_cache(&self) -> bool {
        self.cache.is_some()
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }
}

impl fmt::Debug for ExecContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecContext")
            .field("cache", &self.cache.is_some())
            .field("interceptors", &self.interceptors.len())
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Everything one execution needs. Interceptors may rewrite `sql` and `args`.
#[derive(Clone)]
pub struct ExecOption {
    pub sql: String,
    pub args: Vec<Value>,
    pub executor: Arc<dyn Executor>,
    /// Opaque per-call data, e.g. a [`Page`].
    pub extension: Option<Arc<dyn Any + Send + Sync>>,
    pub context: ExecContext,
}

impl ExecOption {
    pub fn new(executor: Arc<dyn Executor>, built: BuiltSql) -> Self {
        Self {
            sql: built.sql,
            args: built.args,
            executor,
            extension: None,
            context: ExecContext::default(),
        }
    }

    /// Paginate this call; the caller keeps its `Arc` to read the totals afterwards.
    pub fn with_page(mut self, page: Arc<Page>) -> Self {
        self.extension = Some(page);
        self
    }

    pub fn with_extension(mut self, extension: Arc<dyn Any + Send + Sync>) -> Self {
        self.extension = Some(extension);
        self
    }

    pub fn with_context(mut self, context: ExecContext) -> Self {
        self.context = context;
        self
    }

    /// The extension, if it has type `E`.
    pub fn extension<E: Any>(&self) -> Option<&E> {
        self.extension.as_deref()?.downcast_ref::<E>()
    }

    pub fn page(&self) -> Option<&Page> {
        self.extension::<Page>()
    }
}

impl fmt::Debug for ExecOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecOption")
            .field("sql", &self.sql)
            .field("args", &self.args)
            .field("extension", &self.extension.is_some())
            .field("context", &self.context)
            .finish_non_exhaustive()
    }
}
