//! The execution engine: a fixed interceptor pipeline in front of a terminal handler.
//!
//! Every call runs through, in order:
//!
//! 1. the cache interceptor attached to the call's [`ExecContext`], if any
//! 2. pagination
//! 3. SQL debug logging
//! 4. the engine's own interceptors, in registration order
//! 5. the call's extra interceptors
//! 6. slow-query logging
//! 7. the terminal handler
//!
//! Slots that are not configured are skipped. An [`Engine`] is immutable once built and is
//! meant to be shared by reference (or `Arc`) across tasks.

use crate::chain::{self, Interceptor, Next};
use crate::config::EngineConfig;
use crate::error::{Error, ExecResult};
use crate::exec::ExecOption;
use crate::interceptor::{PaginationInterceptor, SlowQueryInterceptor, SqlDebugInterceptor};
use crate::row::{FromRow, Row};
use std::fmt;
use std::future::Future;
use std::sync::Arc;

#[derive(Clone, Default)]
pub struct Engine {
    pagination: Option<Arc<dyn Interceptor>>,
    sql_debug: Option<Arc<dyn Interceptor>>,
    interceptors: Vec<Arc<dyn Interceptor>>,
    slow_query: Option<Arc<dyn Interceptor>>,
}

impl Engine {
    /// An engine with no interceptors: calls go straight to the terminal handler.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    /// Build an engine from a validated [`EngineConfig`].
    pub fn from_config(config: &EngineConfig) -> ExecResult<Self> {
        config.validate()?;

        let mut builder = Self::builder();
        if config.pagination {
            builder = builder.with_pagination();
        }
        if let Some(debug) = &config.sql_debug {
            let mut interceptor = SqlDebugInterceptor::new().level(debug.tracing_level()?);
            if let Some(max) = debug.max_sql_length {
                interceptor = interceptor.max_sql_length(max);
            }
            builder = builder.with_sql_debug(interceptor);
        }
        if let Some(slow) = &config.slow_query {
            builder = builder.with_slow_query_log(SlowQueryInterceptor::new(slow.threshold()));
        }
        Ok(builder.build())
    }

    /// Run `terminal` behind the pipeline.
    ///
    /// For a call with a cache attached, `terminal` must return `Option<V>` where `V` is the
    /// cached type.
    pub async fn invoke<T, F, Fut>(&self, option: ExecOption, terminal: F) -> ExecResult<T>
    where
        T: Send + 'static,
        F: Fn(ExecOption) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ExecResult<T>> + Send + 'static,
    {
        let timeout = option.context.timeout();
        let chain = self.chain_for(&option);

        let call = async move {
            if chain.is_empty() {
                return terminal(option).await;
            }
            Next::new(chain, chain::terminal(terminal))
                .run(option)
                .await?
                .downcast::<T>()
        };

        match timeout {
            Some(limit) => tokio::time::timeout(limit, call)
                .await
                .map_err(|_| Error::Timeout(limit))?,
            None => call.await,
        }
    }

    fn chain_for(&self, option: &ExecOption) -> Vec<Arc<dyn Interceptor>> {
        let context = &option.context;
        context
            .cache
            .iter()
            .chain(&self.pagination)
            .chain(&self.sql_debug)
            .chain(&self.interceptors)
            .chain(&context.interceptors)
            .chain(&self.slow_query)
            .cloned()
            .collect()
    }

    /// Execute a statement, returning the affected row count.
    pub async fn execute(&self, option: ExecOption) -> ExecResult<u64> {
        self.invoke(option, |option: ExecOption| async move {
            option.executor.execute(&option.sql, &option.args).await
        })
        .await
    }

    /// Run a query and return its raw rows.
    pub async fn query(&self, option: ExecOption) -> ExecResult<Vec<Row>> {
        self.invoke(option, |option: ExecOption| async move {
            option.executor.query(&option.sql, &option.args).await
        })
        .await
    }

    /// Run a query and map every row.
    pub async fn fetch_all<T>(&self, option: ExecOption) -> ExecResult<Vec<T>>
    where
        T: FromRow + Send + 'static,
    {
        self.invoke(option, |option: ExecOption| async move {
            option
                .executor
                .query(&option.sql, &option.args)
                .await?
                .iter()
                .map(T::from_row)
                .collect::<ExecResult<Vec<T>>>()
        })
        .await
    }

    /// Run a query and map its first row, if any. Usable with a cacheable context.
    pub async fn fetch_optional<T>(&self, option: ExecOption) -> ExecResult<Option<T>>
    where
        T: FromRow + Send + 'static,
    {
        self.invoke(option, |option: ExecOption| async move {
            option
                .executor
                .query_row(&option.sql, &option.args)
                .await?
                .as_ref()
                .map(T::from_row)
                .transpose()
        })
        .await
    }
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("pagination", &self.pagination.is_some())
            .field("sql_debug", &self.sql_debug.is_some())
            .field("interceptors", &self.interceptors.len())
            .field("slow_query", &self.slow_query.is_some())
            .finish()
    }
}

#[derive(Clone, Default)]
enum PaginationSlot {
    #[default]
    Off,
    Builtin,
    Custom(Arc<dyn Interceptor>),
}

/// Configures an [`Engine`]. Setting a slot twice keeps the last value.
#[derive(Clone, Default)]
#[must_use]
pub struct EngineBuilder {
    pagination: PaginationSlot,
    sql_debug: Option<Arc<dyn Interceptor>>,
    interceptors: Vec<Arc<dyn Interceptor>>,
    slow_query: Option<Arc<dyn Interceptor>>,
}

impl EngineBuilder {
    /// Use the built-in [`PaginationInterceptor`]. Its COUNT queries go through the debug
    /// interceptor configured on this builder.
    pub fn with_pagination(mut self) -> Self {
        self.pagination = PaginationSlot::Builtin;
        self
    }

    /// Replace the pagination slot with a custom interceptor.
    pub fn pagination_interceptor(mut self, interceptor: impl Interceptor + 'static) -> Self {
        self.pagination = PaginationSlot::Custom(Arc::new(interceptor));
        self
    }

    pub fn with_sql_debug(self, interceptor: SqlDebugInterceptor) -> Self {
        self.sql_debug_interceptor(interceptor)
    }

    /// Replace the debug slot with a custom interceptor.
    pub fn sql_debug_interceptor(mut self, interceptor: impl Interceptor + 'static) -> Self {
        self.sql_debug = Some(Arc::new(interceptor));
        self
    }

    pub fn with_slow_query_log(self, interceptor: SlowQueryInterceptor) -> Self {
        self.slow_query_interceptor(interceptor)
    }

    /// Replace the slow-query slot with a custom interceptor.
    pub fn slow_query_interceptor(mut self, interceptor: impl Interceptor + 'static) -> Self {
        self.slow_query = Some(Arc::new(interceptor));
        self
    }

    /// Append a user interceptor; these run after debug logging, in registration order.
    pub fn add_interceptor(self, interceptor: impl Interceptor + 'static) -> Self {
        self.add_interceptor_arc(Arc::new(interceptor))
    }

    /// Append a shared interceptor, e.g. one the
    /// caller keeps a handle to.
    pub fn add_interceptor_arc(mut self, interceptor: Arc<dyn Interceptor>) -> Self {
        self.interceptors.push(interceptor);
        self
    }

    pub fn build(self) -> Engine {
        let pagination = match self.pagination {
            PaginationSlot::Off => None,
            PaginationSlot::Builtin => {
                let mut pagination = PaginationInterceptor::new();
                if let Some(debug) = &self.sql_debug {
                    pagination = pagination.with_debug(Arc::clone(debug));
                }
                Some(Arc::new(pagination) as Arc<dyn Interceptor>)
            }
            PaginationSlot::Custom(interceptor) => Some(interceptor),
        };

        Engine {
            pagination,
            sql_debug: self.sql_debug,
            interceptors: self.interceptors,
            slow_query: self.slow_query,
        }
    }
}

impl fmt::Debug for EngineBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineBuilder")
            .field(
                "pagination",
                &!matches!(self.pagination, PaginationSlot::Off),
            )
            .field("sql_debug", &self.sql_debug.is_some())
            .field("interceptors", &self.interceptors.len())
            .field("slow_query", &self.slow_query.is_some())
            .finish()
    }
}
