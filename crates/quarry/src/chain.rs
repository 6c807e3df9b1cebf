//! Interceptor chain primitives.
//!
//! An [`Interceptor`] receives the [`ExecOption`] and a [`Next`] continuation. Calling
//! `next.run(option)` continues down the chain; returning without calling it short-circuits
//! (a cache hit does this). Errors from `next` propagate unchanged unless an interceptor
//! decides otherwise.

use crate::error::{Error, ExecResult};
use crate::exec::ExecOption;
use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use std::any::{Any, type_name};
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// Type-erased result travelling back up the chain.
pub struct Reply(Box<dyn Any + Send>);

impl Reply {
    pub fn new<T: Send + 'static>(value: T) -> Self {
        Self(Box::new(value))
    }

    /// Take the value out as `T`.
    pub fn downcast<T: 'static>(self) -> ExecResult<T> {
        self.0
            .downcast::<T>()
            .map(|value| *value)
            .map_err(|_| Error::UnexpectedReply {
                expected: type_name::<T>(),
            })
    }

    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        self.0.downcast_ref::<T>()
    }
}

impl fmt::Debug for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Reply(..)")
    }
}

/// The innermost handler: actually runs the statement.
pub type Handler = Arc<dyn Fn(ExecOption) -> BoxFuture<'static, ExecResult<Reply>> + Send + Sync>;

/// Wrap a typed terminal function as a [`Handler`].
pub fn terminal<T, F, Fut>(f: F) -> Handler
where
    T: Send + 'static,
    F: Fn(ExecOption) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ExecResult<T>> + Send + 'static,
{
    Arc::new(move |option| f(option).map(|result| result.map(Reply::new)).boxed())
}

/// Cross-cutting behavior around statement execution.
pub trait Interceptor: Send + Sync {
    fn intercept<'a>(&'a self, option: ExecOption, next: Next) -> BoxFuture<'a, ExecResult<Reply>>;
}

impl<I: Interceptor + ?Sized> Interceptor for Arc<I> {
    fn intercept<'a>(&'a self, option: ExecOption, next: Next) -> BoxFuture<'a, ExecResult<Reply>> {
        (**self).intercept(option, next)
    }
}

/// The rest of the chain after the current interceptor.
#[derive(Clone)]
pub struct Next {
    chain: Arc<[Arc<dyn Interceptor>]>,
    position: usize,
    terminal: Handler,
}

impl Next {
    pub fn new(chain: Vec<Arc<dyn Interceptor>>, terminal: Handler) -> Self {
        Self {
            chain: chain.into(),
            position: 0,
            terminal,
        }
    }

    /// Continue with the next interceptor, or the terminal handler if none is left.
    pub fn run(self, option: ExecOption) -> BoxFuture<'static, ExecResult<Reply>> {
        let Some(current) = self.chain.get(self.position).cloned() else {
            return (self.terminal)(option);
        };
        let next = Next {
            chain: self.chain,
            position: self.position + 1,
            terminal: self.terminal,
        };
        async move { current.intercept(option, next).await }.boxed()
    }

    /// Interceptors left before the terminal handler.
    pub fn remaining(&self) -> usize {
        self.chain.len().saturating_sub(self.position)
    }
}

impl fmt::Debug for Next {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Next")
            .field("remaining", &self.remaining())
            .finish_non_exhaustive()
    }
}

/// Closure-backed interceptor.
///
/// ```
/// use quarry::{FnInterceptor, Next, ExecOption};
///
/// let tag = FnInterceptor::new(|mut option: ExecOption, next: Next| {
///     option.sql = format!("/* api */ {}", option.sql);
///     next.run(option)
/// });
/// # let _ = tag;
/// ```
pub struct FnInterceptor<F> {
    f: F,
}

impl<F> FnInterceptor<F> {
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F, Fut> Interceptor for FnInterceptor<F>
where
    F: Fn(ExecOption, Next) -> Fut + Send + Sync,
    Fut: Future<Output = ExecResult<Reply>> + Send + 'static,
{
    fn intercept<'a>(&'a self, option: ExecOption, next: Next) -> BoxFuture<'a, ExecResult<Reply>> {
        (self.f)(option, next).boxed()
    }
}
