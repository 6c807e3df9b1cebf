//! Cache-aside in front of the terminal handler.
//!
//! A [`CacheConfig`] is built once per call site and shared through an `Arc`. Each call
//! attaches it to its [`ExecContext`] with a key:
//!
//! - [`ExecContext::cacheable`]: return the cached value on a hit; on a miss run the chain
//!   once per key (concurrent callers share the load) and store the result
//! - [`ExecContext::cache_evict`]: delete the key before, or after a successful, write
//!
//! The terminal handler of a cacheable call returns `Option<T>`; `None` means "no value".
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use quarry::cache::{CacheConfig, LruCacheManager};
//! use quarry::{Engine, ExecContext, ExecOption, FromRow};
//!
//! # #[derive(Clone)] struct User;
//! # impl FromRow for User { fn from_row(_: &quarry::Row) -> quarry::ExecResult<Self> { Ok(User) } }
//! # async fn demo(engine: &Engine, option: ExecOption) -> quarry::ExecResult<()> {
//! let users = Arc::new(
//!     CacheConfig::new(LruCacheManager::<User>::new(1024))
//!         .query_timeout(Duration::from_millis(200)),
//! );
//!
//! let option = option.with_context(ExecContext::cacheable(&users, "user:42"));
//! let user: Option<User> = engine.fetch_optional(option).await?;
//! # Ok(()) }
//! ```

mod flight;
mod memory;

pub use memory::LruCacheManager;

use crate::chain::{Interceptor, Next, Reply};
use crate::error::{BuildResult, Error, ExecResult};
use crate::exec::{ExecContext, ExecOption};
use crate::scope::Scope;
use crate::stmt::resolve_template;
use flight::Flights;
use futures_util::future::BoxFuture;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// A cached slot: a value, or a remembered "no value".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheEntry<T> {
    Present(T),
    Absent,
}

impl<T> CacheEntry<T> {
    pub fn into_option(self) -> Option<T> {
        match self {
            CacheEntry::Present(value) => Some(value),
            CacheEntry::Absent => None,
        }
    }
}

/// Backing store for one value type.
///
/// Implementations own their locking. In-process stores should hand out copies so callers
/// cannot mutate what is cached.
pub trait CacheManager<T>: Send + Sync {
    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, ExecResult<Option<CacheEntry<T>>>>;

    fn set<'a>(&'a self, key: &'a str, entry: CacheEntry<T>) -> BoxFuture<'a, ExecResult<()>>;

    fn delete<'a>(&'a self, key: &'a str) -> BoxFuture<'a, ExecResult<()>>;
}

/// Produces the key a call is cached under.
pub trait CacheKey {
    fn cache_key(&self) -> BuildResult<String>;
}

impl CacheKey for str {
    fn cache_key(&self) -> BuildResult<String> {
        Ok(self.to_string())
    }
}

impl CacheKey for String {
    fn cache_key(&self) -> BuildResult<String> {
        Ok(self.clone())
    }
}

impl<K: CacheKey + ?Sized> CacheKey for &K {
    fn cache_key(&self) -> BuildResult<String> {
        (**self).cache_key()
    }
}

/// A `#{expr}` key template resolved against call arguments, e.g. `user:id:#{id}`.
///
/// An expression missing from the scope fails the call with
/// [`BuildError::UnresolvedArgument`](crate::BuildError::UnresolvedArgument).
#[derive(Debug, Clone, Copy)]
pub struct KeyTemplate<'a> {
    template: &'a str,
    scope: &'a Scope,
}

impl<'a> KeyTemplate<'a> {
    pub fn new(template: &'a str, scope: &'a Scope) -> Self {
        Self { template, scope }
    }
}

impl CacheKey for KeyTemplate<'_> {
    fn cache_key(&self) -> BuildResult<String> {
        resolve_template(self.template, self.scope)
    }
}

/// Cache policy for one call site.
pub struct CacheConfig<T> {
    manager: Arc<dyn CacheManager<T>>,
    cache_absent: bool,
    query_timeout: Option<Duration>,
    evict_before_invocation: bool,
    flights: Arc<Flights<T>>,
}

impl<T> CacheConfig<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new(manager: impl CacheManager<T> + 'static) -> Self {
        Self::from_arc(Arc::new(manager))
    }

    /// Share one manager between several configs.
    pub fn from_arc(manager: Arc<dyn CacheManager<T>>) -> Self {
        Self {
            manager,
            cache_absent: false,
            query_timeout: None,
            evict_before_invocation: false,
            flights: Arc::new(Flights::default()),
        }
    }

    /// Remember "no value" results instead of retrying the load next time.
    pub fn cache_absent(mut self, cache_absent: bool) -> Self {
        self.cache_absent = cache_absent;
        self
    }

    /// Bound how long a caller waits for a miss-path load. Zero disables the bound.
    ///
    /// On expiry the caller gets [`Error::CacheTimeout`]; the load keeps running and still
    /// populates the cache.
    pub fn query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = (!timeout.is_zero()).then_some(timeout);
        self
    }

    /// Evict before running the write instead of after it succeeds.
    pub fn evict_before_invocation(mut self, before: bool) -> Self {
        self.evict_before_invocation = before;
        self
    }

    pub fn manager(&self) -> &Arc<dyn CacheManager<T>> {
        &self.manager
    }

    /// Number of keys currently being loaded.
    pub fn loads_in_flight(&self) -> usize {
        self.flights.in_flight()
    }
}

impl<T> fmt::Debug for CacheConfig<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheConfig")
            .field("cache_absent", &self.cache_absent)
            .field("query_timeout", &self.query_timeout)
            .field("evict_before_invocation", &self.evict_before_invocation)
            .finish_non_exhaustive()
    }
}

/// Read-through interceptor for one call.
pub struct Cacheable<T> {
    config: Arc<CacheConfig<T>>,
    key: BuildResult<String>,
}

impl<T> Interceptor for Cacheable<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn intercept<'a>(&'a self, option: ExecOption, next: Next) -> BoxFuture<'a, ExecResult<Reply>> {
        Box::pin(async move {
            let key = checked_key(&self.key)?;
            if let Some(entry) = self.config.manager.get(key).await? {
                tracing::trace!(target: "quarry.cache", key, "cache hit");
                return Ok(Reply::new(entry.into_option()));
            }
            let value = flight::load(&self.config, key, option, next).await?;
            Ok(Reply::new(value))
        })
    }
}

/// Invalidation interceptor for one write call.
pub struct CacheEvict<T> {
    config: Arc<CacheConfig<T>>,
    key: BuildResult<String>,
}

impl<T> Interceptor for CacheEvict<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn intercept<'a>(&'a self, option: ExecOption, next: Next) -> BoxFuture<'a, ExecResult<Reply>> {
        Box::pin(async move {
            let key = checked_key(&self.key)?;
            let manager = &self.config.manager;
            if self.config.evict_before_invocation {
                manager.delete(key).await?;
            }
            let reply = next.run(option).await?;
            if !self.config.evict_before_invocation {
                manager.delete(key).await?;
            }
            tracing::trace!(target: "quarry.cache", key, "cache evicted");
            Ok(reply)
        })
    }
}

fn checked_key(key: &BuildResult<String>) -> ExecResult<&str> {
    match key {
        Ok(key) if key.is_empty() => Err(Error::EmptyCacheKey),
        Ok(key) => Ok(key),
        Err(err) => Err(Error::Build(err.clone())),
    }
}

impl ExecContext {
    /// A context whose call reads through `config` under `key`.
    ///
    /// A key that fails to resolve surfaces as the call's error, before anything runs.
    pub fn cacheable<T>(config: &Arc<CacheConfig<T>>, key: impl CacheKey) -> Self
    where
        T: Clone + Send + Sync + 'static,
    {
        ExecContext::default().with_cache(Arc::new(Cacheable {
            config: Arc::clone(config),
            key: key.cache_key(),
        }))
    }

    /// A context whose call evicts `key` from `config`'s store.
    pub fn cache_evict<T>(config: &Arc<CacheConfig<T>>, key: impl CacheKey) -> Self
    where
        T: Clone + Send + Sync + 'static,
    {
        ExecContext::default().with_cache(Arc::new(CacheEvict {
            config: Arc::clone(config),
            key: key.cache_key(),
        }))
    }
}

#[cfg(test)]
mod tests;
