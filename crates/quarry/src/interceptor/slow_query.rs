use crate::chain::{Interceptor, Next, Reply};
use crate::error::ExecResult;
use crate::exec::ExecOption;
use futures_util::future::BoxFuture;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Receives the elapsed time and the executed SQL of a slow call.
pub type SlowQueryCallback = Arc<dyn Fn(Duration, &str) + Send + Sync>;

/// Reports calls whose remaining chain took longer than `threshold`.
///
/// Failed calls are not reported; their error propagates untouched.
#[derive(Clone)]
pub struct SlowQueryInterceptor {
    threshold: Duration,
    callback: SlowQueryCallback,
}

impl SlowQueryInterceptor {
    /// Log slow calls with `tracing::warn!` (target `quarry.slow_query`).
    pub fn new(threshold: Duration) -> Self {
        Self {
            threshold,
            callback: Arc::new(|elapsed: Duration, sql: &str| {
                tracing::warn!(
                    target: "quarry.slow_query",
                    elapsed_ms = elapsed.as_millis() as u64,
                    sql,
                    "slow query"
                );
            }),
        }
    }

    pub fn with_callback(mut self, callback: impl Fn(Duration, &str) + Send + Sync + 'static) -> Self {
        self.callback = Arc::new(callback);
        self
    }

    pub fn threshold(&self) -> Duration {
        self.threshold
    }
}

impl fmt::Debug for SlowQueryInterceptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SlowQueryInterceptor")
            .field("threshold", &self.threshold)
            .finish_non_exhaustive()
    }
}

impl Interceptor for SlowQueryInterceptor {
    fn intercept<'a>(&'a self, option: ExecOption, next: Next) -> BoxFuture<'a, ExecResult<Reply>> {
        Box::pin(async move {
            let sql = option.sql.clone();
            let start = Instant::now();
            let reply = next.run(option).await?;
            let elapsed = start.elapsed();
            if elapsed > self.threshold {
                (self.callback)(elapsed, &sql);
            }
            Ok(reply)
        })
    }
}
