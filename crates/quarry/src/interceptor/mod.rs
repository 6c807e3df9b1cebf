//! Built-in interceptors.
//!
//! - [`SqlDebugInterceptor`]: logs each statement and its parameters via `tracing`
//! - [`SlowQueryInterceptor`]: reports successful calls slower than a threshold
//! - [`PaginationInterceptor`]: applies a [`crate::Page`] to SELECT statements
//!
//! Register them on an [`crate::EngineBuilder`]; the engine decides their order.

/// Dispatch a tracing event at a runtime-determined level.
macro_rules! emit_at_level {
    ($level:expr, $($field:tt)*) => {
        match $level {
            tracing::Level::ERROR => tracing::error!($($field)*),
            tracing::Level::WARN => tracing::warn!($($field)*),
            tracing::Level::INFO => tracing::info!($($field)*),
            tracing::Level::DEBUG => tracing::debug!($($field)*),
            tracing::Level::TRACE => tracing::trace!($($field)*),
        }
    };
}

pub(crate) use emit_at_level;

mod debug;
mod pagination;
mod slow_query;

pub use debug::SqlDebugInterceptor;
pub use pagination::{PaginationInterceptor, count_sql, paginate_sql};
pub use slow_query::{SlowQueryCallback, SlowQueryInterceptor};

fn truncate_sql_bytes(sql: &str, max_bytes: usize) -> &str {
    if sql.len() <= max_bytes {
        return sql;
    }
    let mut end = max_bytes;
    while end > 0 && !sql.is_char_boundary(end) {
        end -= 1;
    }
    &sql[..end]
}
