use super::{emit_at_level, truncate_sql_bytes};
use crate::chain::{Interceptor, Next, Reply};
use crate::error::ExecResult;
use crate::exec::ExecOption;
use crate::sql::QueryType;
use crate::value::Value;
use futures_util::future::BoxFuture;
use tracing::Level;

/// Logs the SQL about to run and its parameters, then continues the chain.
///
/// Output (target `quarry.sql`):
///
/// ```text
/// SQL        ==> SELECT * FROM users WHERE id = ?
/// PARAMETERS ==> Int(7)
/// ```
#[derive(Debug, Clone)]
pub struct SqlDebugInterceptor {
    /// Tracing event level to emit at.
    pub level: Level,
    /// Truncate long SQL strings (in bytes). `None` means no truncation.
    pub max_sql_length: Option<usize>,
}

impl Default for SqlDebugInterceptor {
    fn default() -> Self {
        Self {
            level: Level::DEBUG,
            max_sql_length: None,
        }
    }
}

impl SqlDebugInterceptor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the tracing event level.
    pub fn level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    /// Set maximum SQL length to display.
    pub fn max_sql_length(mut self, len: usize) -> Self {
        self.max_sql_length = Some(len);
        self
    }

    pub(crate) fn format_sql(&self, sql: &str) -> String {
        match self.max_sql_length {
            Some(max) if sql.len() > max => format!("{}...", truncate_sql_bytes(sql, max)),
            _ => sql.to_string(),
        }
    }

    pub(crate) fn format_params(args: &[Value]) -> String {
        args.iter()
            .map(Value::debug_repr)
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Emit the two log lines for `sql` / `args`.
    pub fn log(&self, sql: &str, args: &[Value]) {
        let query_type = QueryType::from_sql(sql);
        let sql = self.format_sql(sql);
        let params = Self::format_params(args);
        emit_at_level!(self.level, target: "quarry.sql", ?query_type, "SQL        ==> {sql}");
        emit_at_level!(self.level, target: "quarry.sql", param_count = args.len(), "PARAMETERS ==> {params}");
    }
}

impl Interceptor for SqlDebugInterceptor {
    fn intercept<'a>(&'a self, option: ExecOption, next: Next) -> BoxFuture<'a, ExecResult<Reply>> {
        self.log(&option.sql, &option.args);
        next.run(option)
    }
}
