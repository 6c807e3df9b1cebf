use crate::builder::BuiltSql;
use crate::chain::{self, Interceptor, Next, Reply};
use crate::error::{Error, ExecResult};
use crate::exec::{ExecContext, ExecOption};
use crate::ident::validate_identifier;
use crate::page::Page;
use crate::sql::{count_markers, find_top_level_from, starts_with_keyword, strip_sql_prefix};
use crate::value::Value;
use futures_util::future::BoxFuture;
use std::fmt::Write as _;
use std::sync::Arc;

/// Applies a [`Page`] extension to SELECT statements.
///
/// Appends `ORDER BY` (when the page has order items) and `LIMIT <size>, <offset>`. When the
/// page wants a count, a `SELECT COUNT(*)` derived from the original statement (see
/// [`count_sql`]) runs first, through the debug interceptor if one is registered.
///
/// Calls without a page, with a zero size or number, or with a non-SELECT statement pass
/// through untouched.
#[derive(Clone, Default)]
pub struct PaginationInterceptor {
    debug: Option<Arc<dyn Interceptor>>,
}

impl PaginationInterceptor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Log the COUNT query through `debug`.
    pub fn with_debug(mut self, debug: Arc<dyn Interceptor>) -> Self {
        self.debug = Some(debug);
        self
    }

    async fn count(&self, option: &ExecOption, query: BuiltSql) -> ExecResult<u64> {
        let count_option = ExecOption {
            sql: query.sql,
            args: query.args,
            executor: option.executor.clone(),
            extension: None,
            context: ExecContext::default(),
        };
        let terminal = chain::terminal(|option: ExecOption| async move {
            match option.executor.query_row(&option.sql, &option.args).await? {
                Some(row) => row.try_get_at::<i64>(0),
                None => Ok(0),
            }
        });
        let count: i64 = Next::new(self.debug.iter().cloned().collect(), terminal)
            .run(count_option)
            .await?
            .downcast()?;
        Ok(u64::try_from(count).unwrap_or(0))
    }
}

impl std::fmt::Debug for PaginationInterceptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaginationInterceptor")
            .field("debug", &self.debug.is_some())
            .finish()
    }
}

impl Interceptor for PaginationInterceptor {
    fn intercept<'a>(
        &'a self,
        mut option: ExecOption,
        next: Next,
    ) -> BoxFuture<'a, ExecResult<Reply>> {
        Box::pin(async move {
            let page = match option.extension.clone().map(|ext| ext.downcast::<Page>()) {
                Some(Ok(page)) if page.is_enabled() => page,
                _ => return next.run(option).await,
            };
            if !starts_with_keyword(strip_sql_prefix(&option.sql), "SELECT") {
                return next.run(option).await;
            }

            let original = std::mem::take(&mut option.sql);
            option.sql = paginate_sql(&original, &page)?;

            if page.wants_count() {
                let total = self.count(&option, count_sql(&original, &option.args)?).await?;
                page.record_total(total);
                tracing::trace!(
                    target: "quarry.sql",
                    total,
                    pages = page.total_pages(),
                    "page count"
                );
            }

            next.run(option).await
        })
    }
}

/// `sql` with the page's `ORDER BY` and `LIMIT` appended.
///
/// ```
/// use quarry::Page;
/// use quarry::interceptor::paginate_sql;
///
/// let page = Page::new(3, 10).desc("created_at");
/// assert_eq!(
///     paginate_sql("SELECT * FROM posts", &page)?,
///     "SELECT * FROM posts ORDER BY created_at DESC LIMIT 10, 20"
/// );
/// # Ok::<(), quarry::Error>(())
/// ```
pub fn paginate_sql(sql: &str, page: &Page) -> ExecResult<String> {
    let mut out = sql.trim_end().trim_end_matches(';').trim_end().to_string();

    for (i, item) in page.orders().iter().enumerate() {
        validate_identifier(&item.column)?;
        out.push_str(if i == 0 { " ORDER BY " } else { ", " });
        out.push_str(&item.column);
        out.push_str(if item.desc { " DESC" } else { " ASC" });
    }

    let _ = write!(out, " LIMIT {}, {}", page.page_size(), page.offset());
    Ok(out)
}

/// The COUNT companion of a SELECT: everything between its leading comments or parentheses
/// and its top-level `FROM` becomes `SELECT COUNT(*)`.
///
/// Values bound by markers in the dropped select list are dropped with it.
///
/// ```
/// use quarry::Value;
/// use quarry::interceptor::count_sql;
///
/// let count = count_sql(
///     "SELECT id, score > ? AS passed FROM users WHERE age > ?",
///     &[Value::Int(50), Value::Int(18)],
/// )?;
/// assert_eq!(count.sql, "SELECT COUNT(*) FROM users WHERE age > ?");
/// assert_eq!(count.args, vec![Value::Int(18)]);
/// # Ok::<(), quarry::Error>(())
/// ```
pub fn count_sql(sql: &str, args: &[Value]) -> ExecResult<BuiltSql> {
    let sql = sql.trim_end().trim_end_matches(';').trim_end();
    let body = strip_sql_prefix(sql);
    let prefix = &sql[..sql.len() - body.len()];
    let from = find_top_level_from(body)
        .ok_or_else(|| Error::Pagination(format!("no top-level FROM in '{sql}'")))?;
    let dropped = count_markers(&body[..from]);
    Ok(BuiltSql::new(
        format!("{prefix}SELECT COUNT(*) {}", &body[from..]),
        args.iter().skip(dropped).cloned().collect(),
    ))
}
