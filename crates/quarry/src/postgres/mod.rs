//! `tokio-postgres` backed [`Executor`] and [`TransactionManager`] (feature `postgres`).
//!
//! Statements keep using `?` markers; they are rewritten to `$1, $2, ...` right before
//! they reach the driver.
//!
//! The built-in pagination tail is `LIMIT <size>, <offset>`, which PostgreSQL does not
//! accept. Register a custom pagination interceptor on engines that run against it.

mod value;

use crate::error::ExecResult;
use crate::exec::Executor;
use crate::row::Row;
use crate::transaction::{Transaction, TransactionManager};
use crate::value::Value as SqlValue;
use futures_util::future::BoxFuture;
use std::borrow::Cow;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio_postgres::types::ToSql;
use value::{PgValue, column_names, decode_row};

/// Rewrite `?` markers outside quoted literals and identifiers into `$n`.
pub fn to_numbered_placeholders(sql: &str) -> Cow<'_, str> {
    if !sql.contains('?') {
        return Cow::Borrowed(sql);
    }

    let mut out = String::with_capacity(sql.len() + 8);
    let mut n = 0usize;
    let mut quote: Option<char> = None;
    for c in sql.chars() {
        match (quote, c) {
            (None, '\'' | '"') => {
                quote = Some(c);
                out.push(c);
            }
            (Some(q), _) if c == q => {
                quote = None;
                out.push(c);
            }
            (None, '?') => {
                n += 1;
                out.push('$');
                out.push_str(&n.to_string());
            }
            _ => out.push(c),
        }
    }
    Cow::Owned(out)
}

/// Runs statements on a shared client.
#[derive(Clone)]
pub struct PgExecutor {
    client: Arc<tokio_postgres::Client>,
}

impl PgExecutor {
    pub fn new(client: Arc<tokio_postgres::Client>) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &tokio_postgres::Client {
        &self.client
    }
}

impl std::fmt::Debug for PgExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PgExecutor").finish_non_exhaustive()
    }
}

fn bind(args: &[SqlValue]) -> Vec<PgValue<'_>> {
    args.iter().map(PgValue).collect()
}

fn params<'a>(bound: &'a [PgValue<'a>]) -> Vec<&'a (dyn ToSql + Sync)> {
    bound.iter().map(|v| v as &(dyn ToSql + Sync)).collect()
}

impl Executor for PgExecutor {
    fn execute<'a>(&'a self, sql: &'a str, args: &'a [SqlValue]) -> BoxFuture<'a, ExecResult<u64>> {
        Box::pin(async move {
            let sql = to_numbered_placeholders(sql);
            let bound = bind(args);
            Ok(self.client.execute(sql.as_ref(), &params(&bound)).await?)
        })
    }

    fn query<'a>(
        &'a self,
        sql: &'a str,
        args: &'a [SqlValue],
    ) -> BoxFuture<'a, ExecResult<Vec<Row>>> {
        Box::pin(async move {
            let sql = to_numbered_placeholders(sql);
            let bound = bind(args);
            let rows = self.client.query(sql.as_ref(), &params(&bound)).await?;
            let Some(first) = rows.first() else {
                return Ok(Vec::new());
            };
            let columns = column_names(first);
            rows.iter()
                .map(|row| decode_row(row, &columns))
                .collect::<ExecResult<Vec<_>>>()
        })
    }
}

/// Issues `BEGIN` / `COMMIT` / `ROLLBACK` on a dedicated client.
///
/// Transactions on one manager are serialized: `begin` waits until the previous
/// transaction has committed or rolled back.
#[derive(Clone)]
pub struct PgTransactionManager {
    executor: PgExecutor,
    lock: Arc<Mutex<()>>,
}

impl PgTransactionManager {
    /// `client` must not be shared with non-transactional work.
    pub fn new(client: Arc<tokio_postgres::Client>) -> Self {
        Self {
            executor: PgExecutor::new(client),
            lock: Arc::new(Mutex::new(())),
        }
    }
}

impl TransactionManager for PgTransactionManager {
    fn begin<'a>(&'a self) -> BoxFuture<'a, ExecResult<Arc<dyn Transaction>>> {
        Box::pin(async move {
            let guard = Arc::clone(&self.lock).lock_owned().await;
            self.executor.client().batch_execute("BEGIN").await?;
            let tx: Arc<dyn Transaction> = Arc::new(PgTransaction {
                executor: self.executor.clone(),
                _guard: guard,
            });
            Ok(tx)
        })
    }
}

struct PgTransaction {
    executor: PgExecutor,
    _guard: OwnedMutexGuard<()>,
}

impl Executor for PgTransaction {
    fn execute<'a>(&'a self, sql: &'a str, args: &'a [SqlValue]) -> BoxFuture<'a, ExecResult<u64>> {
        self.executor.execute(sql, args)
    }

    fn query<'a>(
        &'a self,
        sql: &'a str,
        args: &'a [SqlValue],
    ) -> BoxFuture<'a, ExecResult<Vec<Row>>> {
        self.executor.query(sql, args)
    }
}

impl Transaction for PgTransaction {
    fn commit<'a>(&'a self) -> BoxFuture<'a, ExecResult<()>> {
        Box::pin(async move { Ok(self.executor.client().batch_execute("COMMIT").await?) })
    }

    fn rollback<'a>(&'a self) -> BoxFuture<'a, ExecResult<()>> {
        Box::pin(async move { Ok(self.executor.client().batch_execute("ROLLBACK").await?) })
    }
}
