//! Transaction scoping.
//!
//! [`transactional`] begins a transaction, hands the block an executor bound to it, commits
//! when the block returns `Ok` and rolls back when it returns `Err` or panics.
//!
//! ```no_run
//! use quarry::transaction::{transactional, TransactionManager};
//! use quarry::{Engine, ExecOption, BuiltSql, Value};
//!
//! # async fn demo(engine: &Engine, manager: &dyn TransactionManager) -> quarry::ExecResult<()> {
//! transactional(manager, |tx| async move {
//!     let debit = BuiltSql::new(
//!         "UPDATE accounts SET balance = balance - ? WHERE id = ?",
//!         vec![Value::Int(100), Value::Int(1)],
//!     );
//!     engine.execute(ExecOption::new(tx, debit)).await?;
//!     Ok(())
//! })
//! .await?;
//! # Ok(()) }
//! ```

use crate::error::{Error, ExecResult};
use crate::exec::Executor;
use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

/// An open transaction. Statements run through its [`Executor`] impl.
pub trait Transaction: Executor {
    fn commit<'a>(&'a self) -> BoxFuture<'a, ExecResult<()>>;

    fn rollback<'a>(&'a self) -> BoxFuture<'a, ExecResult<()>>;
}

/// Starts transactions.
pub trait TransactionManager: Send + Sync {
    fn begin<'a>(&'a self) -> BoxFuture<'a, ExecResult<Arc<dyn Transaction>>>;
}

/// Run `body` inside a transaction.
///
/// - `Ok(value)`: commit, then return `value` (a failed commit is returned instead)
/// - `Err(error)`: roll back, then return `error`
/// - panic: roll back, then return [`Error::Panicked`]
///
/// A failed rollback yields [`Error::Rollback`], which keeps the original cause.
pub async fn transactional<T, F, Fut>(manager: &dyn TransactionManager, body: F) -> ExecResult<T>
where
    F: FnOnce(Arc<dyn Executor>) -> Fut,
    Fut: Future<Output = ExecResult<T>>,
{
    let tx = manager.begin().await?;
    let executor: Arc<dyn Executor> = tx.clone();

    let outcome = AssertUnwindSafe(async move { body(executor).await })
        .catch_unwind()
        .await
        .unwrap_or_else(|payload| Err(Error::Panicked(panic_message(payload.as_ref()))));

    match outcome {
        Ok(value) => {
            tx.commit().await?;
            tracing::debug!(target: "quarry.tx", "transaction committed");
            Ok(value)
        }
        Err(error) => match tx.rollback().await {
            Ok(()) => {
                tracing::debug!(target: "quarry.tx", error = %error, "transaction rolled back");
                Err(error)
            }
            Err(rollback) => {
                tracing::error!(
                    target: "quarry.tx",
                    error = %error,
                    rollback_error = %rollback,
                    "transaction rollback failed"
                );
                Err(Error::Rollback {
                    cause: Box::new(error),
                    rollback: Box::new(rollback),
                })
            }
        },
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "transaction block panicked".to_string()
    }
}
