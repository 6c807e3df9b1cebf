//! Per-key load deduplication.
//!
//! The first caller for a key becomes the leader: it registers a `watch` receiver for the key
//! and spawns the load as its own task. Later callers for the same key clone that receiver and
//! wait. The task removes the key before publishing, so a finished load is never joined by a
//! new caller and no two loads for a key overlap.

use super::{CacheConfig, CacheEntry};
use crate::chain::Next;
use crate::error::{Error, ExecResult};
use crate::exec::ExecOption;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::watch;

type Outcome<T> = Option<ExecResult<Option<T>>>;

pub(crate) struct Flights<T> {
    inflight: Mutex<HashMap<String, watch::Receiver<Outcome<T>>>>,
}

impl<T> Default for Flights<T> {
    fn default() -> Self {
        Self {
            inflight: Mutex::new(HashMap::new()),
        }
    }
}

impl<T> Flights<T> {
    fn remove(&self, key: &str) {
        self.inflight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
    }

    pub(crate) fn in_flight(&self) -> usize {
        self.inflight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// Unregisters the key even if the load task panics or is aborted.
struct FlightGuard<T> {
    flights: Arc<Flights<T>>,
    key: String,
}

impl<T> Drop for FlightGuard<T> {
    fn drop(&mut self) {
        self.flights.remove(&self.key);
    }
}

/// Join or start the load for `key` and wait for its outcome.
///
/// The wait is bounded by the config's query timeout; the load itself is not.
pub(crate) async fn load<T>(
    config: &Arc<CacheConfig<T>>,
    key: &str,
    option: ExecOption,
    next: Next,
) -> ExecResult<Option<T>>
where
    T: Clone + Send + Sync + 'static,
{
    let mut rx = {
        let mut inflight = config
            .flights
            .inflight
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        match inflight.get(key) {
            Some(rx) => {
                tracing::trace!(target: "quarry.cache", key, "joining in-flight load");
                rx.clone()
            }
            None => {
                let (tx, rx) = watch::channel(None);
                inflight.insert(key.to_string(), rx.clone());

                let guard = FlightGuard {
                    flights: Arc::clone(&config.flights),
                    key: key.to_string(),
                };
                let config = Arc::clone(config);
                tokio::spawn(async move {
                    let outcome = fetch_and_store(&config, &guard.key, option, next).await;
                    drop(guard);
                    tx.send_replace(Some(outcome));
                });
                rx
            }
        }
    };

    let wait = async move {
        match rx.wait_for(Option::is_some).await {
            Ok(outcome) => (*outcome).clone().unwrap_or_else(|| Err(abandoned(key))),
            Err(_) => {
                tracing::warn!(target: "quarry.cache", key, "cache load task dropped its channel");
                Err(abandoned(key))
            }
        }
    };

    match config.query_timeout {
        Some(limit) => tokio::time::timeout(limit, wait).await.map_err(|_| {
            tracing::debug!(target: "quarry.cache", key, ?limit, "cache load wait timed out");
            Error::CacheTimeout {
                key: key.to_string(),
                timeout: limit,
            }
        })?,
        None => wait.await,
    }
}

fn abandoned(key: &str) -> Error {
    Error::Other(format!("cache load for key '{key}' was abandoned"))
}

async fn fetch_and_store<T>(
    config: &CacheConfig<T>,
    key: &str,
    option: ExecOption,
    next: Next,
) -> ExecResult<Option<T>>
where
    T: Clone + Send + Sync + 'static,
{
    tracing::debug!(target: "quarry.cache", key, "cache miss, loading");
    let value: Option<T> = next.run(option).await?.downcast()?;

    let entry = match &value {
        Some(v) => Some(CacheEntry::Present(v.clone())),
        None if config.cache_absent => Some(CacheEntry::Absent),
        None => None,
    };
    if let Some(entry) = entry {
        if let Err(err) = config.manager.set(key, entry).await {
            tracing::warn!(target: "quarry.cache", key, error = %err, "failed to store loaded value");
        }
    }
    Ok(value)
}
