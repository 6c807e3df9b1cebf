use super::*;
use crate::builder::BuiltSql;
use crate::chain::{self, Handler};
use crate::exec::Executor;
use crate::row::Row;
use crate::value::Value;
use std::sync::atomic::{AtomicUsize, Ordering};

struct NoopExecutor;

impl Executor for NoopExecutor {
    fn execute<'a>(&'a self, _: &'a str, _: &'a [Value]) -> BoxFuture<'a, ExecResult<u64>> {
        Box::pin(async { Ok(0) })
    }

    fn query<'a>(&'a self, _: &'a str, _: &'a [Value]) -> BoxFuture<'a, ExecResult<Vec<Row>>> {
        Box::pin(async { Ok(Vec::new()) })
    }
}

fn option() -> ExecOption {
    ExecOption::new(
        Arc::new(NoopExecutor),
        BuiltSql::new("SELECT name FROM users WHERE id = ?", vec![Value::Int(7)]),
    )
}

/// A terminal returning `value` after `delay`, counting its invocations.
fn counting_terminal(
    calls: &Arc<AtomicUsize>,
    delay: Duration,
    value: Option<u32>,
) -> Handler {
    let calls = Arc::clone(calls);
    chain::terminal(move |_option: ExecOption| {
        let calls = Arc::clone(&calls);
        async move {
            calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(delay).await;
            Ok(value)
        }
    })
}

fn failing_terminal(calls: &Arc<AtomicUsize>) -> Handler {
    let calls = Arc::clone(calls);
    chain::terminal(move |_option: ExecOption| {
        let calls = Arc::clone(&calls);
        async move {
            calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            Err::<Option<u32>, _>(Error::Other("connection reset".into()))
        }
    })
}

async fn run(context: &ExecContext, terminal: &Handler) -> ExecResult<Option<u32>> {
    let cache = context.cache.clone().into_iter().collect();
    Next::new(cache, Arc::clone(terminal))
        .run(option())
        .await?
        .downcast()
}

fn lru_config() -> Arc<CacheConfig<u32>> {
    Arc::new(CacheConfig::new(LruCacheManager::new(16)))
}

#[tokio::test]
async fn concurrent_misses_share_one_load() {
    let config = lru_config();
    let calls = Arc::new(AtomicUsize::new(0));
    let terminal = counting_terminal(&calls, Duration::from_millis(50), Some(42));
    let context = ExecContext::cacheable(&config, "user:7");

    let (a, b) = tokio::join!(run(&context, &terminal), run(&context, &terminal));

    assert_eq!(a.unwrap(), Some(42));
    assert_eq!(b.unwrap(), Some(42));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(config.loads_in_flight(), 0);

    assert_eq!(run(&context, &terminal).await.unwrap(), Some(42));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn different_keys_load_independently() {
    let config = lru_config();
    let calls = Arc::new(AtomicUsize::new(0));
    let terminal = counting_terminal(&calls, Duration::from_millis(20), Some(1));

    let first = ExecContext::cacheable(&config, "a");
    let second = ExecContext::cacheable(&config, "b");

    let (a, b) = tokio::join!(run(&first, &terminal), run(&second, &terminal));

    assert!(a.is_ok() && b.is_ok());
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn hit_skips_the_rest_of_the_chain() {
    let config = lru_config();
    config
        .manager()
        .set("user:7", CacheEntry::Present(5))
        .await
        .unwrap();
    let calls = Arc::new(AtomicUsize::new(0));
    let terminal = counting_terminal(&calls, Duration::ZERO, Some(99));

    let value = run(&ExecContext::cacheable(&config, "user:7"), &terminal)
        .await
        .unwrap();

    assert_eq!(value, Some(5));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn absent_result_is_not_stored_by_default() {
    let config = lru_config();
    let calls = Arc::new(AtomicUsize::new(0));
    let terminal = counting_terminal(&calls, Duration::ZERO, None);
    let context = ExecContext::cacheable(&config, "missing");

    assert_eq!(run(&context, &terminal).await.unwrap(), None);
    assert_eq!(run(&context, &terminal).await.unwrap(), None);

    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(config.manager().get("missing").await.unwrap(), None);
}

#[tokio::test]
async fn absent_result_is_remembered_when_enabled() {
    let config = Arc::new(CacheConfig::new(LruCacheManager::<u32>::new(16)).cache_absent(true));
    let calls = Arc::new(AtomicUsize::new(0));
    let terminal = counting_terminal(&calls, Duration::ZERO, None);
    let context = ExecContext::cacheable(&config, "missing");

    assert_eq!(run(&context, &terminal).await.unwrap(), None);
    assert_eq!(run(&context, &terminal).await.unwrap(), None);

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(
        config.manager().get("missing").await.unwrap(),
        Some(CacheEntry::Absent)
    );
}

#[tokio::test]
async fn wait_timeout_is_reported_and_load_still_populates() {
    let config = Arc::new(
        CacheConfig::new(LruCacheManager::<u32>::new(16)).query_timeout(Duration::from_millis(20)),
    );
    let calls = Arc::new(AtomicUsize::new(0));
    let terminal = counting_terminal(&calls, Duration::from_millis(150), Some(8));
    let context = ExecContext::cacheable(&config, "slow");

    let err = run(&context, &terminal).await.unwrap_err();
    assert!(err.is_cache_timeout());
    assert!(matches!(err, Error::CacheTimeout { ref key, .. } if key == "slow"));

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(
        config.manager().get("slow").await.unwrap(),
        Some(CacheEntry::Present(8))
    );
    assert_eq!(run(&context, &terminal).await.unwrap(), Some(8));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn zero_query_timeout_means_unbounded() {
    let config = CacheConfig::new(LruCacheManager::<u32>::new(1)).query_timeout(Duration::ZERO);
    assert_eq!(config.query_timeout, None);
}

#[tokio::test]
async fn load_errors_reach_every_waiter_and_are_not_cached() {
    let config = lru_config();
    let calls = Arc::new(AtomicUsize::new(0));
    let terminal = failing_terminal(&calls);
    let context = ExecContext::cacheable(&config, "user:7");

    let (a, b) = tokio::join!(run(&context, &terminal), run(&context, &terminal));
    assert!(a.unwrap_err().to_string().contains("connection reset"));
    assert!(b.unwrap_err().to_string().contains("connection reset"));
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    assert!(run(&context, &terminal).await.is_err());
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn empty_key_is_rejected_before_the_chain_runs() {
    let config = lru_config();
    let calls = Arc::new(AtomicUsize::new(0));
    let terminal = counting_terminal(&calls, Duration::ZERO, Some(1));

    let err = run(&ExecContext::cacheable(&config, ""), &terminal)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::EmptyCacheKey));

    let err = run(&ExecContext::cache_evict(&config, String::new()), &terminal)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::EmptyCacheKey));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn evict_after_keeps_entry_when_write_fails() {
    let config = lru_config();
    config
        .manager()
        .set("user:7", CacheEntry::Present(1))
        .await
        .unwrap();
    let calls = Arc::new(AtomicUsize::new(0));
    let context = ExecContext::cache_evict(&config, "user:7");

    assert!(run(&context, &failing_terminal(&calls)).await.is_err());
    assert!(config.manager().get("user:7").await.unwrap().is_some());

    let ok = counting_terminal(&calls, Duration::ZERO, None);
    run(&context, &ok).await.unwrap();
    assert!(config.manager().get("user:7").await.unwrap().is_none());
}

#[tokio::test]
async fn evict_before_removes_entry_even_when_write_fails() {
    let config = Arc::new(CacheConfig::new(LruCacheManager::<u32>::new(16)).evict_before_invocation(true));
    config
        .manager()
        .set("user:7", CacheEntry::Present(1))
        .await
        .unwrap();
    let calls = Arc::new(AtomicUsize::new(0));

    let result = run(&ExecContext::cache_evict(&config, "user:7"), &failing_terminal(&calls)).await;

    assert!(result.is_err());
    assert!(config.manager().get("user:7").await.unwrap().is_none());
}

#[test]
fn key_template_resolves_against_scope() {
    let scope = Scope::new().bind("id", 7).bind("tenant", "acme");
    let key = KeyTemplate::new("user:#{tenant}:#{ id }", &scope);
    assert_eq!(key.cache_key().unwrap(), "user:acme:7");
    assert_eq!("plain".cache_key().unwrap(), "plain");
}

#[tokio::test]
async fn unresolved_key_template_fails_the_call() {
    let config = lru_config();
    config
        .manager()
        .set("user:", CacheEntry::Present(1))
        .await
        .unwrap();
    let calls = Arc::new(AtomicUsize::new(0));
    let terminal = counting_terminal(&calls, Duration::ZERO, Some(42));
    let scope = Scope::new().bind("id", 7);
    let key = KeyTemplate::new("user:#{uid}", &scope);

    for context in [
        ExecContext::cacheable(&config, key),
        ExecContext::cache_evict(&config, key),
    ] {
        let err = run(&context, &terminal).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Build(crate::BuildError::UnresolvedArgument(ref arg)) if arg == "uid"
        ));
    }

    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert!(config.manager().get("user:").await.unwrap().is_some());
}

#[tokio::test]
async fn lru_evicts_least_recently_used() {
    let lru = LruCacheManager::new(2);
    lru.set("a", CacheEntry::Present(1)).await.unwrap();
    lru.set("b", CacheEntry::Present(2)).await.unwrap();
    assert!(lru.get("a").await.unwrap().is_some());

    lru.set("c", CacheEntry::Present(3)).await.unwrap();

    assert_eq!(lru.len(), 2);
    assert!(lru.get("b").await.unwrap().is_none());
    assert_eq!(lru.get("a").await.unwrap(), Some(CacheEntry::Present(1)));
    assert_eq!(lru.get("c").await.unwrap(), Some(CacheEntry::Present(3)));
}

#[tokio::test]
async fn lru_zero_capacity_stores_nothing() {
    let lru = LruCacheManager::new(0);
    lru.set("a", CacheEntry::Present(1)).await.unwrap();
    assert!(lru.is_empty());
}

#[tokio::test]
async fn lru_entries_expire_after_ttl() {
    let lru = LruCacheManager::new(4).with_ttl(Duration::from_millis(10));
    lru.set("a", CacheEntry::Present(1)).await.unwrap();
    tokio::time::sleep(Duration::from_millis(30)).await;
    assert!(lru.get("a").await.unwrap().is_none());
    assert!(lru.is_empty());
}

#[tokio::test]
async fn lru_reads_are_copies() {
    let lru = LruCacheManager::new(4);
    lru.set("tags", CacheEntry::Present(vec!["a".to_string()]))
        .await
        .unwrap();

    if let Some(CacheEntry::Present(mut tags)) = lru.get("tags").await.unwrap() {
        tags.push("b".to_string());
    }

    assert_eq!(
        lru.get("tags").await.unwrap(),
        Some(CacheEntry::Present(vec!["a".to_string()]))
    );
}
