use super::{CacheEntry, CacheManager};
use crate::error::ExecResult;
use futures_util::future::BoxFuture;
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

/// In-process LRU store with an optional time-to-live.
///
/// Reads return clones, so callers never share mutable state with the cache.
#[derive(Debug)]
pub struct LruCacheManager<T> {
    inner: Mutex<LruInner<T>>,
}

#[derive(Debug)]
struct LruInner<T> {
    capacity: usize,
    ttl: Option<Duration>,
    map: HashMap<String, Slot<T>>,
    order: VecDeque<String>,
}

#[derive(Debug)]
struct Slot<T> {
    entry: CacheEntry<T>,
    stored_at: Instant,
}

impl<T: Clone> LruCacheManager<T> {
    /// A store holding at most `capacity` keys. Zero disables storage.
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(LruInner {
                capacity,
                ttl: None,
                map: HashMap::new(),
                order: VecDeque::new(),
            }),
        }
    }

    /// Expire entries `ttl` after they were stored.
    pub fn with_ttl(self, ttl: Duration) -> Self {
        self.lock().ttl = Some(ttl);
        self
    }

    pub fn len(&self) -> usize {
        self.lock().map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        let mut inner = self.lock();
        inner.map.clear();
        inner.order.clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, LruInner<T>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn get_entry(&self, key: &str) -> Option<CacheEntry<T>> {
        let mut inner = self.lock();
        let slot = inner.map.get(key)?;
        if inner.ttl.is_some_and(|ttl| slot.stored_at.elapsed() >= ttl) {
            inner.map.remove(key);
            inner.remove_from_order(key);
            return None;
        }
        let entry = slot.entry.clone();
        inner.touch(key);
        Some(entry)
    }

    fn set_entry(&self, key: &str, entry: CacheEntry<T>) {
        let mut inner = self.lock();
        let slot = Slot {
            entry,
            stored_at: Instant::now(),
        };
        if inner.map.insert(key.to_string(), slot).is_some() {
            inner.touch(key);
        } else {
            inner.order.push_back(key.to_string());
        }
        inner.evict_if_needed();
    }

    fn delete_entry(&self, key: &str) {
        let mut inner = self.lock();
        if inner.map.remove(key).is_some() {
            inner.remove_from_order(key);
        }
    }
}

impl<T> LruInner<T> {
    fn touch(&mut self, key: &str) {
        if let Some(pos) = self.order.iter().position(|k| k.as_str() == key) {
            if let Some(k) = self.order.remove(pos) {
                self.order.push_back(k);
            }
        }
    }

    fn remove_from_order(&mut self, key: &str) {
        if let Some(pos) = self.order.iter().position(|k| k.as_str() == key) {
            let _ = self.order.remove(pos);
        }
    }

    fn evict_if_needed(&mut self) {
        if self.capacity == 0 {
            self.map.clear();
            self.order.clear();
            return;
        }

        while self.map.len() > self.capacity {
            let Some(oldest) = self.order.pop_front() else {
                break;
            };
            let _ = self.map.remove(&oldest);
        }
    }
}

impl<T> CacheManager<T> for LruCacheManager<T>
where
    T: Clone + Send + Sync,
{
    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, ExecResult<Option<CacheEntry<T>>>> {
        let entry = self.get_entry(key);
        Box::pin(async move { Ok(entry) })
    }

    fn set<'a>(&'a self, key: &'a str, entry: CacheEntry<T>) -> BoxFuture<'a, ExecResult<()>> {
        self.set_entry(key, entry);
        Box::pin(async { Ok(()) })
    }

    fn delete<'a>(&'a self, key: &'a str) -> BoxFuture<'a, ExecResult<()>> {
        self.delete_entry(key);
        Box::pin(async { Ok(()) })
    }
}
