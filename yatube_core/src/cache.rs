//! Rendered-page cache.
//!
//! Entries are whole response bodies keyed by route path plus query. They
//! expire after a fixed TTL and are never invalidated by writes, so readers
//! may see a stale page for up to one TTL unless someone calls [`PageCache::clear`].

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use tokio::sync::RwLock;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedPage {
    pub content_type: String,
    pub body: Bytes,
}

#[derive(Debug, Clone)]
struct Entry {
    page: CachedPage,
    expires_at: Instant,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStatistics {
    pub hits: u64,
    pub misses: u64,
    pub entry_count: u64,
}

/// Process-wide page cache. Cloning shares the same store.
#[derive(Clone)]
pub struct PageCache {
    store: Arc<RwLock<HashMap<String, Entry>>>,
    ttl: Duration,
    hits: Arc<AtomicU64>,
    misses: Arc<AtomicU64>,
}

impl PageCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            store: Arc::new(RwLock::new(HashMap::new())),
            ttl,
            hits: Arc::new(AtomicU64::new(0)),
            misses: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Key for a route: the path plus the raw query, if any.
    pub fn key(path: &str, query: Option<&str>) -> String {
        match query {
            Some(q) if !q.is_empty() => format!("{path}?{q}"),
            _ => path.to_string(),
        }
    }

    pub async fn get(&self, key: &str) -> Option<CachedPage> {
        let now = Instant::now();
        {
            let store = self.store.read().await;
            match store.get(key) {
                Some(entry) if !entry.is_expired(now) => {
                    self.hits.fetch_add(1, Ordering::Relaxed);
                    return Some(entry.page.clone());
                }
                Some(_) => {}
                None => {
                    self.misses.fetch_add(1, Ordering::Relaxed);
                    return None;
                }
            }
        }

        // Expired: drop it so the next writer starts clean.
        self.store.write().await.remove(key);
        self.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    pub async fn set(&self, key: impl Into<String>, page: CachedPage) {
        let entry = Entry {
            page,
            expires_at: Instant::now() + self.ttl,
        };
        self.store.write().await.insert(key.into(), entry);
    }

    pub async fn invalidate(&self, key: &str) -> bool {
        self.store.write().await.remove(key).is_some()
    }

    /// Drops every entry.
    pub async fn clear(&self) {
        self.store.write().await.clear();
        tracing::debug!("page cache cleared");
    }

    pub async fn cleanup_expired(&self) {
        let now = Instant::now();
        self.store
            .write()
            .await
            .retain(|_, entry| !entry.is_expired(now));
    }

    pub async fn statistics(&self) -> CacheStatistics {
        CacheStatistics {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entry_count: self.store.read().await.len() as u64,
        }
    }
}
