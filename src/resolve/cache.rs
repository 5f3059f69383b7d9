// src/resolve/cache.rs
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

use crate::resolve::Lookup;

struct CacheEntry {
    result: Lookup,
    stored_at: Instant,
}

/// TTL'd lookup cache keyed by canonical number. Found and not-found results
/// age out on the same freshness window; stale entries are dropped on read.
pub struct LookupCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
    ttl: Duration,
}

impl LookupCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    pub async fn get(&self, number: &str) -> Option<Lookup> {
        let mut entries = self.entries.lock().await;
        match entries.get(number) {
            Some(entry) if entry.stored_at.elapsed() < self.ttl => {
                debug!("Cache hit: {}", number);
                Some(entry.result.clone())
            }
            Some(_) => {
                debug!("Cache entry stale: {}", number);
                entries.remove(number);
                None
            }
            None => None,
        }
    }

    pub async fn put(&self, number: &str, result: Lookup) {
        let mut entries = self.entries.lock().await;
        entries.insert(
            number.to_string(),
            CacheEntry {
                result,
                stored_at: Instant::now(),
            },
        );
    }

    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }
}
