// src/resolve/mod.rs
//! Customer resolver: cached, retried, concurrency-bounded lookups.
//!
//! The resolver owns the lookup cache and the in-flight table; the
//! correlator only ever calls [`Resolver::resolve`] from spawned tasks, so
//! nothing here can block the socket read loop.

pub mod cache;

use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{broadcast, Mutex, Semaphore};
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::config::{PhoneRule, ResolverConfig};
use crate::phone;
use crate::shop::{CustomerBackend, CustomerProfile, ShopError};
use cache::LookupCache;

/// Successful resolution outcome. `NotFound` is a real answer and is cached
/// like a hit, so unknown numbers do not hammer the backend within the
/// freshness window.
#[derive(Debug, Clone)]
pub enum Lookup {
    Found(Arc<CustomerProfile>),
    NotFound,
}

#[derive(Debug, Clone, Error)]
pub enum ResolveError {
    #[error("Shop backend error: {0}")]
    Shop(#[from] ShopError),

    #[error("Lookup failed after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: String },

    /// The task performing the shared lookup went away without a result.
    #[error("In-flight lookup was abandoned")]
    Abandoned,
}

type SharedResult = Result<Lookup, ResolveError>;

pub struct Resolver {
    backend: Arc<dyn CustomerBackend>,
    phone_rule: PhoneRule,
    config: ResolverConfig,
    cache: LookupCache,
    inflight: Mutex<HashMap<String, broadcast::Sender<SharedResult>>>,
    limiter: Semaphore,
}

impl Resolver {
    pub fn new(
        backend: Arc<dyn CustomerBackend>,
        phone_rule: PhoneRule,
        config: ResolverConfig,
    ) -> Self {
        let cache = LookupCache::new(config.cache_ttl);
        let limiter = Semaphore::new(config.max_concurrency);
        Self {
            backend,
            phone_rule,
            config,
            cache,
            inflight: Mutex::new(HashMap::new()),
            limiter,
        }
    }

    /// Resolve a canonical number to a customer profile or `NotFound`.
    ///
    /// Fresh cache hits return without a remote call. Concurrent lookups for
    /// the same number coalesce onto one remote query. Transient backend
    /// failures are retried with a short backoff; exhaustion leaves the
    /// cache untouched so a later ring retries from scratch.
    pub async fn resolve(&self, number: &str) -> SharedResult {
        if let Some(hit) = self.cache.get(number).await {
            return Ok(hit);
        }

        let tx = {
            let mut inflight = self.inflight.lock().await;
            if let Some(existing) = inflight.get(number) {
                let mut rx = existing.subscribe();
                drop(inflight);
                debug!("Coalescing onto in-flight lookup: {}", number);
                return match rx.recv().await {
                    Ok(result) => result,
                    Err(_) => Err(ResolveError::Abandoned),
                };
            }
            let (tx, _) = broadcast::channel(1);
            inflight.insert(number.to_string(), tx.clone());
            tx
        };

        let result = self.fetch_with_retry(number).await;

        if let Ok(lookup) = &result {
            self.cache.put(number, lookup.clone()).await;
        }

        // Cache first, then unregister, then publish: a caller arriving
        // after removal sees the cached value instead of refetching.
        self.inflight.lock().await.remove(number);
        let _ = tx.send(result.clone());

        result
    }

    async fn fetch_with_retry(&self, number: &str) -> SharedResult {
        let _permit = self
            .limiter
            .acquire()
            .await
            .map_err(|_| ResolveError::Abandoned)?;

        let mut last_error: Option<ShopError> = None;
        for attempt in 1..=self.config.attempts {
            match self.fetch(number).await {
                Ok(lookup) => return Ok(lookup),
                Err(e) if !e.is_transient() => return Err(ResolveError::Shop(e)),
                Err(e) => {
                    warn!(
                        "Lookup attempt {}/{} failed for {}: {}",
                        attempt, self.config.attempts, number, e
                    );
                    last_error = Some(e);
                    if attempt < self.config.attempts {
                        sleep(self.config.retry_backoff).await;
                    }
                }
            }
        }

        Err(ResolveError::Exhausted {
            attempts: self.config.attempts,
            last: last_error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "unknown".to_string()),
        })
    }

    async fn fetch(&self, number: &str) -> Result<Lookup, ShopError> {
        let candidates = self.backend.search_customers(number).await?;

        // The backend search is fuzzy; re-match candidates on the canonical
        // form before trusting them.
        let matched = candidates
            .iter()
            .filter(|c| {
                let candidate = phone::canonicalize(&c.billing.phone, &self.phone_rule);
                phone::numbers_match(number, &candidate)
            })
            .min_by_key(|c| c.id);

        let Some(customer) = matched else {
            return Ok(Lookup::NotFound);
        };

        let orders = self.backend.fetch_orders(customer.id).await?;
        Ok(Lookup::Found(Arc::new(CustomerProfile::from_parts(
            customer, &orders,
        ))))
    }
}
