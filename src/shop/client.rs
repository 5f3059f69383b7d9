// src/shop/client.rs
use async_trait::async_trait;
use reqwest::{Client, ClientBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::config::ShopConfig;
use crate::shop::types::{Customer, Order};

#[derive(Debug, Clone, Error)]
pub enum ShopError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("HTTP error: status {0}")]
    Http(u16),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Timeout: request took longer than {0:?}")]
    Timeout(Duration),
}

impl ShopError {
    /// Transient failures are worth retrying: the backend may recover.
    /// Anything else (auth, bad request) will fail the same way again.
    pub fn is_transient(&self) -> bool {
        match self {
            ShopError::Connection(_) | ShopError::Timeout(_) => true,
            ShopError::Http(status) => *status >= 500,
            ShopError::Parse(_) => false,
        }
    }
}

/// Seam between the resolver and the shop's REST surface.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CustomerBackend: Send + Sync {
    /// Customers whose records mention the given number. The backend search
    /// is substring-based, so callers must re-match candidates canonically.
    async fn search_customers(&self, number: &str) -> Result<Vec<Customer>, ShopError>;

    /// Order history for one customer, most recent first.
    async fn fetch_orders(&self, customer_id: u64) -> Result<Vec<Order>, ShopError>;
}

/// WooCommerce wc/v3 client. Credentials ride along as query parameters on
/// every request, per the store API's key/secret scheme.
pub struct WooClient {
    http: Client,
    base_url: String,
    consumer_key: String,
    consumer_secret: String,
    request_timeout: Duration,
}

impl WooClient {
    pub fn new(config: &ShopConfig) -> Result<Self, ShopError> {
        let http = ClientBuilder::new()
            .timeout(config.request_timeout)
            .pool_max_idle_per_host(4)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(60))
            .build()
            .map_err(|e| ShopError::Connection(e.to_string()))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            consumer_key: config.consumer_key.clone(),
            consumer_secret: config.consumer_secret.clone(),
            request_timeout: config.request_timeout,
        })
    }

    async fn get_json<Q, R>(&self, path: &str, query: &Q) -> Result<R, ShopError>
    where
        Q: Serialize + ?Sized + Sync,
        R: DeserializeOwned,
    {
        let url = format!("{}/wp-json/wc/v3/{}", self.base_url, path);
        debug!("Shop request: GET {}", path);

        let response = self
            .http
            .get(&url)
            .query(&[
                ("consumer_key", self.consumer_key.as_str()),
                ("consumer_secret", self.consumer_secret.as_str()),
            ])
            .query(query)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ShopError::Timeout(self.request_timeout)
                } else {
                    ShopError::Connection(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ShopError::Http(status.as_u16()));
        }

        response
            .json()
            .await
            .map_err(|e| ShopError::Parse(e.to_string()))
    }
}

#[async_trait]
impl CustomerBackend for WooClient {
    async fn search_customers(&self, number: &str) -> Result<Vec<Customer>, ShopError> {
        self.get_json("customers", &[("search", number), ("per_page", "100")])
            .await
    }

    async fn fetch_orders(&self, customer_id: u64) -> Result<Vec<Order>, ShopError> {
        self.get_json(
            "orders",
            &[
                ("customer", customer_id.to_string().as_str()),
                ("per_page", "100"),
                ("orderby", "date"),
                ("order", "desc"),
            ],
        )
        .await
    }
}
