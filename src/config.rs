// src/config.rs
use std::env;
use std::time::Duration;

use crate::error::AppError;

#[derive(Debug, Clone)]
pub struct Config {
    pub ami: AmiConfig,
    pub shop: ShopConfig,
    pub phone: PhoneRule,
    pub resolver: ResolverConfig,
}

/// Asterisk Manager Interface endpoint and session tuning.
#[derive(Debug, Clone)]
pub struct AmiConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub secret: String,
    /// Only rings destined for this channel (e.g. "SIP/1034") qualify.
    pub watch_channel: String,
    pub handshake_timeout: Duration,
    pub reconnect_initial: Duration,
    pub reconnect_max: Duration,
}

/// WooCommerce REST endpoint and per-request credentials.
#[derive(Debug, Clone)]
pub struct ShopConfig {
    pub base_url: String,
    pub consumer_key: String,
    pub consumer_secret: String,
    pub request_timeout: Duration,
}

/// Phone normalization rule.
#[derive(Debug, Clone)]
pub struct PhoneRule {
    /// Country prefix stripped when the number is longer than the
    /// significant-digit count (e.g. "1" for US, "359" for BG).
    pub country_prefix: Option<String>,
    /// Trailing digits kept as the canonical form.
    pub significant_digits: usize,
}

impl Default for PhoneRule {
    fn default() -> Self {
        Self {
            country_prefix: None,
            significant_digits: 10,
        }
    }
}

/// Customer resolver tuning.
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Freshness window for cached lookups (found and not-found alike).
    pub cache_ttl: Duration,
    /// Remote attempts per lookup before reporting failure.
    pub attempts: u32,
    /// Delay between attempts.
    pub retry_backoff: Duration,
    /// Upper bound on concurrent remote lookups.
    pub max_concurrency: usize,
    /// Time-to-live of call records in the correlator table.
    pub call_ttl: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        dotenv::dotenv().ok();

        let ami = AmiConfig {
            host: require("AMI_HOST")?,
            port: parse_var("AMI_PORT", 5038)?,
            username: require("AMI_USERNAME")?,
            secret: require("AMI_SECRET")?,
            watch_channel: require("AMI_WATCH_CHANNEL")?,
            handshake_timeout: secs_var("AMI_HANDSHAKE_TIMEOUT_SECS", 10)?,
            reconnect_initial: secs_var("AMI_RECONNECT_INITIAL_SECS", 5)?,
            reconnect_max: secs_var("AMI_RECONNECT_MAX_SECS", 60)?,
        };

        let shop = ShopConfig {
            base_url: require("SHOP_URL")?,
            consumer_key: require("SHOP_CONSUMER_KEY")?,
            consumer_secret: require("SHOP_CONSUMER_SECRET")?,
            request_timeout: secs_var("SHOP_TIMEOUT_SECS", 15)?,
        };

        let phone = PhoneRule {
            country_prefix: env::var("PHONE_COUNTRY_PREFIX")
                .ok()
                .filter(|p| !p.is_empty()),
            significant_digits: parse_var("PHONE_SIGNIFICANT_DIGITS", 10)?,
        };

        let resolver = ResolverConfig {
            cache_ttl: secs_var("LOOKUP_CACHE_TTL_SECS", 300)?,
            attempts: parse_var("LOOKUP_ATTEMPTS", 3)?,
            retry_backoff: secs_var("LOOKUP_RETRY_BACKOFF_SECS", 2)?,
            max_concurrency: parse_var("LOOKUP_MAX_CONCURRENCY", 4)?,
            call_ttl: secs_var("CALL_RECORD_TTL_SECS", 600)?,
        };

        Ok(Config {
            ami,
            shop,
            phone,
            resolver,
        })
    }
}

fn require(name: &str) -> Result<String, AppError> {
    env::var(name).map_err(|_| AppError::Config(format!("{} not set", name)))
}

fn parse_var<T: std::str::FromStr>(name: &str, default: T) -> Result<T, AppError> {
    match env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| AppError::Config(format!("Invalid {}: {}", name, raw))),
        Err(_) => Ok(default),
    }
}

fn secs_var(name: &str, default: u64) -> Result<Duration, AppError> {
    Ok(Duration::from_secs(parse_var(name, default)?))
}
