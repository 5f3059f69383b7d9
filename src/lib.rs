// src/lib.rs
//! Caller-ID popup core.
//!
//! Watches an Asterisk AMI session for inbound rings on one extension,
//! resolves the caller against a WooCommerce shop, and emits at-most-one
//! notification per call:
//!
//! ```text
//! socket bytes -> AmiCodec -> RawEvent -> Correlator -> Resolver -> Notification
//! ```

pub mod ami;
pub mod config;
pub mod correlate;
pub mod error;
pub mod notify;
pub mod phone;
pub mod resolve;
pub mod shop;

pub use config::Config;
pub use error::AppError;
