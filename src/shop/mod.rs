// src/shop/mod.rs
//! WooCommerce REST backend: customer search and order history.

pub mod client;
pub mod types;

pub use client::{CustomerBackend, ShopError, WooClient};
pub use types::{Customer, CustomerProfile, Order, OrderLine, OrderSummary};

#[cfg(test)]
pub use client::MockCustomerBackend;
