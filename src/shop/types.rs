// src/shop/types.rs
use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::str::FromStr;

// ---------------------------------------------------------------------------
// Wire types (WooCommerce wc/v3 payload subset)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct Customer {
    pub id: u64,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub billing: Billing,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Billing {
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub address_1: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub postcode: String,
    #[serde(default)]
    pub country: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Order {
    pub id: u64,
    #[serde(default)]
    pub status: String,
    /// Monetary amount as a string, per the WooCommerce API.
    #[serde(default)]
    pub total: String,
    pub date_created: Option<NaiveDateTime>,
    #[serde(default)]
    pub line_items: Vec<LineItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LineItem {
    pub name: String,
    #[serde(default)]
    pub quantity: i64,
}

// ---------------------------------------------------------------------------
// Resolved profile handed to the dispatcher
// ---------------------------------------------------------------------------

/// Immutable customer snapshot built from one customer record plus their
/// order history.
#[derive(Debug, Clone)]
pub struct CustomerProfile {
    pub customer_id: u64,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub order_count: usize,
    pub lifetime_spend: Decimal,
    pub last_order: Option<OrderSummary>,
}

#[derive(Debug, Clone)]
pub struct OrderSummary {
    pub order_id: u64,
    pub status: String,
    pub total: Decimal,
    pub date: Option<NaiveDateTime>,
    pub items: Vec<OrderLine>,
}

#[derive(Debug, Clone)]
pub struct OrderLine {
    pub name: String,
    pub quantity: i64,
}

impl CustomerProfile {
    /// Aggregate a customer and their orders. Lifetime spend is the decimal
    /// sum over order totals; unparsable totals count as zero. The most
    /// recent order (by creation date, falling back to highest id) becomes
    /// the summary.
    pub fn from_parts(customer: &Customer, orders: &[Order]) -> Self {
        let lifetime_spend: Decimal = orders.iter().map(order_total).sum();

        let last_order = orders
            .iter()
            .max_by_key(|o| (o.date_created, o.id))
            .map(|order| OrderSummary {
                order_id: order.id,
                status: order.status.clone(),
                total: order_total(order),
                date: order.date_created,
                items: order
                    .line_items
                    .iter()
                    .map(|item| OrderLine {
                        name: item.name.clone(),
                        quantity: item.quantity,
                    })
                    .collect(),
            });

        let name = format!("{} {}", customer.first_name, customer.last_name)
            .trim()
            .to_string();

        let billing = &customer.billing;
        let address = [
            billing.address_1.as_str(),
            billing.city.as_str(),
            billing.postcode.as_str(),
            billing.country.as_str(),
        ]
        .iter()
        .filter(|part| !part.is_empty())
        .cloned()
        .collect::<Vec<_>>()
        .join(", ");

        Self {
            customer_id: customer.id,
            name,
            email: customer.email.clone(),
            phone: billing.phone.clone(),
            address,
            order_count: orders.len(),
            lifetime_spend,
            last_order,
        }
    }
}

fn order_total(order: &Order) -> Decimal {
    Decimal::from_str(&order.total).unwrap_or_default()
}
