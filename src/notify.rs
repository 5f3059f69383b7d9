// src/notify.rs
//! Dispatcher boundary: the channel contract consumed by the UI layer.
//!
//! The correlator guarantees at most one [`Notification`] per call id, and
//! delivery always happens off the socket read loop.

use std::sync::Arc;

use crate::shop::CustomerProfile;

#[derive(Debug, Clone)]
pub struct Notification {
    /// Call unique identifier (Linkedid).
    pub call_id: String,
    /// Canonical caller number.
    pub number: String,
    pub outcome: CallOutcome,
}

#[derive(Debug, Clone)]
pub enum CallOutcome {
    /// Caller matched a known customer.
    Customer(Arc<CustomerProfile>),
    /// Lookup succeeded and found nobody: a genuinely new caller.
    Unknown,
    /// Lookup failed after retries. Distinct from [`CallOutcome::Unknown`]
    /// so the operator can tell a broken backend from a new customer.
    LookupFailed,
}
