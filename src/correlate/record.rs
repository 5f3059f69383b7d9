// src/correlate/record.rs
use tokio::time::Instant;

/// Dispatch lifecycle of one call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchState {
    /// Resolution in flight.
    Pending,
    /// Result delivered. At most one transition into this state per call id.
    Dispatched,
    /// Resolution failed; a later ring for this id starts over.
    Expired,
}

/// One in-progress or recently-seen call.
#[derive(Debug, Clone)]
pub struct CallRecord {
    pub number: String,
    pub first_seen: Instant,
    pub state: DispatchState,
}

impl CallRecord {
    pub fn new(number: String) -> Self {
        Self {
            number,
            first_seen: Instant::now(),
            state: DispatchState::Pending,
        }
    }
}
