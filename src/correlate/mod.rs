// src/correlate/mod.rs
//! Per-call correlation: filters the event feed down to fresh inbound
//! rings, dedups channel legs and retries, and hands each new call to the
//! resolver without blocking the read loop.

pub mod record;
pub mod ring;

pub use record::{CallRecord, DispatchState};
pub use ring::{detect_ring, Ring};

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info, warn};

use crate::ami::RawEvent;
use crate::config::PhoneRule;
use crate::notify::{CallOutcome, Notification};
use crate::phone;
use crate::resolve::{Lookup, Resolver};

type CallTable = Arc<Mutex<HashMap<String, CallRecord>>>;

pub struct Correlator {
    watch_channel: String,
    phone_rule: PhoneRule,
    call_ttl: Duration,
    table: CallTable,
    resolver: Arc<Resolver>,
    notify_tx: mpsc::Sender<Notification>,
}

impl Correlator {
    pub fn new(
        watch_channel: String,
        phone_rule: PhoneRule,
        call_ttl: Duration,
        resolver: Arc<Resolver>,
        notify_tx: mpsc::Sender<Notification>,
    ) -> Self {
        Self {
            watch_channel,
            phone_rule,
            call_ttl,
            table: Arc::new(Mutex::new(HashMap::new())),
            resolver,
            notify_tx,
        }
    }

    /// Consume the subscriber feed until the session manager closes it.
    pub async fn run(self, mut events: mpsc::Receiver<RawEvent>) {
        while let Some(event) = events.recv().await {
            self.handle_event(&event).await;
        }
        debug!("Event feed closed, correlator stopping");
    }

    /// Process one decoded event. Returns quickly: resolution happens on a
    /// spawned task, never inline.
    pub async fn handle_event(&self, event: &RawEvent) {
        let Some(ring) = detect_ring(event, &self.watch_channel) else {
            return;
        };

        let number = phone::canonicalize(&ring.caller, &self.phone_rule);
        if number.is_empty() {
            debug!("Ring {} carried no usable digits: {:?}", ring.call_id, ring.caller);
            return;
        }

        {
            let mut table = self.table.lock().await;
            Self::evict_stale(&mut table, self.call_ttl);

            match table.get(&ring.call_id) {
                // Another leg of a call we are already handling or have
                // already dispatched: silently absorbed.
                Some(record) if record.state != DispatchState::Expired => {
                    debug!("Duplicate ring for {}, ignoring", ring.call_id);
                    return;
                }
                // Expired means a prior lookup failed; treat this ring as a
                // brand-new call so resolution gets another chance.
                Some(_) => {
                    info!("Retrying previously failed call {}", ring.call_id);
                }
                None => {}
            }

            table.insert(ring.call_id.clone(), CallRecord::new(number.clone()));
        }

        info!("Incoming call {} from {}", ring.call_id, number);
        self.spawn_resolution(ring.call_id, number);
    }

    fn spawn_resolution(&self, call_id: String, number: String) {
        let resolver = self.resolver.clone();
        let table = self.table.clone();
        let notify_tx = self.notify_tx.clone();

        tokio::spawn(async move {
            let outcome = match resolver.resolve(&number).await {
                Ok(Lookup::Found(profile)) => CallOutcome::Customer(profile),
                Ok(Lookup::NotFound) => CallOutcome::Unknown,
                Err(e) => {
                    warn!("Resolution failed for call {}: {}", call_id, e);
                    CallOutcome::LookupFailed
                }
            };

            let next_state = if matches!(outcome, CallOutcome::LookupFailed) {
                DispatchState::Expired
            } else {
                DispatchState::Dispatched
            };

            // Atomic check-and-set against a duplicate-ring race: only the
            // task that moves the record out of Pending may dispatch.
            {
                let mut table = table.lock().await;
                match table.get_mut(&call_id) {
                    Some(record) if record.state == DispatchState::Pending => {
                        record.state = next_state;
                    }
                    Some(_) => return,
                    // Evicted while we were resolving (e.g. after a
                    // disconnect); the result is still worth delivering.
                    None => {}
                }
            }

            if notify_tx
                .send(Notification {
                    call_id,
                    number,
                    outcome,
                })
                .await
                .is_err()
            {
                debug!("Notification receiver closed");
            }
        });
    }

    fn evict_stale(table: &mut HashMap<String, CallRecord>, ttl: Duration) {
        table.retain(|_, record| record.first_seen.elapsed() < ttl);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ResolverConfig;
    use crate::shop::types::Billing;
    use crate::shop::{Customer, MockCustomerBackend};
    use tokio::time::{advance, sleep};

    fn ring_event(call_id: &str, caller: &str) -> RawEvent {
        let mut event = RawEvent::new();
        event.push("Event".to_string(), "DialBegin".to_string());
        event.push("CallerIDNum".to_string(), caller.to_string());
        event.push("DestChannel".to_string(), "SIP/1034-00000abc".to_string());
        event.push("Linkedid".to_string(), call_id.to_string());
        event
    }

    fn customer(id: u64, phone: &str) -> Customer {
        Customer {
            id,
            first_name: "Test".to_string(),
            last_name: "Customer".to_string(),
            email: String::new(),
            billing: Billing {
                phone: phone.to_string(),
                ..Billing::default()
            },
        }
    }

    fn resolver_config() -> ResolverConfig {
        ResolverConfig {
            cache_ttl: Duration::from_secs(300),
            attempts: 2,
            retry_backoff: Duration::from_millis(5),
            max_concurrency: 4,
            call_ttl: Duration::from_secs(600),
        }
    }

    fn correlator_with(
        backend: MockCustomerBackend,
        call_ttl: Duration,
    ) -> (Correlator, mpsc::Receiver<Notification>) {
        let resolver = Arc::new(Resolver::new(
            Arc::new(backend),
            PhoneRule::default(),
            resolver_config(),
        ));
        let (notify_tx, notify_rx) = mpsc::channel(16);
        let correlator = Correlator::new(
            "SIP/1034".to_string(),
            PhoneRule::default(),
            call_ttl,
            resolver,
            notify_tx,
        );
        (correlator, notify_rx)
    }

    #[tokio::test]
    async fn double_ring_same_call_id_dispatches_once() {
        let mut backend = MockCustomerBackend::new();
        backend
            .expect_search_customers()
            .times(1)
            .returning(|_| Ok(vec![customer(7, "5551234567")]));
        backend
            .expect_fetch_orders()
            .times(1)
            .returning(|_| Ok(Vec::new()));

        let (correlator, mut notify_rx) =
            correlator_with(backend, Duration::from_secs(600));

        // Two legs of the same call, 50ms apart, before resolution is done.
        correlator.handle_event(&ring_event("C-42", "5551234567")).await;
        sleep(Duration::from_millis(50)).await;
        correlator.handle_event(&ring_event("C-42", "5551234567")).await;

        let notification = notify_rx.recv().await.expect("one notification");
        assert_eq!(notification.call_id, "C-42");
        assert_eq!(notification.number, "5551234567");
        assert!(matches!(notification.outcome, CallOutcome::Customer(_)));

        // No second dispatch.
        sleep(Duration::from_millis(100)).await;
        assert!(notify_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn ring_after_dispatch_is_a_no_op() {
        let mut backend = MockCustomerBackend::new();
        backend
            .expect_search_customers()
            .times(1)
            .returning(|_| Ok(Vec::new()));

        let (correlator, mut notify_rx) =
            correlator_with(backend, Duration::from_secs(600));

        correlator.handle_event(&ring_event("C-1", "5551234567")).await;
        let first = notify_rx.recv().await.expect("notification");
        assert!(matches!(first.outcome, CallOutcome::Unknown));

        correlator.handle_event(&ring_event("C-1", "5551234567")).await;
        sleep(Duration::from_millis(50)).await;
        assert!(notify_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn failed_lookup_expires_record_and_reports_failure() {
        let mut backend = MockCustomerBackend::new();
        backend
            .expect_search_customers()
            .times(2)
            .returning(|_| Err(crate::shop::ShopError::Http(503)));

        let (correlator, mut notify_rx) =
            correlator_with(backend, Duration::from_secs(600));

        correlator.handle_event(&ring_event("C-9", "5551234567")).await;
        let notification = notify_rx.recv().await.expect("notification");
        assert!(matches!(notification.outcome, CallOutcome::LookupFailed));

        let table = correlator.table.lock().await;
        assert_eq!(table.get("C-9").expect("record").state, DispatchState::Expired);
    }

    #[tokio::test]
    async fn expired_call_rings_again_as_new() {
        let mut backend = MockCustomerBackend::new();
        let mut seq = mockall::Sequence::new();
        // First call: both attempts fail. Second call: succeeds.
        backend
            .expect_search_customers()
            .times(2)
            .in_sequence(&mut seq)
            .returning(|_| Err(crate::shop::ShopError::Http(503)));
        backend
            .expect_search_customers()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(Vec::new()));

        let (correlator, mut notify_rx) =
            correlator_with(backend, Duration::from_secs(600));

        correlator.handle_event(&ring_event("C-7", "5551234567")).await;
        let failed = notify_rx.recv().await.expect("failure notification");
        assert!(matches!(failed.outcome, CallOutcome::LookupFailed));

        correlator.handle_event(&ring_event("C-7", "5551234567")).await;
        let retried = notify_rx.recv().await.expect("retry notification");
        assert!(matches!(retried.outcome, CallOutcome::Unknown));
    }

    #[tokio::test(start_paused = true)]
    async fn stale_records_are_evicted_lazily() {
        let mut backend = MockCustomerBackend::new();
        backend
            .expect_search_customers()
            .returning(|_| Ok(Vec::new()));

        let (correlator, mut notify_rx) = correlator_with(backend, Duration::from_secs(60));

        correlator.handle_event(&ring_event("C-old", "5551234567")).await;
        notify_rx.recv().await.expect("notification");

        advance(Duration::from_secs(61)).await;

        // The next qualifying event sweeps the stale record out.
        correlator.handle_event(&ring_event("C-new", "5559876543")).await;
        notify_rx.recv().await.expect("notification");

        let table = correlator.table.lock().await;
        assert!(!table.contains_key("C-old"));
        assert!(table.contains_key("C-new"));
    }

    #[tokio::test]
    async fn non_ring_events_have_no_side_effects() {
        let backend = MockCustomerBackend::new();
        let (correlator, mut notify_rx) =
            correlator_with(backend, Duration::from_secs(600));

        let mut event = RawEvent::new();
        event.push("Event".to_string(), "Hangup".to_string());
        event.push("Linkedid".to_string(), "C-5".to_string());
        correlator.handle_event(&event).await;

        sleep(Duration::from_millis(20)).await;
        assert!(notify_rx.try_recv().is_err());
        assert!(correlator.table.lock().await.is_empty());
    }
}
