// src/ami/client.rs
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch, Notify};
use tokio::time::sleep;
use tracing::{error, info, warn};

use crate::ami::{AmiConnection, AmiError, RawEvent};
use crate::config::AmiConfig;

/// Process-wide session lifecycle, published to the UI boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connecting,
    Authenticating,
    Connected,
    /// Credential rejection. Terminal: operator intervention required.
    AuthFailed,
}

/// External trigger for an immediate reconnect attempt.
///
/// Resets the backoff and pre-empts a pending scheduled retry. A trigger
/// fired while connected stores a permit, so the next scheduled wait is
/// skipped; it does not tear down a healthy session.
#[derive(Clone)]
pub struct ReconnectHandle(Arc<Notify>);

impl ReconnectHandle {
    pub fn trigger(&self) {
        self.0.notify_one();
    }
}

/// Owns the manager session: connects, authenticates, forwards decoded
/// events in wire order, and reconnects with capped exponential backoff on
/// any transport failure. Credential rejection is reported once and never
/// retried.
pub struct AmiClient {
    config: AmiConfig,
    events_tx: mpsc::Sender<RawEvent>,
    state_tx: watch::Sender<SessionState>,
    reconnect: Arc<Notify>,
}

impl AmiClient {
    pub fn new(
        config: AmiConfig,
        events_tx: mpsc::Sender<RawEvent>,
    ) -> (Self, watch::Receiver<SessionState>, ReconnectHandle) {
        let (state_tx, state_rx) = watch::channel(SessionState::Disconnected);
        let reconnect = Arc::new(Notify::new());
        let handle = ReconnectHandle(reconnect.clone());

        let client = Self {
            config,
            events_tx,
            state_tx,
            reconnect,
        };
        (client, state_rx, handle)
    }

    /// Run until the event subscriber goes away (clean shutdown) or
    /// authentication is rejected (fatal).
    pub async fn run(self) -> Result<(), AmiError> {
        let mut backoff = Backoff::new(self.config.reconnect_initial, self.config.reconnect_max);

        loop {
            self.set_state(SessionState::Connecting);

            match self.connect_and_listen(&mut backoff).await {
                Ok(()) => {
                    info!("Event subscriber closed, shutting down AMI client");
                    self.set_state(SessionState::Disconnected);
                    return Ok(());
                }
                Err(AmiError::AuthRejected(message)) => {
                    self.set_state(SessionState::AuthFailed);
                    error!(
                        "AMI authentication rejected ({}); not retrying, fix credentials and restart",
                        message
                    );
                    return Err(AmiError::AuthRejected(message));
                }
                Err(e) => {
                    warn!("AMI session error: {}", e);
                }
            }

            self.set_state(SessionState::Disconnected);

            let delay = backoff.next_delay();
            info!("Reconnecting to AMI in {:?}", delay);
            tokio::select! {
                _ = sleep(delay) => {}
                _ = self.reconnect.notified() => {
                    info!("Manual reconnect requested");
                    backoff.reset();
                }
            }
        }
    }

    async fn connect_and_listen(&self, backoff: &mut Backoff) -> Result<(), AmiError> {
        let mut connection = AmiConnection::open(&self.config).await?;

        self.set_state(SessionState::Authenticating);
        connection
            .login(
                &self.config.username,
                &self.config.secret,
                self.config.handshake_timeout,
            )
            .await?;

        self.set_state(SessionState::Connected);
        backoff.reset();
        info!("Connected to AMI: {}", connection.server_id());

        loop {
            match connection.read_event().await? {
                Some(event) => {
                    if self.events_tx.send(event).await.is_err() {
                        return Ok(());
                    }
                }
                None => return Err(AmiError::ConnectionClosed),
            }
        }
    }

    fn set_state(&self, state: SessionState) {
        // send_replace never fails even with no receivers.
        self.state_tx.send_replace(state);
    }
}

/// Exponential backoff: doubles from the initial delay up to the cap,
/// unlimited attempts.
#[derive(Debug)]
pub(crate) struct Backoff {
    initial: Duration,
    max: Duration,
    next: Duration,
}

impl Backoff {
    pub(crate) fn new(initial: Duration, max: Duration) -> Self {
        Self {
            initial,
            max,
            next: initial,
        }
    }

    pub(crate) fn next_delay(&mut self) -> Duration {
        let delay = self.next;
        self.next = (self.next * 2).min(self.max);
        delay
    }

    pub(crate) fn reset(&mut self) {
        self.next = self.initial;
    }
}
