// src/main.rs
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};

use callpop::ami::{AmiClient, SessionState};
use callpop::correlate::Correlator;
use callpop::notify::{CallOutcome, Notification};
use callpop::resolve::Resolver;
use callpop::shop::WooClient;
use callpop::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    info!("Starting callpop");

    let config = Config::from_env()?;
    info!(
        "Watching {} on {}:{}",
        config.ami.watch_channel, config.ami.host, config.ami.port
    );

    let backend = Arc::new(WooClient::new(&config.shop)?);
    let resolver = Arc::new(Resolver::new(
        backend,
        config.phone.clone(),
        config.resolver.clone(),
    ));

    let (events_tx, events_rx) = mpsc::channel(256);
    let (notify_tx, notify_rx) = mpsc::channel(32);

    let correlator = Correlator::new(
        config.ami.watch_channel.clone(),
        config.phone.clone(),
        config.resolver.call_ttl,
        resolver,
        notify_tx,
    );
    tokio::spawn(correlator.run(events_rx));

    // Dispatcher boundary: the popup UI consumes this feed. Until it is
    // wired in, resolved calls land in the log.
    tokio::spawn(consume_notifications(notify_rx));

    let (client, mut state_rx, _reconnect_handle) =
        AmiClient::new(config.ami.clone(), events_tx);

    // Session state observer for the tray indicator.
    tokio::spawn(async move {
        while state_rx.changed().await.is_ok() {
            let state = *state_rx.borrow();
            info!("AMI session state: {:?}", state);
            if state == SessionState::AuthFailed {
                warn!("Operator action required: fix AMI credentials and restart");
            }
        }
    });

    client.run().await?;
    Ok(())
}

async fn consume_notifications(mut notify_rx: mpsc::Receiver<Notification>) {
    while let Some(notification) = notify_rx.recv().await {
        match &notification.outcome {
            CallOutcome::Customer(profile) => info!(
                "Call {} from {}: {} <{}>, {} orders, lifetime {}",
                notification.call_id,
                notification.number,
                profile.name,
                profile.email,
                profile.order_count,
                profile.lifetime_spend,
            ),
            CallOutcome::Unknown => info!(
                "Call {} from {}: unknown caller",
                notification.call_id, notification.number
            ),
            CallOutcome::LookupFailed => warn!(
                "Call {} from {}: customer lookup failed",
                notification.call_id, notification.number
            ),
        }
    }
}
