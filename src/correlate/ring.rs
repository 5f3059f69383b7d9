// src/correlate/ring.rs
//! Inbound-ring detection over raw manager events.
//!
//! Asterisk announces a call reaching an extension through several event
//! paths depending on dialplan and version, so three detection methods are
//! tried in order; the first match wins. Everything else is discarded.

use crate::ami::RawEvent;

/// A qualifying ring: one physical call alerting the watched channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ring {
    /// Linkedid (shared by all legs of the call), falling back to Uniqueid.
    pub call_id: String,
    /// Raw caller-ID string as it appeared on the wire.
    pub caller: String,
}

/// Caller-ID values Asterisk substitutes when the real number is unknown.
const PLACEHOLDER_CALLERS: &[&str] = &["", "s", "anonymous", "<unknown>"];

fn is_placeholder(caller: &str) -> bool {
    PLACEHOLDER_CALLERS
        .iter()
        .any(|p| caller.eq_ignore_ascii_case(p))
}

fn clean_caller(raw: Option<&str>) -> Option<&str> {
    raw.filter(|c| !is_placeholder(c))
}

/// Channel name up to the first `-` (the per-leg suffix), e.g.
/// `SIP/1034-00000abc` -> `SIP/1034`.
fn channel_base(channel: &str) -> &str {
    channel.split('-').next().unwrap_or(channel)
}

fn watches(channel: Option<&str>, watch: &str) -> bool {
    channel.is_some_and(|c| channel_base(c).eq_ignore_ascii_case(watch))
}

/// Decide whether this event is a fresh inbound ring on the watched channel.
///
/// Method 1: `DialBegin` toward the watched channel - usually the earliest
/// signal. Method 2: `DialState` with `Ringing` toward it. Method 3:
/// `Newstate`/`Ringing` on the channel itself, where the external caller
/// sits in `ConnectedLineNum` (with `CallerIDNum` as fallback).
pub fn detect_ring(event: &RawEvent, watch_channel: &str) -> Option<Ring> {
    let caller = match event.event_type()? {
        "DialBegin" if watches(event.dest_channel(), watch_channel) => {
            clean_caller(event.caller_id_num())
        }
        "DialState"
            if event.state_desc() == Some("Ringing")
                && watches(event.dest_channel(), watch_channel) =>
        {
            clean_caller(event.caller_id_num())
        }
        "Newstate"
            if event.state_desc() == Some("Ringing")
                && watches(event.channel(), watch_channel) =>
        {
            clean_caller(event.connected_line_num())
                .or_else(|| clean_caller(event.caller_id_num()))
        }
        _ => None,
    }?;

    Some(Ring {
        call_id: event.linked_id()?.to_string(),
        caller: caller.to_string(),
    })
}
