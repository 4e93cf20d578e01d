// src/core/latency.rs

//! Tracks outstanding latency probes so a pong can be matched back to the
//! payload the client attached to its `LATENCY` command.

use crate::core::profile::{MessagingProfile, PingId};
use crate::core::GatewayError;
use indexmap::IndexMap;
use std::time::Duration;
use tokio::time::Instant;

/// How long an unanswered probe is kept.
pub const PING_TTL: Duration = Duration::from_secs(80);

/// One probe awaiting its pong.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingPing {
    pub buddy_id: String,
    pub ping_id: PingId,
    pub issued_at: Instant,
    pub payload: String,
}

/// Outstanding probes keyed by `(buddy id, ping id)`.
#[derive(Debug, Default)]
pub struct LatencyTracker {
    pending: IndexMap<(String, PingId), PendingPing>,
}

impl LatencyTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sends a probe through the profile and records it with `payload`.
    /// Only buddies advertising the latency capability can be probed.
    pub fn ping<P: MessagingProfile>(
        &mut self,
        profile: &mut P,
        buddy_id: &str,
        payload: &str,
        now: Instant,
    ) -> Result<PingId, GatewayError> {
        let supported = profile
            .buddy(buddy_id)
            .is_some_and(|buddy| buddy.supports_latency);
        if !supported {
            return Err(GatewayError::Unsupported(buddy_id.to_string(), "latency"));
        }

        let ping_id = profile.ping(buddy_id)?;
        self.record(buddy_id, ping_id.clone(), payload, now);
        Ok(ping_id)
    }

    /// Records a probe. A second record for the same key keeps the first one.
    pub fn record(&mut self, buddy_id: &str, ping_id: PingId, payload: &str, issued_at: Instant) {
        self.pending
            .entry((buddy_id.to_string(), ping_id.clone()))
            .or_insert_with(|| PendingPing {
                buddy_id: buddy_id.to_string(),
                ping_id,
                issued_at,
                payload: payload.to_string(),
            });
    }

    /// Removes the probe and returns its payload. Unknown or expired probes yield `None`.
    pub fn resolve(&mut self, buddy_id: &str, ping_id: &PingId) -> Option<String> {
        self.pending
            .shift_remove(&(buddy_id.to_string(), ping_id.clone()))
            .map(|pending| pending.payload)
    }

    /// Drops every probe at least `PING_TTL` old. Returns how many were dropped.
    pub fn sweep(&mut self, now: Instant) -> usize {
        let before = self.pending.len();
        self.pending
            .retain(|_, pending| now.saturating_duration_since(pending.issued_at) < PING_TTL);
        before - self.pending.len()
    }

    pub fn contains(&self, buddy_id: &str, ping_id: &PingId) -> bool {
        self.pending
            .contains_key(&(buddy_id.to_string(), ping_id.clone()))
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
