// src/core/state/core.rs

//! Defines `GatewayState`, the single owned context holding every piece of
//! mutable gateway state. It is driven from one task only, so nothing in it
//! needs a lock.

use super::buddies::KnownBuddies;
use super::client::{
    Connection, ConnectionId, ConnectionRegistry, OutboundSender, TransportKind,
};
use crate::config::{Config, TlsConfig};
use crate::core::latency::LatencyTracker;
use crate::core::profile::MessagingProfile;
use std::net::SocketAddr;
use tokio::time::Instant;
use tracing::{debug, info};

pub struct GatewayState<P> {
    pub(crate) profile: P,
    password: Option<String>,
    tls: Option<TlsConfig>,
    pub registry: ConnectionRegistry,
    pub pings: LatencyTracker,
    pub known_buddies: KnownBuddies,
}

impl<P: MessagingProfile> GatewayState<P> {
    pub fn new(profile: P, password: Option<String>, tls: Option<TlsConfig>) -> Self {
        Self {
            profile,
            password,
            tls,
            registry: ConnectionRegistry::new(),
            pings: LatencyTracker::new(),
            known_buddies: KnownBuddies::new(),
        }
    }

    pub fn from_config(profile: P, config: &Config) -> Self {
        Self::new(profile, config.password.clone(), config.tls.clone())
    }

    pub fn profile(&self) -> &P {
        &self.profile
    }

    pub fn profile_mut(&mut self) -> &mut P {
        &mut self.profile
    }

    pub(crate) fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }

    /// Registers a connection. Without a configured password it starts authorized.
    pub fn open_connection(
        &mut self,
        id: ConnectionId,
        kind: TransportKind,
        addr: Option<SocketAddr>,
        outbound: OutboundSender,
    ) {
        let authorized = self.password.is_none();
        let tls = kind.supports_tls().then(|| self.tls.clone()).flatten();
        self.registry.add(Connection::new(
            id, kind, addr, tls, authorized, outbound,
        ));
        debug!(
            "Connection {} ({:?}) registered, authorized: {}. {} connection(s) live.",
            id,
            kind,
            authorized,
            self.registry.len()
        );
    }

    pub fn close_connection(&mut self, id: ConnectionId) {
        if self.registry.remove(id).is_some() {
            debug!(
                "Connection {} unregistered. {} connection(s) live.",
                id,
                self.registry.len()
            );
        }
    }

    /// Drops expired latency probes.
    pub fn prune(&mut self, now: Instant) -> usize {
        let removed = self.pings.sweep(now);
        if removed > 0 {
            info!("Pruned {} expired latency probe(s).", removed);
        }
        removed
    }
}
