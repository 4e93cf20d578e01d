// src/core/state/client.rs

//! Contains state definitions related to client connections.

use crate::config::TlsConfig;
use indexmap::IndexMap;
use std::net::SocketAddr;
use tokio::sync::mpsc;
use tracing::debug;

pub type ConnectionId = u64;

/// An item queued for delivery to one connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    /// A protocol line, without its terminator.
    Line(String),
    /// Upgrade the transport to TLS before reading anything else.
    StartTls,
}

pub type OutboundSender = mpsc::UnboundedSender<Outbound>;
pub type OutboundReceiver = mpsc::UnboundedReceiver<Outbound>;

/// The transport a connection arrived on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    /// The line-oriented text protocol.
    Line,
    /// The browser-facing WebSocket event channel.
    EventChannel,
}

impl TransportKind {
    pub fn supports_tls(self) -> bool {
        matches!(self, TransportKind::Line)
    }

    pub fn supports_event_channel(self) -> bool {
        matches!(self, TransportKind::EventChannel)
    }
}

/// Which connections a broadcast line is delivered to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Audience {
    Authorized,
    /// Unauthorized connections too. Nothing in the default command set uses this.
    Everyone,
}

/// One live client session.
#[derive(Debug)]
pub struct Connection {
    pub id: ConnectionId,
    pub kind: TransportKind,
    pub addr: Option<SocketAddr>,
    pub tls: Option<TlsConfig>,
    authorized: bool,
    outbound: OutboundSender,
}

impl Connection {
    pub fn new(
        id: ConnectionId,
        kind: TransportKind,
        addr: Option<SocketAddr>,
        tls: Option<TlsConfig>,
        authorized: bool,
        outbound: OutboundSender,
    ) -> Self {
        Self {
            id,
            kind,
            addr,
            tls,
            authorized,
            outbound,
        }
    }

    pub fn is_authorized(&self) -> bool {
        self.authorized
    }

    /// Marks the connection authorized. There is no way back.
    pub(crate) fn authorize(&mut self) {
        self.authorized = true;
    }

    /// Queues a line. A closed connection drops it silently; its task reports
    /// the disconnect on its own.
    pub fn send_line(&self, line: impl Into<String>) {
        if self.outbound.send(Outbound::Line(line.into())).is_err() {
            debug!("Connection {} is gone, dropping line.", self.id);
        }
    }

    pub(crate) fn request_start_tls(&self) {
        if self.outbound.send(Outbound::StartTls).is_err() {
            debug!("Connection {} is gone, dropping STARTTLS.", self.id);
        }
    }
}

/// Live connections in registration order.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    connections: IndexMap<ConnectionId, Connection>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, connection: Connection) {
        self.connections.insert(connection.id, connection);
    }

    /// Removes a connection, keeping the order of the others intact.
    pub fn remove(&mut self, id: ConnectionId) -> Option<Connection> {
        self.connections.shift_remove(&id)
    }

    pub fn get(&self, id: ConnectionId) -> Option<&Connection> {
        self.connections.get(&id)
    }

    pub fn get_mut(&mut self, id: ConnectionId) -> Option<&mut Connection> {
        self.connections.get_mut(&id)
    }

    pub fn for_each<F: FnMut(&Connection)>(&self, f: F) {
        self.connections.values().for_each(f);
    }

    pub fn for_each_authorized<F: FnMut(&Connection)>(&self, f: F) {
        self.connections
            .values()
            .filter(|connection| connection.is_authorized())
            .for_each(f);
    }

    /// Fans `line` out to `audience` in registration order.
    pub fn broadcast(&self, line: &str, audience: Audience) {
        match audience {
            Audience::Authorized => self.for_each_authorized(|c| c.send_line(line)),
            Audience::Everyone => self.for_each(|c| c.send_line(line)),
        }
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}
