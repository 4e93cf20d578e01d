// src/connection/guard.rs

//! Defines `ConnectionGuard`, an RAII guard for connection resource management.

use crate::core::service::GatewayHandle;
use crate::core::state::ConnectionId;
use std::net::SocketAddr;
use tracing::debug;

/// Unregisters a connection from the gateway when its handler's scope is
/// exited, whether the client hung up, the transport failed or the handler
/// returned early.
pub struct ConnectionGuard {
    gateway: GatewayHandle,
    conn_id: ConnectionId,
    addr: Option<SocketAddr>,
}

impl ConnectionGuard {
    pub(crate) fn new(gateway: GatewayHandle, conn_id: ConnectionId, addr: Option<SocketAddr>) -> Self {
        Self {
            gateway,
            conn_id,
            addr,
        }
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        debug!(
            "ConnectionGuard dropping, unregistering connection {} ({:?}).",
            self.conn_id, self.addr
        );
        self.gateway.close(self.conn_id);
    }
}
