// src/core/handler/gate.rs

//! The per-connection authorization gate.
//!
//! `STARTTLS` and `PASS` are always accepted. Every other verb needs an
//! authorized connection; otherwise the client gets `UNAUTHORIZED <verb>` and
//! the profile is never touched. Authorization only ever goes one way.

use crate::core::commands::{Command, Verb};
use crate::core::profile::MessagingProfile;
use crate::core::state::{ConnectionId, GatewayState};
use tracing::{debug, info, info_span, warn};

impl<P: MessagingProfile> GatewayState<P> {
    /// Processes one inbound line from `conn_id`. Responses are queued on the
    /// connection's outbound channel in order.
    pub fn submit(&mut self, conn_id: ConnectionId, line: &str) {
        let Some(command) = Command::parse(line) else {
            debug!("Connection {}: ignoring blank line.", conn_id);
            return;
        };

        let span = info_span!("command", name = %command.name, conn.id = conn_id);
        let _entered = span.enter();

        let Some(authorized) = self.registry.get(conn_id).map(|c| c.is_authorized()) else {
            warn!("Line from unregistered connection {} dropped.", conn_id);
            return;
        };

        if !authorized && !command.verb.bypasses_authorization() {
            debug!("Connection {}: {} refused, not authorized.", conn_id, command.name);
            if let Some(connection) = self.registry.get(conn_id) {
                connection.send_line(format!("UNAUTHORIZED {}", command.name));
            }
            return;
        }

        match command.verb {
            Verb::Starttls => self.handle_starttls(conn_id),
            Verb::Pass => self.handle_pass(conn_id, command.args()),
            _ => match self.dispatch(&command) {
                Ok(responses) => {
                    if let Some(connection) = self.registry.get(conn_id) {
                        for response in responses {
                            connection.send_line(response);
                        }
                    }
                }
                Err(e) => {
                    warn!(
                        "Connection {}: command {} failed: {}",
                        conn_id, command.name, e
                    );
                }
            },
        }
    }

    fn handle_starttls(&mut self, conn_id: ConnectionId) {
        let Some(connection) = self.registry.get(conn_id) else {
            return;
        };
        if !connection.kind.supports_tls() {
            debug!(
                "Connection {}: STARTTLS ignored, transport cannot be upgraded.",
                conn_id
            );
            return;
        }
        match &connection.tls {
            Some(tls) => debug!(
                "Connection {}: upgrading to TLS with {}.",
                conn_id, tls.cert_path
            ),
            None => debug!(
                "Connection {}: upgrading to TLS with an ephemeral certificate.",
                conn_id
            ),
        }
        connection.request_start_tls();
    }

    fn handle_pass(&mut self, conn_id: ConnectionId, supplied: Option<&str>) {
        let accepted = match self.password() {
            None => true,
            Some(expected) => supplied == Some(expected),
        };
        if !accepted {
            debug!("Connection {}: wrong password.", conn_id);
            return;
        }

        let session_id = self.profile.session_id();
        if let Some(connection) = self.registry.get_mut(conn_id) {
            connection.authorize();
            info!("Connection {} authorized.", conn_id);
            connection.send_line(format!("AUTHORIZED {session_id}"));
        }
    }
}
