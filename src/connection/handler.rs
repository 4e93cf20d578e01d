// src/connection/handler.rs

//! Defines the `LineConnectionHandler` which manages the full lifecycle of a
//! line-protocol client connection.

use super::codec::LineCodec;
use super::guard::ConnectionGuard;
use crate::core::GatewayError;
use crate::core::service::GatewayHandle;
use crate::core::state::{ConnectionId, Outbound, OutboundReceiver, TransportKind};
use crate::server::{AnyStream, Rewind};
use futures::{SinkExt, StreamExt};
use std::net::SocketAddr;
use tokio::net::TcpStream;
use tokio::sync::{broadcast, mpsc};
use tokio_rustls::TlsAcceptor;
use tokio_util::codec::Framed;
use tracing::{debug, info, warn};

/// Owns one line-protocol socket. Each inbound line is handed to the gateway
/// and acknowledged before the next one is read, so responses go out in
/// command order and a `STARTTLS` upgrade finishes before anything else is
/// read from the client.
pub struct LineConnectionHandler {
    framed: Option<Framed<AnyStream, LineCodec>>,
    addr: SocketAddr,
    conn_id: ConnectionId,
    gateway: GatewayHandle,
    outbound_rx: OutboundReceiver,
    acceptor: TlsAcceptor,
    shutdown_rx: broadcast::Receiver<()>,
}

impl LineConnectionHandler {
    /// Registers the connection with the gateway.
    pub fn new(
        socket: TcpStream,
        addr: SocketAddr,
        gateway: GatewayHandle,
        acceptor: TlsAcceptor,
        shutdown_rx: broadcast::Receiver<()>,
    ) -> Result<Self, GatewayError> {
        let conn_id = gateway.next_connection_id();
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        gateway.open(conn_id, TransportKind::Line, Some(addr), outbound_tx)?;
        Ok(Self {
            framed: Some(Framed::new(AnyStream::Tcp(socket), LineCodec::new())),
            addr,
            conn_id,
            gateway,
            outbound_rx,
            acceptor,
            shutdown_rx,
        })
    }

    pub fn id(&self) -> ConnectionId {
        self.conn_id
    }

    /// The main event loop for the connection.
    pub async fn run(&mut self) -> Result<(), GatewayError> {
        let _guard = ConnectionGuard::new(self.gateway.clone(), self.conn_id, Some(self.addr));
        loop {
            let Some(framed) = self.framed.as_mut() else {
                return Err(GatewayError::Internal("connection stream lost".into()));
            };
            tokio::select! {
                biased;
                _ = self.shutdown_rx.recv() => {
                    debug!("Connection {} received shutdown signal.", self.addr);
                    break;
                }
                outbound = self.outbound_rx.recv() => match outbound {
                    Some(item) => self.deliver(item).await?,
                    None => break,
                },
                result = framed.next() => match result {
                    Some(Ok(line)) => {
                        self.gateway.submit_line_and_wait(self.conn_id, line).await?;
                        self.flush_outbound().await?;
                    }
                    Some(Err(e)) => {
                        if is_normal_disconnect(&e) {
                            debug!("Connection from {} closed by peer: {}", self.addr, e);
                        } else {
                            warn!("Connection error for {}: {}", self.addr, e);
                        }
                        break;
                    }
                    None => {
                        debug!("Connection from {} closed by peer.", self.addr);
                        break;
                    }
                },
            }
        }
        Ok(())
    }

    fn framed_mut(&mut self) -> Result<&mut Framed<AnyStream, LineCodec>, GatewayError> {
        self.framed
            .as_mut()
            .ok_or_else(|| GatewayError::Internal("connection stream lost".into()))
    }

    /// Writes everything the gateway queued while handling the last line.
    async fn flush_outbound(&mut self) -> Result<(), GatewayError> {
        while let Ok(item) = self.outbound_rx.try_recv() {
            self.deliver(item).await?;
        }
        Ok(())
    }

    async fn deliver(&mut self, item: Outbound) -> Result<(), GatewayError> {
        match item {
            Outbound::Line(line) => self.framed_mut()?.send(line).await,
            Outbound::StartTls => self.start_tls().await,
        }
    }

    /// Swaps the plain socket for a TLS session. Bytes the codec already read
    /// past the `STARTTLS` line belong to the handshake and are replayed.
    async fn start_tls(&mut self) -> Result<(), GatewayError> {
        let framed = self
            .framed
            .take()
            .ok_or_else(|| GatewayError::Internal("connection stream lost".into()))?;
        if framed.get_ref().is_tls() {
            warn!("Connection {} asked for STARTTLS twice.", self.addr);
            self.framed = Some(framed);
            return Ok(());
        }

        let parts = framed.into_parts();
        let buffered = parts.read_buf.freeze();
        let AnyStream::Tcp(socket) = parts.io else {
            return Err(GatewayError::Internal("stream is already encrypted".into()));
        };

        let tls = self
            .acceptor
            .accept(Rewind::new(buffered, socket))
            .await
            .map_err(|e| GatewayError::Tls(e.to_string()))?;
        self.framed = Some(Framed::new(AnyStream::Tls(Box::new(tls)), LineCodec::new()));
        info!("Connection {} upgraded to TLS.", self.addr);
        Ok(())
    }
}

fn is_normal_disconnect(e: &GatewayError) -> bool {
    matches!(e, GatewayError::Io(arc_err) if matches!(
        arc_err.kind(),
        std::io::ErrorKind::ConnectionReset
            | std::io::ErrorKind::BrokenPipe
            | std::io::ErrorKind::UnexpectedEof
            | std::io::ErrorKind::ConnectionAborted
    ))
}
