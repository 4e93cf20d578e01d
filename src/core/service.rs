// src/core/service.rs

//! The gateway actor.
//!
//! `GatewayService` owns the `GatewayState` and is the only task that touches
//! it. Connection tasks, the pruning task and the profile all talk to it
//! through channels, which serializes every handler onto one context without
//! any locking. `GatewayHandle` is the cloneable sending side.

use crate::core::GatewayError;
use crate::core::profile::{MessagingProfile, ProfileEventReceiver};
use crate::core::state::{ConnectionId, GatewayState, OutboundSender, TransportKind};
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;
use tracing::{debug, info};

/// Inputs processed by the gateway actor, strictly in arrival order.
#[derive(Debug)]
pub enum GatewayMessage {
    Open {
        id: ConnectionId,
        kind: TransportKind,
        addr: Option<SocketAddr>,
        outbound: OutboundSender,
    },
    Line {
        conn: ConnectionId,
        line: String,
        /// Fired once the line has been fully handled and its responses queued.
        ack: Option<oneshot::Sender<()>>,
    },
    Close {
        conn: ConnectionId,
    },
    /// Sweep expired latency probes.
    Prune,
    /// Stop the profile and end the actor loop.
    Shutdown {
        done: oneshot::Sender<()>,
    },
}

/// A cloneable handle for feeding the gateway actor.
#[derive(Debug, Clone)]
pub struct GatewayHandle {
    tx: mpsc::UnboundedSender<GatewayMessage>,
    next_id: Arc<AtomicU64>,
}

impl GatewayHandle {
    /// Allocates a fresh connection id, unique for the life of the process.
    pub fn next_connection_id(&self) -> ConnectionId {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    pub fn open(
        &self,
        id: ConnectionId,
        kind: TransportKind,
        addr: Option<SocketAddr>,
        outbound: OutboundSender,
    ) -> Result<(), GatewayError> {
        self.send(GatewayMessage::Open {
            id,
            kind,
            addr,
            outbound,
        })
    }

    /// Queues a line without waiting for it to be handled.
    pub fn submit_line(&self, conn: ConnectionId, line: String) -> Result<(), GatewayError> {
        self.send(GatewayMessage::Line {
            conn,
            line,
            ack: None,
        })
    }

    /// Queues a line and resolves once the gateway has handled it, so every
    /// response it produced is already in the connection's outbound queue.
    pub async fn submit_line_and_wait(
        &self,
        conn: ConnectionId,
        line: String,
    ) -> Result<(), GatewayError> {
        let (ack, handled) = oneshot::channel();
        self.send(GatewayMessage::Line {
            conn,
            line,
            ack: Some(ack),
        })?;
        handled.await.map_err(|_| GatewayError::ChannelClosed)
    }

    /// Unregisters a connection. A gateway that already stopped needs no notice.
    pub fn close(&self, conn: ConnectionId) {
        if self.send(GatewayMessage::Close { conn }).is_err() {
            debug!("Gateway gone, connection {} closed after shutdown.", conn);
        }
    }

    pub fn prune(&self) -> Result<(), GatewayError> {
        self.send(GatewayMessage::Prune)
    }

    /// Asks the gateway to stop its profile and waits until it has.
    pub async fn shutdown(&self) -> Result<(), GatewayError> {
        let (done, stopped) = oneshot::channel();
        self.send(GatewayMessage::Shutdown { done })?;
        stopped.await.map_err(|_| GatewayError::ChannelClosed)
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    fn send(&self, message: GatewayMessage) -> Result<(), GatewayError> {
        self.tx.send(message).map_err(GatewayError::from)
    }
}

/// The actor owning all gateway state.
pub struct GatewayService<P> {
    state: GatewayState<P>,
    rx: mpsc::UnboundedReceiver<GatewayMessage>,
    events: ProfileEventReceiver,
}

impl<P: MessagingProfile> GatewayService<P> {
    /// Starts the profile, optionally publishes presence, and returns the
    /// actor together with its handle. Nothing runs until `run` is awaited.
    pub fn new(
        mut state: GatewayState<P>,
        online: bool,
    ) -> Result<(Self, GatewayHandle), GatewayError> {
        let (events_tx, events) = mpsc::unbounded_channel();
        state.profile_mut().start(events_tx)?;
        if online {
            state.profile_mut().go_online()?;
            info!("Profile {} is online.", state.profile().id());
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let handle = GatewayHandle {
            tx,
            next_id: Arc::new(AtomicU64::new(1)),
        };
        Ok((Self { state, rx, events }, handle))
    }

    pub fn state(&self) -> &GatewayState<P> {
        &self.state
    }

    /// Processes messages and profile events until shutdown, then hands the
    /// final state back.
    pub async fn run(mut self) -> GatewayState<P> {
        info!("Gateway service started for {}.", self.state.profile().id());
        loop {
            tokio::select! {
                biased;

                message = self.rx.recv() => match message {
                    Some(message) => {
                        if !self.handle(message) {
                            break;
                        }
                    }
                    None => {
                        debug!("Every gateway handle dropped.");
                        self.stop_profile();
                        break;
                    }
                },
                Some(event) = self.events.recv() => self.state.on_profile_event(event),
            }
        }
        info!("Gateway service stopped.");
        self.state
    }

    /// Handles one message. Returns false once the actor should stop.
    fn handle(&mut self, message: GatewayMessage) -> bool {
        match message {
            GatewayMessage::Open {
                id,
                kind,
                addr,
                outbound,
            } => self.state.open_connection(id, kind, addr, outbound),
            GatewayMessage::Line { conn, line, ack } => {
                self.state.submit(conn, &line);
                if let Some(ack) = ack {
                    let _ = ack.send(());
                }
            }
            GatewayMessage::Close { conn } => self.state.close_connection(conn),
            GatewayMessage::Prune => {
                self.state.prune(Instant::now());
            }
            GatewayMessage::Shutdown { done } => {
                self.stop_profile();
                let _ = done.send(());
                return false;
            }
        }
        true
    }

    fn stop_profile(&mut self) {
        info!("Stopping profile {}.", self.state.profile().id());
        self.state.profile_mut().stop();
    }
}
