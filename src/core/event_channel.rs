// src/core/event_channel.rs

//! Framing and handler registry for the browser-facing event channel.
//!
//! Every message is a JSON array `[name, [args...]]`. Inbound frames are
//! dispatched to all handlers registered under their name, in registration
//! order. `open` and `close` are reserved for connection setup and teardown
//! and carry no arguments.

use crate::core::GatewayError;
use crate::core::service::GatewayHandle;
use crate::core::state::{ConnectionId, OutboundSender, TransportKind};
use serde_json::Value;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{debug, warn};

pub const OPEN_EVENT: &str = "open";
pub const CLOSE_EVENT: &str = "close";
pub const LINE_EVENT: &str = "line";
pub const COMMAND_EVENT: &str = "command";

/// One decoded `[name, [args...]]` message.
#[derive(Debug, Clone, PartialEq)]
pub struct EventFrame {
    pub name: String,
    pub args: Vec<Value>,
}

impl EventFrame {
    pub fn new(name: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            name: name.into(),
            args,
        }
    }

    /// The frame every outbound protocol line travels in.
    pub fn line(text: impl Into<String>) -> Self {
        Self::new(LINE_EVENT, vec![Value::String(text.into())])
    }

    pub fn decode(text: &str) -> Result<Self, GatewayError> {
        let (name, args): (String, Vec<Value>) = serde_json::from_str(text)
            .map_err(|e| GatewayError::EventFrame(format!("expected [name, [args...]]: {e}")))?;
        Ok(Self { name, args })
    }

    pub fn encode(&self) -> Result<String, GatewayError> {
        Ok(serde_json::to_string(&(&self.name, &self.args))?)
    }
}

/// What a handler gets to know about the connection an event arrived on.
#[derive(Debug, Clone)]
pub struct EventContext {
    pub conn: ConnectionId,
    pub addr: Option<SocketAddr>,
    pub outbound: OutboundSender,
    pub gateway: GatewayHandle,
}

pub type EventHandler =
    Arc<dyn Fn(&EventContext, &[Value]) -> Result<(), GatewayError> + Send + Sync>;

/// Name-keyed handler lists.
#[derive(Clone, Default)]
pub struct EventRouter {
    handlers: HashMap<String, Vec<EventHandler>>,
}

impl EventRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// A router wired to the gateway: `open`/`close` register and unregister
    /// the connection, `line` submits its first argument as a command line and
    /// `command` joins all arguments with spaces into one.
    pub fn with_gateway_handlers() -> Self {
        let mut router = Self::new();
        router
            .on(OPEN_EVENT, |ctx, _| {
                ctx.gateway.open(
                    ctx.conn,
                    TransportKind::EventChannel,
                    ctx.addr,
                    ctx.outbound.clone(),
                )
            })
            .on(CLOSE_EVENT, |ctx, _| {
                ctx.gateway.close(ctx.conn);
                Ok(())
            })
            .on(LINE_EVENT, |ctx, args| {
                let line = args
                    .first()
                    .and_then(Value::as_str)
                    .ok_or_else(|| GatewayError::EventFrame("line needs a string argument".into()))?;
                ctx.gateway.submit_line(ctx.conn, line.to_string())
            })
            .on(COMMAND_EVENT, |ctx, args| {
                if args.is_empty() {
                    return Err(GatewayError::EventFrame("command needs arguments".into()));
                }
                let line = args.iter().map(argument_text).collect::<Vec<_>>().join(" ");
                ctx.gateway.submit_line(ctx.conn, line)
            });
        router
    }

    /// Registers another handler for `name`. Earlier handlers run first.
    pub fn on<F>(&mut self, name: &str, handler: F) -> &mut Self
    where
        F: Fn(&EventContext, &[Value]) -> Result<(), GatewayError> + Send + Sync + 'static,
    {
        self.handlers
            .entry(name.to_string())
            .or_default()
            .push(Arc::new(handler));
        self
    }

    pub fn has_handlers(&self, name: &str) -> bool {
        self.handlers.get(name).is_some_and(|list| !list.is_empty())
    }

    /// Runs every handler for the frame's name and returns how many ran. A
    /// failing handler is logged and does not stop the ones after it.
    pub fn dispatch(&self, ctx: &EventContext, frame: &EventFrame) -> usize {
        let Some(handlers) = self.handlers.get(&frame.name) else {
            debug!("Connection {}: no handler for event '{}'.", ctx.conn, frame.name);
            return 0;
        };
        for handler in handlers {
            if let Err(e) = handler(ctx, &frame.args) {
                warn!(
                    "Connection {}: '{}' handler failed: {}",
                    ctx.conn, frame.name, e
                );
            }
        }
        handlers.len()
    }
}

fn argument_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
