// src/core/errors.rs

//! Defines the primary error type for the gateway.

use std::sync::Arc;
use thiserror::Error;

/// Every failure the gateway core and its transports can report.
/// Handler failures are caught at the dispatch boundary and never reach a client.
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("IO Error: {0}")]
    Io(Arc<std::io::Error>),

    #[error("TLS Error: {0}")]
    Tls(String),

    #[error("Line exceeds the maximum length of {0} bytes")]
    LineTooLong(usize),

    #[error("Missing argument for '{0}'")]
    MissingArgument(&'static str),

    #[error("Profile error: {0}")]
    Profile(String),

    #[error("Buddy '{0}' does not support {1}")]
    Unsupported(String, &'static str),

    #[error("Helper process failed: {0}")]
    Helper(String),

    #[error("Malformed event frame: {0}")]
    EventFrame(String),

    #[error("Gateway channel closed")]
    ChannelClosed,

    #[error("Internal Error: {0}")]
    Internal(String),
}

// `std::io::Error` is not cloneable, so it is shared behind an Arc.
impl Clone for GatewayError {
    fn clone(&self) -> Self {
        match self {
            GatewayError::Io(e) => GatewayError::Io(Arc::clone(e)),
            GatewayError::Tls(s) => GatewayError::Tls(s.clone()),
            GatewayError::LineTooLong(n) => GatewayError::LineTooLong(*n),
            GatewayError::MissingArgument(s) => GatewayError::MissingArgument(s),
            GatewayError::Profile(s) => GatewayError::Profile(s.clone()),
            GatewayError::Unsupported(id, what) => GatewayError::Unsupported(id.clone(), what),
            GatewayError::Helper(s) => GatewayError::Helper(s.clone()),
            GatewayError::EventFrame(s) => GatewayError::EventFrame(s.clone()),
            GatewayError::ChannelClosed => GatewayError::ChannelClosed,
            GatewayError::Internal(s) => GatewayError::Internal(s.clone()),
        }
    }
}

impl PartialEq for GatewayError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (GatewayError::Io(e1), GatewayError::Io(e2)) => e1.kind() == e2.kind(),
            (GatewayError::Tls(s1), GatewayError::Tls(s2)) => s1 == s2,
            (GatewayError::LineTooLong(n1), GatewayError::LineTooLong(n2)) => n1 == n2,
            (GatewayError::MissingArgument(s1), GatewayError::MissingArgument(s2)) => s1 == s2,
            (GatewayError::Profile(s1), GatewayError::Profile(s2)) => s1 == s2,
            (GatewayError::Unsupported(i1, w1), GatewayError::Unsupported(i2, w2)) => {
                i1 == i2 && w1 == w2
            }
            (GatewayError::Helper(s1), GatewayError::Helper(s2)) => s1 == s2,
            (GatewayError::EventFrame(s1), GatewayError::EventFrame(s2)) => s1 == s2,
            (GatewayError::Internal(s1), GatewayError::Internal(s2)) => s1 == s2,
            _ => core::mem::discriminant(self) == core::mem::discriminant(other),
        }
    }
}

// --- From trait implementations for easy error conversion ---

impl From<std::io::Error> for GatewayError {
    fn from(e: std::io::Error) -> Self {
        GatewayError::Io(Arc::new(e))
    }
}

impl From<rustls::Error> for GatewayError {
    fn from(e: rustls::Error) -> Self {
        GatewayError::Tls(e.to_string())
    }
}

impl From<serde_json::Error> for GatewayError {
    fn from(e: serde_json::Error) -> Self {
        GatewayError::EventFrame(e.to_string())
    }
}

impl<T> From<tokio::sync::mpsc::error::SendError<T>> for GatewayError {
    fn from(_: tokio::sync::mpsc::error::SendError<T>) -> Self {
        GatewayError::ChannelClosed
    }
}
