// src/connection/mod.rs

//! Manages the lifecycle of a single line-protocol client connection: framing,
//! in-place TLS upgrade, and unregistration when it ends.

mod codec;
mod guard;
mod handler;

pub use codec::{LineCodec, MAX_LINE_LENGTH};
pub use guard::ConnectionGuard;
pub use handler::LineConnectionHandler;
