// src/core/mod.rs

//! The gateway core: authorization, command dispatch, event relay and the
//! state they share.

pub mod broadcast;
pub mod commands;
pub mod errors;
pub mod event_channel;
pub mod events;
pub mod handler;
pub mod latency;
pub mod profile;
pub mod service;
pub mod state;
pub mod tasks;

pub use commands::Command;
pub use errors::GatewayError;
pub use service::{GatewayHandle, GatewayMessage, GatewayService};
