// src/core/state/mod.rs

//! Defines the central `GatewayState` struct and its components.

mod buddies;
mod client;
mod core;

pub use buddies::KnownBuddies;
pub use client::*;
pub use core::GatewayState;
