// src/core/handler/mod.rs

//! Per-line command handling: the authorization gate in front, the verb
//! dispatcher behind it.

pub mod dispatcher;
pub mod gate;

pub use dispatcher::HandlerResult;
