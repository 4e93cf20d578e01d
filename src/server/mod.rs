// src/server/mod.rs

use crate::config::Config;
use anyhow::Result;
use std::future::Future;

mod connection_loop;
mod context;
mod initialization;
mod spawner;
mod stream;
pub mod web;

pub use connection_loop::shutdown_signal;
pub use context::{HelperSupervisor, ServerContext};
pub use initialization::{setup, setup_tls};
pub use stream::{AnyStream, Rewind};

/// Runs the gateway until SIGINT or SIGTERM.
pub async fn run(config: Config) -> Result<()> {
    let server_context = setup(config).await?;
    serve(server_context, shutdown_signal()).await
}

/// Starts the background tasks and accepts connections until `shutdown`
/// resolves. Fails if the loop ended because a task or the helper died.
pub async fn serve(mut server_context: ServerContext, shutdown: impl Future<Output = ()>) -> Result<()> {
    spawner::spawn_all(&mut server_context)?;
    connection_loop::run(server_context, shutdown).await
}
