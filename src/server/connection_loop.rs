// src/server/connection_loop.rs

//! Contains the line-protocol accept loop and the ordered graceful shutdown.

use super::context::{HelperSupervisor, ServerContext};
use crate::connection::LineConnectionHandler;
use crate::core::GatewayError;
use anyhow::{Result, anyhow};
use std::future::Future;
use std::time::Duration;
use tokio::signal::unix::{SignalKind, signal};
use tokio::task::{JoinError, JoinSet};
use tracing::{error, info, warn};

/// Resolves on SIGINT or SIGTERM.
pub async fn shutdown_signal() {
    let (mut sigint, mut sigterm) = match (
        signal(SignalKind::interrupt()),
        signal(SignalKind::terminate()),
    ) {
        (Ok(sigint), Ok(sigterm)) => (sigint, sigterm),
        (Err(e), _) | (_, Err(e)) => {
            error!("Failed to register signal handlers: {}. Falling back to Ctrl-C.", e);
            tokio::signal::ctrl_c().await.ok();
            return;
        }
    };
    tokio::select! {
        _ = sigint.recv() => info!("SIGINT received, initiating graceful shutdown."),
        _ = sigterm.recv() => info!("SIGTERM received, initiating graceful shutdown."),
    }
}

/// Resolves when the supervised helper is gone. Never resolves without one.
async fn helper_exited(
    supervisor: &mut Option<HelperSupervisor>,
) -> Result<Result<(), GatewayError>, JoinError> {
    match supervisor {
        Some(supervisor) => (&mut supervisor.task).await,
        None => std::future::pending().await,
    }
}

/// Accepts line-protocol connections until `shutdown` resolves, a background
/// task dies or the helper exits, then stops the listeners, the profile and
/// the helper, in that order. Returns the failure that ended the loop, if any.
pub async fn run(mut ctx: ServerContext, shutdown: impl Future<Output = ()>) -> Result<()> {
    let mut client_tasks = JoinSet::new();
    let mut failure = None;
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            biased;

            _ = &mut shutdown => break,

            Some(res) = ctx.background_tasks.join_next() => {
                match res {
                    Ok(Ok(())) => warn!("A background task finished unexpectedly without an error."),
                    Ok(Err(e)) => {
                        error!("CRITICAL: Background task failed: {}. Shutting down.", e);
                        failure = Some(e);
                        break;
                    }
                    Err(e) => {
                        error!("CRITICAL: Background task panicked: {e:?}. Shutting down.");
                        failure = Some(anyhow!("background task panicked: {e}"));
                        break;
                    }
                }
            },

            res = helper_exited(&mut ctx.helper_supervisor) => {
                ctx.helper_supervisor = None;
                let e = match res {
                    Ok(Ok(())) => anyhow!("helper stopped"),
                    Ok(Err(e)) => anyhow::Error::new(e),
                    Err(e) => anyhow!("helper supervisor panicked: {e}"),
                };
                error!("CRITICAL: {:#}. Shutting down.", e);
                failure = Some(e);
                break;
            },

            res = ctx.control_listener.accept() => match res {
                Ok((socket, addr)) => {
                    info!("Accepted new connection from: {}", addr);
                    let handler = LineConnectionHandler::new(
                        socket,
                        addr,
                        ctx.gateway.clone(),
                        ctx.acceptor.clone(),
                        ctx.shutdown_tx.subscribe(),
                    );
                    match handler {
                        Ok(mut handler) => {
                            client_tasks.spawn(async move {
                                if let Err(e) = handler.run().await {
                                    warn!("Connection from {} terminated unexpectedly: {}", addr, e);
                                }
                            });
                        }
                        Err(e) => {
                            error!("Gateway unavailable, dropping connection from {}: {}", addr, e);
                            failure = Some(anyhow::Error::new(e).context("gateway unavailable"));
                            break;
                        }
                    }
                }
                Err(e) => error!("Failed to accept connection: {}", e),
            },

            Some(res) = client_tasks.join_next() => {
                if let Err(e) = res
                    && e.is_panic()
                {
                    error!("A client handler panicked: {e:?}");
                }
            },
        }
    }

    // 1. Stop accepting on both listeners and end every session.
    info!("Shutting down. Closing listeners.");
    drop(ctx.control_listener);
    if ctx.shutdown_tx.send(()).is_err() {
        warn!("No task was listening for the shutdown signal.");
    }
    client_tasks.shutdown().await;
    info!("All client connections closed.");

    if tokio::time::timeout(Duration::from_secs(10), async {
        while ctx.background_tasks.join_next().await.is_some() {}
    })
    .await
    .is_err()
    {
        warn!("Timed out waiting for background tasks to finish cleanly.");
    }

    // 2. Stop the profile.
    if let Err(e) = ctx.gateway.shutdown().await {
        warn!("Gateway already stopped: {}", e);
    }
    if let Some(task) = ctx.gateway_task.take()
        && let Err(e) = task.await
    {
        error!("Gateway task failed: {e:?}");
    }

    // 3. Stop the helper.
    if let Some(supervisor) = ctx.helper_supervisor.take() {
        supervisor.stop().await;
    }
    info!("Gateway shutdown complete.");
    match failure {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
