// src/server/spawner.rs

//! Spawns the gateway actor and every long-running background task.

use super::context::{HelperSupervisor, ServerContext};
use super::web::{self, WebState};
use crate::core::tasks::ping_pruner::PingPrunerTask;
use anyhow::{Result, anyhow};
use tokio::sync::oneshot;
use tracing::info;

pub fn spawn_all(ctx: &mut ServerContext) -> Result<()> {
    // --- Gateway actor ---
    let service = ctx
        .service
        .take()
        .ok_or_else(|| anyhow!("gateway service already started"))?;
    ctx.gateway_task = Some(tokio::spawn(service.run()));

    // --- Pruning scheduler ---
    let pruner = PingPrunerTask::new(ctx.gateway.clone());
    let shutdown_rx_pruner = ctx.shutdown_tx.subscribe();
    ctx.background_tasks.spawn(async move {
        pruner.run(shutdown_rx_pruner).await;
        Ok(())
    });

    // --- Web listener ---
    let web_listener = ctx
        .web_listener
        .take()
        .ok_or_else(|| anyhow!("web listener already started"))?;
    let web_state = WebState::new(ctx.gateway.clone(), ctx.shutdown_tx.clone());
    let shutdown_rx_web = ctx.shutdown_tx.subscribe();
    ctx.background_tasks
        .spawn(async move { web::run_web_server(web_listener, web_state, shutdown_rx_web).await });

    // --- Helper supervision ---
    if let Some(helper) = ctx.helper.take() {
        let (stop_tx, stop_rx) = oneshot::channel();
        let task = tokio::spawn(helper.supervise(stop_rx));
        ctx.helper_supervisor = Some(HelperSupervisor { stop_tx, task });
    } else {
        info!("No helper process configured.");
    }

    Ok(())
}
