// src/server/context.rs

use crate::config::Config;
use crate::core::profile::LocalProfile;
use crate::core::GatewayError;
use crate::core::service::{GatewayHandle, GatewayService};
use crate::core::state::GatewayState;
use crate::core::tasks::helper_process::HelperProcess;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, oneshot};
use tokio::task::{JoinHandle, JoinSet};
use tokio_rustls::TlsAcceptor;
use tracing::warn;

/// A running helper and the means to stop it.
pub struct HelperSupervisor {
    pub stop_tx: oneshot::Sender<()>,
    pub task: JoinHandle<Result<(), GatewayError>>,
}

impl HelperSupervisor {
    /// Kills the helper and waits until it is reaped.
    pub async fn stop(self) {
        let _ = self.stop_tx.send(());
        match self.task.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!("Helper stopped with an error: {e}"),
            Err(e) => warn!("Helper supervisor task failed: {e:?}"),
        }
    }
}

/// Holds everything initialized before the accept loop starts.
pub struct ServerContext {
    pub config: Config,
    pub gateway: GatewayHandle,
    /// Taken by the spawner when the actor starts.
    pub service: Option<GatewayService<LocalProfile>>,
    pub gateway_task: Option<JoinHandle<GatewayState<LocalProfile>>>,
    pub control_listener: TcpListener,
    /// Taken by the spawner when the web server starts.
    pub web_listener: Option<TcpListener>,
    pub control_addr: SocketAddr,
    pub web_addr: SocketAddr,
    pub acceptor: TlsAcceptor,
    pub shutdown_tx: broadcast::Sender<()>,
    pub background_tasks: JoinSet<Result<(), anyhow::Error>>,
    /// The spawned helper, until the spawner hands it to a supervisor.
    pub helper: Option<HelperProcess>,
    pub helper_supervisor: Option<HelperSupervisor>,
}
