// src/core/tasks/helper_process.rs

//! Supervision of the anonymizing-network helper the profile relies on.
//!
//! The helper is an opaque child process. The gateway only starts it, reads
//! our identifier from the hostname file it writes, fails the daemon if it
//! dies, and kills it last during shutdown.

use crate::core::GatewayError;
use crate::core::profile::id::id_from_hostname;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::{Child, Command};
use tokio::sync::oneshot;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

const HOSTNAME_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// A running helper child process.
#[derive(Debug)]
pub struct HelperProcess {
    program: String,
    child: Child,
}

impl HelperProcess {
    /// Spawns `program` with `args`. The child is killed if this value is dropped.
    pub fn spawn(program: &str, args: &[String]) -> Result<Self, GatewayError> {
        let child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()?;
        info!(
            "Started helper '{}' (pid {}).",
            program,
            child.id().map_or_else(|| "?".to_string(), |pid| pid.to_string())
        );
        Ok(Self {
            program: program.to_string(),
            child,
        })
    }

    pub fn id(&self) -> Option<u32> {
        self.child.id()
    }

    /// Waits until either the helper exits on its own or `stop_rx` fires, in
    /// which case the helper is killed and reaped. The profile cannot reach
    /// anyone without the helper, so an exit of its own is an error.
    pub async fn supervise(mut self, stop_rx: oneshot::Receiver<()>) -> Result<(), GatewayError> {
        tokio::select! {
            status = self.child.wait() => {
                let reason = match status {
                    Ok(status) => format!("'{}' exited: {}", self.program, status),
                    Err(e) => format!("failed to wait for '{}': {}", self.program, e),
                };
                error!("Helper {}.", reason);
                Err(GatewayError::Helper(reason))
            }
            _ = stop_rx => {
                self.stop().await;
                Ok(())
            }
        }
    }

    pub async fn stop(&mut self) {
        info!("Stopping helper '{}'.", self.program);
        if let Err(e) = self.child.kill().await {
            warn!("Failed to kill helper '{}': {}.", self.program, e);
        }
    }
}

/// Polls `path` until it holds a valid `<id>.onion` line or `timeout` elapses.
pub async fn resolve_identity(path: &Path, timeout: Duration) -> Result<String, GatewayError> {
    let deadline = Instant::now() + timeout;
    loop {
        match tokio::fs::read_to_string(path).await {
            Ok(contents) => {
                if let Some(id) = id_from_hostname(&contents) {
                    info!("Resolved identity {} from {}.", id, path.display());
                    return Ok(id);
                }
                debug!("{} does not hold an identifier yet.", path.display());
            }
            Err(e) => debug!("{} not readable yet: {}", path.display(), e),
        }

        if Instant::now() + HOSTNAME_POLL_INTERVAL > deadline {
            return Err(GatewayError::Profile(format!(
                "could not deduce the identifier from {}",
                path.display()
            )));
        }
        tokio::time::sleep(HOSTNAME_POLL_INTERVAL).await;
    }
}
