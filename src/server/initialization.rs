// src/server/initialization.rs

//! Handles gateway initialization: TLS material, our identity, the profile and
//! gateway actor, and binding both listeners.

use super::context::ServerContext;
use crate::config::Config;
use crate::core::profile::LocalProfile;
use crate::core::service::GatewayService;
use crate::core::state::GatewayState;
use crate::core::tasks::helper_process::{HelperProcess, resolve_identity};
use anyhow::{Context, Result, anyhow};
use rcgen::CertifiedKey;
use std::fs::File;
use std::io::BufReader;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio::task::JoinSet;
use tokio_rustls::rustls::pki_types::{CertificateDer, PrivateKeyDer, PrivatePkcs8KeyDer};
use tokio_rustls::{TlsAcceptor, rustls};
use tracing::{info, warn};

/// Initializes every gateway component before the accept loop starts. Any
/// failure here aborts the daemon.
pub async fn setup(config: Config) -> Result<ServerContext> {
    log_startup_info(&config);
    let (shutdown_tx, _) = broadcast::channel(1);

    let acceptor = setup_tls(&config)?;

    let helper = match &config.helper.command {
        Some(command) => Some(
            HelperProcess::spawn(command, &config.helper.args)
                .with_context(|| format!("Failed to start helper '{command}'"))?,
        ),
        None => None,
    };
    let id = resolve_profile_id(&config).await?;

    let profile = LocalProfile::from_config(id.as_str(), &config.profile);
    let state = GatewayState::from_config(profile, &config);
    let (service, gateway) =
        GatewayService::new(state, config.online).context("Failed to start the profile")?;
    info!("Gateway initialized for {}.", id);

    let control_listener = TcpListener::bind(config.control.address())
        .await
        .with_context(|| format!("Failed to bind control listener on {}", config.control.address()))?;
    let web_listener = TcpListener::bind(config.web.address())
        .await
        .with_context(|| format!("Failed to bind web listener on {}", config.web.address()))?;
    let control_addr = control_listener.local_addr()?;
    let web_addr = web_listener.local_addr()?;
    info!("Line protocol listening on {}", control_addr);

    Ok(ServerContext {
        config,
        gateway,
        service: Some(service),
        gateway_task: None,
        control_listener,
        web_listener: Some(web_listener),
        control_addr,
        web_addr,
        acceptor,
        shutdown_tx,
        background_tasks: JoinSet::new(),
        helper,
        helper_supervisor: None,
    })
}

/// Uses the configured identifier, or waits for the helper's hostname file.
async fn resolve_profile_id(config: &Config) -> Result<String> {
    if let Some(id) = &config.profile.id {
        return Ok(id.clone());
    }
    let path = config
        .helper
        .hostname_file
        .as_ref()
        .ok_or_else(|| anyhow!("could not deduce our identifier: set profile.id or helper.hostname_file"))?;
    info!("Waiting for identity in {}.", path.display());
    resolve_identity(path, config.helper.startup_timeout())
        .await
        .context("could not load our identifier")
}

/// Builds the acceptor `STARTTLS` upgrades use. Without configured files an
/// ephemeral self-signed certificate stands in.
pub fn setup_tls(config: &Config) -> Result<TlsAcceptor> {
    let (certs, key) = match &config.tls {
        Some(tls) => {
            info!("Loading TLS certificate and key for STARTTLS.");
            (load_certs(&tls.cert_path)?, load_key(&tls.key_path)?)
        }
        None => {
            info!("No TLS files configured; STARTTLS will use a self-signed certificate.");
            self_signed()?
        }
    };
    let server_config = rustls::ServerConfig::builder()
        .with_no_client_auth()
        .with_single_cert(certs, key)?;
    Ok(TlsAcceptor::from(Arc::new(server_config)))
}

fn self_signed() -> Result<(Vec<CertificateDer<'static>>, PrivateKeyDer<'static>)> {
    let CertifiedKey { cert, key_pair } =
        rcgen::generate_simple_self_signed(vec!["localhost".to_string()])
            .context("Failed to generate a self-signed certificate")?;
    let key = PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(key_pair.serialize_der()));
    Ok((vec![cert.der().clone()], key))
}

/// Loads TLS certificates from a PEM file.
fn load_certs(path: &str) -> Result<Vec<CertificateDer<'static>>> {
    let cert_file = File::open(path)
        .map_err(|e| anyhow!("Failed to open certificate file '{}': {}", path, e))?;
    let mut cert_reader = BufReader::new(cert_file);
    let certs = rustls_pemfile::certs(&mut cert_reader).collect::<Result<Vec<_>, _>>()?;
    if certs.is_empty() {
        return Err(anyhow!("No certificates found in '{}'", path));
    }
    Ok(certs)
}

/// Loads a private key from a PEM file.
fn load_key(path: &str) -> Result<PrivateKeyDer<'static>> {
    let key_file = File::open(path)
        .map_err(|e| anyhow!("Failed to open private key file '{}': {}", path, e))?;
    let mut key_reader = BufReader::new(key_file);
    rustls_pemfile::private_key(&mut key_reader)?
        .ok_or_else(|| anyhow!("No private key found in key file '{}'", path))
}

/// Logs key configuration parameters at startup.
fn log_startup_info(config: &Config) {
    match &config.password {
        Some(_) => info!("Password set; clients must authorize with PASS."),
        None => warn!("No password set; every connection starts authorized."),
    }
    if config.online {
        info!("Presence will be published at startup.");
    }
}
