// src/main.rs

//! The main entry point for the buddygate daemon.

use anyhow::{Context, Result};
use buddygate::config::{self, Config, Overrides};
use buddygate::server;
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{filter::EnvFilter, prelude::*, reload};

/// Exposes a peer-messaging profile to local UI clients.
#[derive(Parser, Debug)]
#[command(name = "buddygate", version = env!("CARGO_PKG_VERSION"), about)]
struct Cli {
    /// Path to the TOML config file.
    #[arg(short, long, value_name = "PATH")]
    config: Option<String>,

    /// Control listener, then optionally the web listener.
    #[arg(short, long, value_name = "HOST:PORT[,HOST:PORT]")]
    listen: Option<String>,

    /// PEM private key and certificate used by STARTTLS.
    #[arg(short, long, value_name = "KEY:CERT")]
    ssl: Option<String>,

    /// Password clients must send with PASS.
    #[arg(short = 'P', long, env = "BUDDYGATE_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Publish presence as soon as the profile starts.
    #[arg(short, long)]
    online: bool,

    /// Log at debug level.
    #[arg(short, long)]
    debug: bool,

    /// Our own identifier, instead of reading it from the helper.
    #[arg(short, long, value_name = "ID")]
    id: Option<String>,
}

impl Cli {
    fn overrides(&self) -> Result<Overrides> {
        let (control, web) = match &self.listen {
            Some(listen) => {
                let (control, web) = config::parse_listen(listen)?;
                (Some(control), web)
            }
            None => (None, None),
        };
        Ok(Overrides {
            control,
            web,
            tls: self.ssl.as_deref().map(config::parse_ssl).transpose()?,
            password: self.password.clone(),
            online: self.online,
            debug: self.debug,
            id: self.id.clone(),
        })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Log at the default level until the config says otherwise.
    let env_filter = std::env::var("RUST_LOG").ok();
    let initial = env_filter.clone().unwrap_or_else(|| "info".to_string());
    let (filter, reload_handle) = reload::Layer::new(EnvFilter::new(initial));
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .compact()
                .with_ansi(true),
        )
        .init();

    let mut config = Config::load(cli.config.as_deref())?;
    config.apply_overrides(cli.overrides()?)?;

    // RUST_LOG wins over the file.
    if env_filter.is_none() {
        reload_handle
            .reload(EnvFilter::new(&config.log_level))
            .context("Failed to apply log_level")?;
    }

    info!("Starting buddygate {}.", env!("CARGO_PKG_VERSION"));
    if let Err(e) = server::run(config).await {
        error!("Gateway runtime error: {:#}", e);
        return Err(e);
    }
    Ok(())
}
