// src/config.rs

//! Manages gateway configuration: loading the TOML file, applying command-line
//! overrides, and validation.

use crate::core::profile::is_onion_id;
use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// The file read when no `--config` is given. It is optional.
pub const DEFAULT_CONFIG_PATH: &str = "buddygate.toml";

/// A host/port pair one of the two listeners binds to.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ListenerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    pub port: u16,
}

impl ListenerConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// The `host:port` string handed to the socket layer.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// The PEM key/certificate pair used by `STARTTLS`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct TlsConfig {
    pub key_path: String,
    pub cert_path: String,
}

/// Initial attributes of our own profile.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ProfileConfig {
    /// Our identifier. If absent it is read from `helper.hostname_file`.
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_status")]
    pub status: String,
    #[serde(default)]
    pub buddies: Vec<String>,
}

impl Default for ProfileConfig {
    fn default() -> Self {
        Self {
            id: None,
            name: None,
            description: None,
            status: default_status(),
            buddies: Vec::new(),
        }
    }
}

/// The anonymizing-network helper process, if the gateway should run one.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct HelperConfig {
    #[serde(default)]
    pub command: Option<String>,
    #[serde(default)]
    pub args: Vec<String>,
    /// File the helper writes our `<id>.onion` hostname into.
    #[serde(default)]
    pub hostname_file: Option<PathBuf>,
    #[serde(default = "default_startup_timeout_secs")]
    pub startup_timeout_secs: u64,
}

impl HelperConfig {
    pub fn startup_timeout(&self) -> Duration {
        Duration::from_secs(self.startup_timeout_secs)
    }
}

impl Default for HelperConfig {
    fn default() -> Self {
        Self {
            command: None,
            args: Vec::new(),
            hostname_file: None,
            startup_timeout_secs: default_startup_timeout_secs(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}
fn default_control() -> ListenerConfig {
    ListenerConfig::new(default_host(), 11110)
}
fn default_web() -> ListenerConfig {
    ListenerConfig::new(default_host(), 11111)
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_status() -> String {
    "available".to_string()
}
fn default_startup_timeout_secs() -> u64 {
    20
}

/// The complete, validated gateway configuration.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Config {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Shared password. Without one every connection starts authorized.
    #[serde(default)]
    pub password: Option<String>,
    /// Publish presence as soon as the profile starts.
    #[serde(default)]
    pub online: bool,
    /// The line-protocol listener.
    #[serde(default = "default_control")]
    pub control: ListenerConfig,
    /// The HTTP landing page and the `/websocket` event channel.
    #[serde(default = "default_web")]
    pub web: ListenerConfig,
    #[serde(default)]
    pub tls: Option<TlsConfig>,
    #[serde(default)]
    pub profile: ProfileConfig,
    #[serde(default)]
    pub helper: HelperConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            password: None,
            online: false,
            control: default_control(),
            web: default_web(),
            tls: None,
            profile: ProfileConfig::default(),
            helper: HelperConfig::default(),
        }
    }
}

/// Values given on the command line. They win over the file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overrides {
    pub control: Option<ListenerConfig>,
    pub web: Option<ListenerConfig>,
    pub tls: Option<TlsConfig>,
    pub password: Option<String>,
    pub online: bool,
    pub debug: bool,
    pub id: Option<String>,
}

impl Config {
    /// Creates a new `Config` instance by reading and parsing a TOML file.
    pub fn from_file(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file at '{path}'"))?;
        let config = Self::from_toml_str(&contents)
            .with_context(|| format!("Failed to parse TOML from '{path}'"))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Loads `path` if given (it must exist), otherwise `buddygate.toml` if
    /// present, otherwise the defaults.
    pub fn load(path: Option<&str>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None if Path::new(DEFAULT_CONFIG_PATH).exists() => Self::from_file(DEFAULT_CONFIG_PATH),
            None => {
                info!("No config file found, using defaults.");
                Ok(Self::default())
            }
        }
    }

    /// Applies command-line values on top of the file and re-validates.
    pub fn apply_overrides(&mut self, overrides: Overrides) -> Result<()> {
        if let Some(control) = overrides.control {
            self.control = control;
        }
        if let Some(web) = overrides.web {
            self.web = web;
        }
        if overrides.tls.is_some() {
            self.tls = overrides.tls;
        }
        if overrides.password.is_some() {
            self.password = overrides.password;
        }
        if overrides.id.is_some() {
            self.profile.id = overrides.id;
        }
        self.online |= overrides.online;
        if overrides.debug {
            self.log_level = "debug".to_string();
        }
        self.validate()
    }

    /// Validates the configuration for logical consistency.
    pub fn validate(&self) -> Result<()> {
        for (name, listener) in [("control", &self.control), ("web", &self.web)] {
            if listener.port == 0 {
                return Err(anyhow!("{name}.port cannot be 0"));
            }
            if listener.host.trim().is_empty() {
                return Err(anyhow!("{name}.host cannot be empty"));
            }
        }
        if self.control == self.web {
            return Err(anyhow!(
                "control and web listeners cannot share {}",
                self.control.address()
            ));
        }

        if let Some(tls) = &self.tls {
            if tls.key_path.trim().is_empty() {
                return Err(anyhow!("tls.key_path cannot be empty"));
            }
            if tls.cert_path.trim().is_empty() {
                return Err(anyhow!("tls.cert_path cannot be empty"));
            }
        }

        if let Some(password) = &self.password
            && password.is_empty()
        {
            warn!("An empty password is configured; clients must still send PASS.");
        }

        if let Some(id) = &self.profile.id
            && !is_onion_id(id)
        {
            return Err(anyhow!("profile.id '{id}' is not a valid identifier"));
        }

        if self.helper.command.is_none() && self.helper.hostname_file.is_some() {
            info!("helper.hostname_file is set without helper.command; expecting an external helper.");
        }
        Ok(())
    }
}

/// Parses `HOST:PORT[,HOST:PORT]` into the control and, optionally, web listener.
pub fn parse_listen(value: &str) -> Result<(ListenerConfig, Option<ListenerConfig>)> {
    let mut listeners = value
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(parse_listener);

    let control = listeners
        .next()
        .ok_or_else(|| anyhow!("--listen needs at least one HOST:PORT"))??;
    let web = listeners.next().transpose()?;
    if listeners.next().is_some() {
        return Err(anyhow!("--listen takes at most two HOST:PORT pairs"));
    }
    Ok((control, web))
}

fn parse_listener(value: &str) -> Result<ListenerConfig> {
    let (host, port) = value
        .rsplit_once(':')
        .ok_or_else(|| anyhow!("'{value}' is not HOST:PORT"))?;
    let port = port
        .parse::<u16>()
        .with_context(|| format!("invalid port in '{value}'"))?;
    let host = if host.is_empty() {
        default_host()
    } else {
        host.to_string()
    };
    Ok(ListenerConfig::new(host, port))
}

/// Parses `KEY:CERT` into a TLS key/certificate pair.
pub fn parse_ssl(value: &str) -> Result<TlsConfig> {
    let (key_path, cert_path) = value
        .split_once(':')
        .ok_or_else(|| anyhow!("--ssl expects KEY:CERT, got '{value}'"))?;
    if key_path.is_empty() || cert_path.is_empty() {
        return Err(anyhow!("--ssl expects KEY:CERT, got '{value}'"));
    }
    Ok(TlsConfig {
        key_path: key_path.to_string(),
        cert_path: cert_path.to_string(),
    })
}
