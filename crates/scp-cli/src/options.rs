//! Command-line overrides and settings loading

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;

use scp_core::config::{self, AckMode, ConfigFile, ConnectionConfig, ErrorPolicy, TransferConfig};

/// Connection flags shared by every remote subcommand
#[derive(Debug, Clone, Default, Args)]
pub struct ConnectionArgs {
    /// Remote host (overrides config)
    #[arg(short = 'H', long, env = "RSCP_HOST")]
    pub host: Option<String>,

    /// SSH port
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Remote user name
    #[arg(short, long)]
    pub user: Option<String>,

    /// Private key file
    #[arg(short, long, value_name = "FILE")]
    pub identity: Option<PathBuf>,

    /// Authenticate with keys from the running ssh-agent
    #[arg(long)]
    pub agent: bool,
}

impl ConnectionArgs {
    pub fn apply(&self, config: &mut ConnectionConfig) {
        if let Some(host) = &self.host {
            config.host = host.clone();
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(user) = &self.user {
            config.username = user.clone();
        }
        if let Some(identity) = &self.identity {
            config.private_key_path = identity.clone();
            config.use_agent = false;
        }
        if self.agent {
            config.use_agent = true;
        }
    }
}

/// Transfer flags shared by `get` and `put`
#[derive(Debug, Clone, Default, Args)]
pub struct TransferArgs {
    /// Read the peer's status byte at every step
    #[arg(long)]
    pub checked: bool,

    /// Log failures after the remote command started instead of failing
    #[arg(long)]
    pub lenient: bool,

    /// Chunk size in bytes
    #[arg(long, value_name = "BYTES")]
    pub buffer_size: Option<usize>,

    /// Give up on the transfer after this many seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Announce the local file's permission bits (put)
    #[arg(short = 'P', long)]
    pub preserve: bool,

    /// Path of scp on the remote host
    #[arg(long, value_name = "PATH")]
    pub scp_path: Option<String>,
}

impl TransferArgs {
    pub fn apply(&self, config: &mut TransferConfig) {
        if self.checked {
            config.ack_mode = AckMode::Checked;
        }
        if self.lenient {
            config.error_policy = ErrorPolicy::Lenient;
        }
        if let Some(size) = self.buffer_size {
            config.buffer_size = size;
        }
        if let Some(secs) = self.timeout {
            config.timeout = Some(Duration::from_secs(secs));
        }
        if self.preserve {
            config.preserve_mode = true;
        }
        if let Some(path) = &self.scp_path {
            config.scp_path = path.clone();
        }
    }
}

/// Load settings from `config_path`, or from the default location when present
///
/// An explicitly named file must exist. A broken default file is reported
/// and replaced by the built-in defaults.
pub fn load_settings(config_path: Option<&PathBuf>) -> Result<ConfigFile> {
    if let Some(path) = config_path {
        return config::load_config(path)
            .with_context(|| format!("Failed to load config from {:?}", path));
    }

    let default_path = config::default_config_path();
    if !default_path.exists() {
        tracing::debug!("Using default configuration");
        return Ok(ConfigFile::default());
    }

    Ok(config::load_config(&default_path).unwrap_or_else(|e| {
        tracing::warn!("Failed to load config from {:?}: {}", default_path, e);
        ConfigFile::default()
    }))
}

/// Split `dir/name` into its directory and file name
///
/// A bare name refers to the remote home directory.
pub fn split_remote(remote: &str) -> Result<(String, String)> {
    let (dir, name) = match remote.rsplit_once('/') {
        Some((dir, name)) => (dir, name),
        None => (".", remote),
    };
    if name.is_empty() {
        anyhow::bail!("Remote path {:?} does not name a file", remote);
    }
    Ok((dir.to_string(), name.to_string()))
}

/// Split a local path into its directory and file name
pub fn split_local(local: &Path) -> Result<(PathBuf, String)> {
    let name = local
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| anyhow::anyhow!("Local path {:?} does not name a file", local))?;
    let dir = match local.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    Ok((dir, name.to_string()))
}
