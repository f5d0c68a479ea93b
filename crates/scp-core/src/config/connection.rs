//! SSH connection configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use super::serde_utils::duration_secs;

/// How to reach and authenticate to the remote host
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Remote host name or address
    pub host: String,

    /// SSH port
    pub port: u16,

    /// Username for SSH authentication
    pub username: String,

    /// Private key used when the agent is not in use
    pub private_key_path: PathBuf,

    /// Passphrase for an encrypted private key
    pub key_passphrase: Option<String>,

    /// Authenticate with the keys held by the running ssh-agent
    pub use_agent: bool,

    /// Expected SHA-256 host key fingerprint; a mismatch rejects the connection
    pub host_key_fingerprint: Option<String>,

    /// Connection timeout
    #[serde(with = "duration_secs")]
    pub connect_timeout: Duration,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 22,
            username: whoami::username(),
            private_key_path: dirs::home_dir()
                .unwrap_or_default()
                .join(".ssh")
                .join("id_ed25519"),
            key_passphrase: None,
            use_agent: false,
            host_key_fingerprint: None,
            connect_timeout: Duration::from_secs(30),
        }
    }
}

impl ConnectionConfig {
    /// `host:port` string handed to the SSH client
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
