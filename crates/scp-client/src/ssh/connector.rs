//! Outbound SSH connection
//!
//! Connects, verifies the host key and authenticates with either a private
//! key file or the keys held by the running ssh-agent.

use std::sync::Arc;

use async_trait::async_trait;
use russh::client::{self, Config, Handle};
use russh::Disconnect;
use russh_keys::key::PublicKey;

use scp_core::config::ConnectionConfig;
use scp_core::{SessionError, SessionProvider};

use super::invocation::SshInvocation;

/// An authenticated SSH connection
pub struct SshSession {
    /// russh connection handle
    handle: Handle<ClientHandler>,
    /// `host:port` this session is connected to
    address: String,
}

impl SshSession {
    /// Connect to `config.address()` and authenticate
    pub async fn connect(config: &ConnectionConfig) -> Result<Self, SessionError> {
        let address = config.address();
        let ssh_config = Arc::new(Config::default());
        let handler = ClientHandler::new(config.host_key_fingerprint.clone());

        tracing::debug!("Connecting to {}", address);
        let mut handle = tokio::time::timeout(
            config.connect_timeout,
            client::connect(ssh_config, address.as_str(), handler),
        )
        .await
        .map_err(|_| SessionError::Timeout(config.connect_timeout))?
        .map_err(|e| match e {
            russh::Error::UnknownKey => SessionError::HostKeyRejected(address.clone()),
            other => SessionError::ConnectionFailed(format!("{}: {}", address, other)),
        })?;

        tracing::debug!("Authenticating as user '{}'", config.username);
        let authenticated = if config.use_agent {
            authenticate_with_agent(&mut handle, &config.username).await?
        } else {
            authenticate_with_key(&mut handle, config).await?
        };

        if !authenticated {
            return Err(SessionError::AuthenticationFailed(config.username.clone()));
        }

        tracing::info!("Connected to {} as {}", address, config.username);
        Ok(Self { handle, address })
    }

    /// Address this session is connected to
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Disconnect from the remote host
    pub async fn close(self) -> Result<(), SessionError> {
        self.handle
            .disconnect(Disconnect::ByApplication, "closing", "en")
            .await
            .map_err(|e| SessionError::Channel(e.to_string()))
    }
}

#[async_trait]
impl SessionProvider for SshSession {
    type Invocation = SshInvocation;

    async fn open_invocation(&self) -> Result<SshInvocation, SessionError> {
        let channel = self
            .handle
            .channel_open_session()
            .await
            .map_err(|e| SessionError::ChannelOpen(e.to_string()))?;
        Ok(SshInvocation::new(channel))
    }
}

async fn authenticate_with_key(
    handle: &mut Handle<ClientHandler>,
    config: &ConnectionConfig,
) -> Result<bool, SessionError> {
    let path = &config.private_key_path;
    if !path.exists() {
        return Err(SessionError::KeyNotFound {
            path: path.clone(),
            message: "File does not exist".to_string(),
        });
    }

    let key = russh_keys::load_secret_key(path, config.key_passphrase.as_deref()).map_err(
        |e| SessionError::KeyNotFound {
            path: path.clone(),
            message: format!("Failed to load key: {}", e),
        },
    )?;

    handle
        .authenticate_publickey(config.username.as_str(), Arc::new(key))
        .await
        .map_err(|e| SessionError::ConnectionFailed(format!("Authentication error: {}", e)))
}

#[cfg(unix)]
async fn authenticate_with_agent(
    handle: &mut Handle<ClientHandler>,
    username: &str,
) -> Result<bool, SessionError> {
    let mut agent = russh_keys::agent::client::AgentClient::connect_env()
        .await
        .map_err(|e| SessionError::Agent(e.to_string()))?;
    let identities = agent
        .request_identities()
        .await
        .map_err(|e| SessionError::Agent(e.to_string()))?;

    tracing::debug!("ssh-agent offers {} identities", identities.len());
    for key in identities {
        let fingerprint = key.fingerprint();
        let (returned, result) = handle.authenticate_future(username, key, agent).await;
        agent = returned;
        match result {
            Ok(true) => return Ok(true),
            Ok(false) => tracing::debug!("Key {} rejected", fingerprint),
            Err(e) => tracing::debug!("Signing with {} failed: {:?}", fingerprint, e),
        }
    }

    Ok(false)
}

#[cfg(not(unix))]
async fn authenticate_with_agent(
    _handle: &mut Handle<ClientHandler>,
    _username: &str,
) -> Result<bool, SessionError> {
    Err(SessionError::Agent(
        "ssh-agent authentication is only supported on unix".to_string(),
    ))
}

/// SSH client handler
struct ClientHandler {
    /// Expected host key fingerprint
    expected_host_key: Option<String>,
}

impl ClientHandler {
    fn new(expected_host_key: Option<String>) -> Self {
        Self { expected_host_key }
    }
}

#[async_trait]
impl client::Handler for ClientHandler {
    type Error = russh::Error;

    /// Verify the server's host key
    ///
    /// With a configured fingerprint only that key is accepted. Without one
    /// any key is accepted and its fingerprint logged.
    async fn check_server_key(
        &mut self,
        server_public_key: &PublicKey,
    ) -> Result<bool, Self::Error> {
        let fingerprint = server_public_key.fingerprint();
        tracing::debug!("Server host key: {}", fingerprint);

        match &self.expected_host_key {
            Some(expected) => {
                let expected = expected.strip_prefix("SHA256:").unwrap_or(expected);
                if fingerprint == expected {
                    tracing::debug!("Host key verified against configured fingerprint");
                    Ok(true)
                } else {
                    tracing::error!(
                        "Host key differs from configured: expected {}, got {}",
                        expected,
                        fingerprint
                    );
                    Ok(false)
                }
            }
            None => {
                tracing::warn!(
                    "No host key fingerprint configured; accepting SHA256:{}",
                    fingerprint
                );
                Ok(true)
            }
        }
    }
}
