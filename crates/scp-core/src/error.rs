//! Core error types for rscp

use scp_protocol::ProtocolError;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Top-level error type for file transfers
#[derive(Error, Debug)]
pub enum ScpError {
    /// Protocol error
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Session error
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    /// Transfer error
    #[error("Transfer error: {0}")]
    Transfer(#[from] TransferError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised by a session provider or one of its command invocations
#[derive(Error, Debug)]
pub enum SessionError {
    /// Could not reach the remote host
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Authentication failed
    #[error("Authentication failed for user {0}")]
    AuthenticationFailed(String),

    /// Server host key did not match the configured fingerprint
    #[error("Host key verification failed for {0}")]
    HostKeyRejected(String),

    /// ssh-agent could not be reached or queried
    #[error("SSH agent error: {0}")]
    Agent(String),

    /// Private key could not be loaded
    #[error("Private key not found at {path}: {message}")]
    KeyNotFound { path: PathBuf, message: String },

    /// Connection attempt took too long
    #[error("Connection timed out after {0:?}")]
    Timeout(Duration),

    /// Opening a channel for a new invocation failed
    #[error("Failed to open channel: {0}")]
    ChannelOpen(String),

    /// The remote side refused or failed to start the command
    #[error("Failed to execute command: {0}")]
    Exec(String),

    /// A pipe end was requested twice
    #[error("{0} pipe already taken")]
    PipeTaken(&'static str),

    /// Command exited unsuccessfully
    #[error("Command {command:?} exited with status {status}")]
    CommandFailed { command: String, status: u32 },

    /// Channel I/O failed
    #[error("Channel error: {0}")]
    Channel(String),
}

/// Errors raised while moving file content
#[derive(Error, Debug)]
pub enum TransferError {
    /// Local file could not be opened, read, written or synced
    #[error("Local file {path}: {source}")]
    LocalFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Local path is not a regular file
    #[error("Not a regular file: {0}")]
    NotAFile(PathBuf),

    /// Stream ended before the declared size was reached
    #[error("Short transfer: expected {expected} bytes, got {actual}")]
    ShortTransfer { expected: u64, actual: u64 },

    /// Transfer deadline expired
    #[error("Transfer timed out after {0:?}")]
    TimedOut(Duration),

    /// Background transfer task panicked or was cancelled
    #[error("Transfer task failed: {0}")]
    TaskFailed(String),
}

impl TransferError {
    /// Wrap an I/O error on a local path
    pub fn local(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        TransferError::LocalFile {
            path: path.into(),
            source,
        }
    }
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Config file not found
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    /// Invalid configuration
    #[error("Invalid config: {0}")]
    Invalid(String),

    /// TOML parse error
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// TOML serialize error
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
}
