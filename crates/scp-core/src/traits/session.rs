//! Session provider traits
//!
//! The transfer engines never touch the transport directly. They ask a
//! [`SessionProvider`] for a fresh [`CommandInvocation`], take its two pipe
//! ends, and run one remote command on it.

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};

use crate::error::SessionError;

/// One remote command execution with its own stdin/stdout pipes
#[async_trait]
pub trait CommandInvocation: Send {
    /// Write side connected to the remote process's standard input
    type Stdin: AsyncWrite + Send + Unpin + 'static;

    /// Read side connected to the remote process's standard output
    type Stdout: AsyncRead + Send + Unpin + 'static;

    /// Take the stdin pipe. Fails with [`SessionError::PipeTaken`] on a
    /// second call.
    fn stdin_pipe(&mut self) -> Result<Self::Stdin, SessionError>;

    /// Take the stdout pipe. Fails with [`SessionError::PipeTaken`] on a
    /// second call.
    fn stdout_pipe(&mut self) -> Result<Self::Stdout, SessionError>;

    /// Start `command` and wait until it has finished
    ///
    /// Resolves once the remote side has closed the channel. Returns the
    /// exit status when the remote reported one.
    async fn run(&mut self, command: &str) -> Result<Option<u32>, SessionError>;
}

/// Source of command invocations over an authenticated session
#[async_trait]
pub trait SessionProvider: Send + Sync {
    /// Invocation type handed out by this provider
    type Invocation: CommandInvocation + 'static;

    /// Open a new invocation bound to its own channel
    async fn open_invocation(&self) -> Result<Self::Invocation, SessionError>;
}
