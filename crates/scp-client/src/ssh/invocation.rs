//! One remote command on its own session channel
//!
//! The channel is message based, so the pipe ends handed to callers are
//! in-memory duplex streams. [`CommandInvocation::run`] pumps bytes between
//! them and the channel until the remote side closes it.

use async_trait::async_trait;
use russh::client::Msg;
use russh::{Channel, ChannelMsg};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, DuplexStream};

use scp_core::{CommandInvocation, SessionError};

/// Capacity of each in-memory pipe
const PIPE_CAPACITY: usize = 64 * 1024;

/// Stderr extended data type
const SSH_EXTENDED_DATA_STDERR: u32 = 1;

/// Channel messages the pump acts on
#[derive(Debug)]
pub(crate) enum ChannelEvent {
    Data(Vec<u8>),
    Stderr(Vec<u8>),
    ExitStatus(u32),
    Eof,
    Failure,
    Closed,
}

/// Session channel as seen by the pump
#[async_trait]
pub(crate) trait RemoteChannel: Send {
    async fn send_data(&mut self, data: &[u8]) -> Result<(), SessionError>;
    async fn send_eof(&mut self) -> Result<(), SessionError>;
    /// Next message of interest; must be cancel safe
    async fn next_event(&mut self) -> ChannelEvent;
}

#[async_trait]
impl RemoteChannel for Channel<Msg> {
    async fn send_data(&mut self, data: &[u8]) -> Result<(), SessionError> {
        self.data(data)
            .await
            .map_err(|e| SessionError::Channel(e.to_string()))
    }

    async fn send_eof(&mut self) -> Result<(), SessionError> {
        self.eof()
            .await
            .map_err(|e| SessionError::Channel(e.to_string()))
    }

    async fn next_event(&mut self) -> ChannelEvent {
        loop {
            let event = match self.wait().await {
                Some(ChannelMsg::Data { data }) => ChannelEvent::Data(data.to_vec()),
                Some(ChannelMsg::ExtendedData { data, ext }) if ext == SSH_EXTENDED_DATA_STDERR => {
                    ChannelEvent::Stderr(data.to_vec())
                }
                Some(ChannelMsg::ExitStatus { exit_status }) => ChannelEvent::ExitStatus(exit_status),
                Some(ChannelMsg::Eof) => ChannelEvent::Eof,
                Some(ChannelMsg::Failure) => ChannelEvent::Failure,
                Some(ChannelMsg::Close) | None => ChannelEvent::Closed,
                Some(_) => continue,
            };
            return event;
        }
    }
}

/// A session channel ready to run one command
pub struct SshInvocation {
    channel: Channel<Msg>,
    /// Caller's end of stdin, until taken
    stdin: Option<DuplexStream>,
    /// Caller's end of stdout, until taken
    stdout: Option<DuplexStream>,
    /// Pump sides, moved into `run`
    pump: Option<(DuplexStream, DuplexStream)>,
}

impl SshInvocation {
    pub(crate) fn new(channel: Channel<Msg>) -> Self {
        let (stdin, stdin_source) = tokio::io::duplex(PIPE_CAPACITY);
        let (stdout, stdout_sink) = tokio::io::duplex(PIPE_CAPACITY);
        Self {
            channel,
            stdin: Some(stdin),
            stdout: Some(stdout),
            pump: Some((stdin_source, stdout_sink)),
        }
    }
}

#[async_trait]
impl CommandInvocation for SshInvocation {
    type Stdin = DuplexStream;
    type Stdout = DuplexStream;

    fn stdin_pipe(&mut self) -> Result<DuplexStream, SessionError> {
        self.stdin.take().ok_or(SessionError::PipeTaken("stdin"))
    }

    fn stdout_pipe(&mut self) -> Result<DuplexStream, SessionError> {
        self.stdout.take().ok_or(SessionError::PipeTaken("stdout"))
    }

    async fn run(&mut self, command: &str) -> Result<Option<u32>, SessionError> {
        let (stdin_source, stdout_sink) = self
            .pump
            .take()
            .ok_or_else(|| SessionError::Exec("invocation already used".to_string()))?;

        // Pipes nobody took must not hold the pump up
        let stdin_taken = self.stdin.take().is_none();
        let stdout_taken = self.stdout.take().is_none();

        tracing::debug!("Executing {:?}", command);
        self.channel
            .exec(true, command)
            .await
            .map_err(|e| SessionError::Exec(e.to_string()))?;

        let exit_status = pump(
            &mut self.channel,
            command,
            stdin_source,
            stdout_sink,
            stdin_taken,
            stdout_taken,
        )
        .await?;

        tracing::debug!("Command {:?} finished with {:?}", command, exit_status);
        Ok(exit_status)
    }
}

/// Move bytes between the local pipes and `channel` until it closes
///
/// With `stdin_open` unset the remote gets EOF straight away; with
/// `stdout_open` unset remote output is dropped. Returns the exit status the
/// remote reported, if any.
pub(crate) async fn pump<C, R, W>(
    channel: &mut C,
    command: &str,
    mut stdin_source: R,
    mut stdout_sink: W,
    mut stdin_open: bool,
    mut stdout_open: bool,
) -> Result<Option<u32>, SessionError>
where
    C: RemoteChannel,
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    if !stdin_open {
        channel.send_eof().await?;
    }

    let mut buf = vec![0u8; PIPE_CAPACITY];
    let mut exit_status = None;

    loop {
        tokio::select! {
            read = stdin_source.read(&mut buf), if stdin_open => {
                match read {
                    Ok(0) | Err(_) => {
                        stdin_open = false;
                        channel.send_eof().await?;
                    }
                    Ok(n) => channel.send_data(&buf[..n]).await?,
                }
            }
            event = channel.next_event() => {
                match event {
                    ChannelEvent::Data(data) => {
                        if stdout_open && stdout_sink.write_all(&data).await.is_err() {
                            tracing::debug!("stdout reader gone; discarding output");
                            stdout_open = false;
                        }
                    }
                    ChannelEvent::Stderr(data) => {
                        tracing::debug!("Remote stderr: {}", String::from_utf8_lossy(&data).trim_end());
                    }
                    ChannelEvent::ExitStatus(status) => exit_status = Some(status),
                    ChannelEvent::Eof => {
                        if stdout_open {
                            let _ = stdout_sink.shutdown().await;
                            stdout_open = false;
                        }
                    }
                    ChannelEvent::Failure => {
                        return Err(SessionError::Exec(format!("remote refused {:?}", command)));
                    }
                    ChannelEvent::Closed => break,
                }
            }
        }
    }

    if stdout_open {
        let _ = stdout_sink.shutdown().await;
    }

    Ok(exit_status)
}
