//! Local-to-remote transfer
//!
//! ```text
//! Prepare -> Transmit -> Terminate
//! ```
//!
//! The remote side runs `scp -t ./` and acts as the sink. In stream mode the
//! writer never waits for the sink; in checked mode it reads the sink's
//! status before the control line, after it, and after the terminator.

use std::path::PathBuf;

use futures::SinkExt;
use tokio::fs::File;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio_util::codec::FramedWrite;

use scp_core::config::{AckMode, TransferConfig};
use scp_core::{
    CommandInvocation, ScpError, SessionProvider, TransferDirection, TransferError,
    TransferSummary,
};
use scp_protocol::{read_response, ControlLine, ControlLineCodec, FileMode};

use super::{check_response, run_invocation, Exchange, Progress};

/// Parameters of an upload
#[derive(Debug, Clone)]
pub struct SendRequest {
    /// Local directory holding the file
    pub local_dir: PathBuf,
    /// File name; also the name the file gets on the remote host
    pub file_name: String,
}

impl SendRequest {
    pub fn new(local_dir: impl Into<PathBuf>, file_name: impl Into<String>) -> Self {
        Self {
            local_dir: local_dir.into(),
            file_name: file_name.into(),
        }
    }

    pub fn local_path(&self) -> PathBuf {
        self.local_dir.join(&self.file_name)
    }

    /// Where the file lands, relative to the remote command's working directory
    pub fn remote_path(&self) -> String {
        format!("./{}", self.file_name)
    }
}

/// Push one file to the remote host
///
/// The background writer is joined before this returns, so the control
/// line, content and terminator have all been handed to the invocation.
pub async fn send_file<S>(
    session: &S,
    request: &SendRequest,
    config: &TransferConfig,
) -> Result<TransferSummary, ScpError>
where
    S: SessionProvider,
{
    // Prepare
    let local_path = request.local_path();
    let metadata = tokio::fs::metadata(&local_path)
        .await
        .map_err(|e| TransferError::local(&local_path, e))?;
    if !metadata.is_file() {
        return Err(TransferError::NotAFile(local_path).into());
    }

    let mode = if config.preserve_mode {
        permission_bits(&metadata).unwrap_or(config.default_mode)
    } else {
        config.default_mode
    };
    let control = ControlLine::new(mode, metadata.len(), request.file_name.clone());
    control.check_file_name()?;

    let file = File::open(&local_path)
        .await
        .map_err(|e| TransferError::local(&local_path, e))?;

    let mut invocation = session.open_invocation().await?;
    let stdin = invocation.stdin_pipe()?;
    let stdout = match config.ack_mode {
        AckMode::Checked => Some(invocation.stdout_pipe()?),
        AckMode::Stream => None,
    };

    tracing::debug!("Sending {:?} as {}", local_path, control);

    let summary = TransferSummary::new(
        TransferDirection::Upload,
        local_path.clone(),
        request.remote_path(),
    );
    let exchange = send_exchange(stdin, stdout, file, local_path, control, config.clone());

    run_invocation(invocation, config.sink_command(), exchange, config, summary).await
}

#[cfg(unix)]
fn permission_bits(metadata: &std::fs::Metadata) -> Option<FileMode> {
    use std::os::unix::fs::PermissionsExt;
    Some(FileMode::new(metadata.permissions().mode()))
}

#[cfg(not(unix))]
fn permission_bits(_metadata: &std::fs::Metadata) -> Option<FileMode> {
    None
}

/// Background half of an upload; owns the write pipe and the local file
async fn send_exchange<W, R>(
    stdin: W,
    mut stdout: Option<R>,
    mut file: File,
    local_path: PathBuf,
    control: ControlLine,
    config: TransferConfig,
) -> Exchange
where
    W: AsyncWrite + Unpin,
    R: AsyncRead + Unpin,
{
    let mut progress = Progress {
        control: Some(control.clone()),
        local_path: Some(local_path.clone()),
        ..Progress::default()
    };

    let mut framed = FramedWrite::new(stdin, ControlLineCodec::new());
    let result = send_steps(
        &mut framed,
        stdout.as_mut(),
        &mut file,
        &local_path,
        control,
        &config,
        &mut progress,
    )
    .await;

    if let Err(e) = framed.get_mut().shutdown().await {
        tracing::debug!("Closing stdin pipe: {}", e);
    }

    (progress, result)
}

async fn send_steps<W, R>(
    framed: &mut FramedWrite<W, ControlLineCodec>,
    mut stdout: Option<&mut R>,
    file: &mut File,
    local_path: &std::path::Path,
    control: ControlLine,
    config: &TransferConfig,
    progress: &mut Progress,
) -> Result<(), ScpError>
where
    W: AsyncWrite + Unpin,
    R: AsyncRead + Unpin,
{
    // Sink announces readiness before anything is sent
    if let Some(reader) = stdout.as_deref_mut() {
        check_response(read_response(reader).await?)?;
    }

    // Transmit
    let size = control.size;
    framed.send(control).await?;
    if let Some(reader) = stdout.as_deref_mut() {
        check_response(read_response(reader).await?)?;
    }

    let writer = framed.get_mut();
    let mut buf = vec![0u8; config.chunk_size()];
    let mut remaining = size;
    while remaining > 0 {
        let want = remaining.min(buf.len() as u64) as usize;
        let n = file
            .read(&mut buf[..want])
            .await
            .map_err(|e| TransferError::local(local_path, e))?;
        if n == 0 {
            return Err(TransferError::ShortTransfer {
                expected: size,
                actual: size - remaining,
            }
            .into());
        }

        writer.write_all(&buf[..n]).await?;
        remaining -= n as u64;
        progress.bytes += n as u64;
    }

    // Terminate
    framed.send(config.ack_mode.terminator()).await?;
    if let Some(reader) = stdout {
        check_response(read_response(reader).await?)?;
    }

    tracing::debug!("Wrote {} content bytes", progress.bytes);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_paths() {
        let request = SendRequest::new("/home/user/out", "report.csv");
        assert_eq!(
            request.local_path(),
            PathBuf::from("/home/user/out/report.csv")
        );
        assert_eq!(request.remote_path(), "./report.csv");
    }
}
