//! Remote-to-local transfer
//!
//! ```text
//! AwaitStart -> AwaitControlLine -> StreamingContent -> Done
//! ```
//!
//! The remote side runs `scp -f <path>` and acts as the source. This side
//! acks once to start, once after the control line, and then per content
//! chunk (stream mode) or once after the trailing status byte (checked mode).

use std::io::Cursor;
use std::path::{Path, PathBuf};

use futures::StreamExt;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio_util::codec::FramedRead;

use scp_core::config::{AckMode, TransferConfig};
use scp_core::{
    CommandInvocation, ScpError, SessionProvider, TransferDirection, TransferError,
    TransferSummary,
};
use scp_protocol::{
    read_response, write_ack, ControlLine, ControlLineCodec, ProtocolError, Record, ACK,
};

use super::{check_response, run_invocation, Exchange, Progress};

/// Parameters of a download
#[derive(Debug, Clone)]
pub struct ReceiveRequest {
    /// Directory of the file on the remote host
    pub remote_dir: String,
    /// Name of the file on the remote host
    pub remote_name: String,
    /// Local directory the file is written into
    pub local_dir: PathBuf,
    /// Local file name; the name announced by the peer is used when unset
    pub local_name: Option<String>,
}

impl ReceiveRequest {
    /// Download `remote_dir/remote_name` into `local_dir`, keeping the peer's name
    pub fn new(
        remote_dir: impl Into<String>,
        remote_name: impl Into<String>,
        local_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            remote_dir: remote_dir.into(),
            remote_name: remote_name.into(),
            local_dir: local_dir.into(),
            local_name: None,
        }
    }

    /// Store the download under a different local name
    ///
    /// An empty name means "use the name announced by the peer".
    pub fn with_local_name(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.local_name = if name.is_empty() { None } else { Some(name) };
        self
    }

    /// Path handed to the remote `scp -f`
    pub fn remote_path(&self) -> String {
        format!("{}/{}", self.remote_dir, self.remote_name)
    }
}

/// Pull one file from the remote host
///
/// Opens a fresh invocation on `session`, runs `scp -f` there and writes the
/// announced file into `request.local_dir`.
pub async fn receive_file<S>(
    session: &S,
    request: &ReceiveRequest,
    config: &TransferConfig,
) -> Result<TransferSummary, ScpError>
where
    S: SessionProvider,
{
    let remote_path = request.remote_path();
    let command = config.source_command(&remote_path);

    let mut invocation = session.open_invocation().await?;
    let stdin = invocation.stdin_pipe()?;
    let stdout = invocation.stdout_pipe()?;

    tracing::debug!("Receiving {} into {:?}", remote_path, request.local_dir);

    let summary = TransferSummary::new(
        TransferDirection::Download,
        request.local_dir.clone(),
        remote_path,
    );
    let exchange = receive_exchange(stdin, stdout, request.clone(), config.clone());

    run_invocation(invocation, command, exchange, config, summary).await
}

/// Background half of a download; owns both pipe ends
async fn receive_exchange<W, R>(
    mut stdin: W,
    stdout: R,
    request: ReceiveRequest,
    config: TransferConfig,
) -> Exchange
where
    W: AsyncWrite + Unpin,
    R: AsyncRead + Unpin,
{
    let mut progress = Progress::default();
    let result = receive_steps(&mut stdin, stdout, &request, &config, &mut progress).await;

    if let Err(e) = stdin.shutdown().await {
        tracing::debug!("Closing stdin pipe: {}", e);
    }

    (progress, result)
}

async fn receive_steps<W, R>(
    stdin: &mut W,
    stdout: R,
    request: &ReceiveRequest,
    config: &TransferConfig,
    progress: &mut Progress,
) -> Result<(), ScpError>
where
    W: AsyncWrite + Unpin,
    R: AsyncRead + Unpin,
{
    // AwaitStart: tell the source it may send its control line
    write_ack(stdin).await?;

    // AwaitControlLine
    let mut framed = FramedRead::new(stdout, ControlLineCodec::new());
    let control = match framed.next().await {
        Some(Ok(Record::Control(line))) => line,
        Some(Ok(Record::Response(response))) => {
            check_response(response)?;
            return Err(ProtocolError::UnexpectedByte(ACK).into());
        }
        Some(Err(e)) => return Err(e.into()),
        None => return Err(ProtocolError::UnexpectedEof("control line").into()),
    };
    control.check_file_name()?;

    tracing::debug!(
        "Control line: mode {}, size {}, name {}",
        control.mode,
        control.size,
        control.file_name
    );

    let file_name = request
        .local_name
        .clone()
        .unwrap_or_else(|| control.file_name.clone());
    let local_path = request.local_dir.join(file_name);
    progress.control = Some(control.clone());
    progress.local_path = Some(local_path.clone());

    let mut file = tokio::fs::File::create(&local_path)
        .await
        .map_err(|e| TransferError::local(&local_path, e))?;

    write_ack(stdin).await?;

    // StreamingContent: bytes the codec buffered past the control line come first
    let parts = framed.into_parts();
    let mut source = Cursor::new(parts.read_buf.freeze()).chain(parts.io);

    match config.ack_mode {
        AckMode::Stream => {
            stream_content(stdin, &mut source, &mut file, &local_path, config, progress).await?;
            if progress.bytes != control.size {
                tracing::debug!(
                    "Peer declared {} bytes but sent {}",
                    control.size,
                    progress.bytes
                );
            }
        }
        AckMode::Checked => {
            checked_content(&mut source, &mut file, &local_path, &control, config, progress)
                .await?;
            check_response(read_response(&mut source).await?)?;
            write_ack(stdin).await?;
        }
    }

    file.flush()
        .await
        .map_err(|e| TransferError::local(&local_path, e))?;
    file.sync_all()
        .await
        .map_err(|e| TransferError::local(&local_path, e))?;

    Ok(())
}

/// Copy chunks until the peer closes its output, acking each chunk
///
/// Acks are best effort: the source may exit as soon as its last byte is
/// out, after which nobody reads them. The source's trailing status byte is
/// not told apart from content and is written to the file.
async fn stream_content<W, R>(
    stdin: &mut W,
    source: &mut R,
    file: &mut tokio::fs::File,
    local_path: &Path,
    config: &TransferConfig,
    progress: &mut Progress,
) -> Result<(), ScpError>
where
    W: AsyncWrite + Unpin,
    R: AsyncRead + Unpin,
{
    let mut buf = vec![0u8; config.chunk_size()];
    let mut acking = true;

    loop {
        let n = source.read(&mut buf).await?;
        if n == 0 {
            break;
        }

        file.write_all(&buf[..n])
            .await
            .map_err(|e| TransferError::local(local_path, e))?;
        progress.bytes += n as u64;

        if acking {
            if let Err(e) = write_ack(stdin).await {
                tracing::debug!("Peer stopped reading acks: {}", e);
                acking = false;
            }
        }
    }

    Ok(())
}

/// Copy exactly the declared number of bytes
async fn checked_content<R>(
    source: &mut R,
    file: &mut tokio::fs::File,
    local_path: &Path,
    control: &ControlLine,
    config: &TransferConfig,
    progress: &mut Progress,
) -> Result<(), ScpError>
where
    R: AsyncRead + Unpin,
{
    let mut buf = vec![0u8; config.chunk_size()];
    let mut remaining = control.size;

    while remaining > 0 {
        let want = remaining.min(buf.len() as u64) as usize;
        let n = source.read(&mut buf[..want]).await?;
        if n == 0 {
            return Err(TransferError::ShortTransfer {
                expected: control.size,
                actual: control.size - remaining,
            }
            .into());
        }

        file.write_all(&buf[..n])
            .await
            .map_err(|e| TransferError::local(local_path, e))?;
        remaining -= n as u64;
        progress.bytes += n as u64;
    }

    Ok(())
}
