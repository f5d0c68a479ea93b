//! Single-file SCP transfer engines
//!
//! Both engines follow the same shape: take the two pipe ends of a fresh
//! invocation, move them into a background task that speaks the protocol,
//! run the remote `scp` command in the foreground, then join the two.

mod receive;
mod send;

pub use receive::{receive_file, ReceiveRequest};
pub use send::{send_file, SendRequest};

use std::future::Future;
use std::path::PathBuf;

use scp_core::config::{ErrorPolicy, TransferConfig};
use scp_core::{CommandInvocation, ScpError, TransferError, TransferSummary};
use scp_protocol::{ControlLine, Response};

/// What the background exchange got done, kept even when it fails
#[derive(Debug, Default)]
pub(crate) struct Progress {
    /// Control line sent or received
    pub control: Option<ControlLine>,
    /// Content bytes moved so far
    pub bytes: u64,
    /// Local file, once its name is known
    pub local_path: Option<PathBuf>,
}

/// Result of a background exchange together with its partial progress
pub(crate) type Exchange = (Progress, Result<(), ScpError>);

/// Surface a peer status record as an error unless it says "proceed"
pub(crate) fn check_response(response: Response) -> Result<(), ScpError> {
    if let Response::Warning(message) = &response {
        tracing::warn!("Remote scp: {}", message);
    }
    response.into_result().map_err(ScpError::from)
}

/// Run `command` on `invocation` while `exchange` drives the pipes, then join
///
/// Setup failures (the command could not be started) are always returned.
/// Failures inside the exchange follow `config.error_policy`.
pub(crate) async fn run_invocation<I, F>(
    mut invocation: I,
    command: String,
    exchange: F,
    config: &TransferConfig,
    mut summary: TransferSummary,
) -> Result<TransferSummary, ScpError>
where
    I: CommandInvocation,
    F: Future<Output = Exchange> + Send + 'static,
{
    let mut task = tokio::spawn(exchange);

    let joined = async {
        let status = match invocation.run(&command).await {
            Ok(status) => status,
            Err(e) => {
                task.abort();
                return Err(ScpError::from(e));
            }
        };
        let outcome = (&mut task)
            .await
            .map_err(|e| TransferError::TaskFailed(e.to_string()))?;
        Ok::<_, ScpError>((status, outcome))
    };

    let joined = match config.timeout {
        Some(limit) => tokio::time::timeout(limit, joined).await.map_err(|_| limit),
        None => Ok(joined.await),
    };
    let joined = match joined {
        Ok(result) => result,
        Err(limit) => {
            task.abort();
            return Err(TransferError::TimedOut(limit).into());
        }
    };
    let (status, (progress, result)) = joined?;

    summary.exit_status = status;
    summary.control = progress.control;
    summary.bytes_transferred = progress.bytes;
    if let Some(path) = progress.local_path {
        summary.local_path = path;
    }

    match status {
        Some(0) | None => {}
        Some(code) => tracing::debug!("Remote command exited with status {}", code),
    }

    match result {
        Ok(()) => {
            summary.complete = true;
            tracing::info!("Completed {}", summary);
            Ok(summary)
        }
        Err(e) => match config.error_policy {
            ErrorPolicy::Strict => Err(e),
            ErrorPolicy::Lenient => {
                tracing::error!("Transfer failed after setup: {}", e);
                Ok(summary)
            }
        },
    }
}
