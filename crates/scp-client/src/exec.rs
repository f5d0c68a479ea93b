//! One-shot remote commands

use tokio::io::AsyncReadExt;

use scp_core::{CommandInvocation, ScpError, SessionError, SessionProvider, TransferError};

/// Run `command` on a fresh invocation and return what it printed
///
/// The command gets an empty standard input. A non-zero exit status is an
/// error; output is decoded lossily as UTF-8.
pub async fn execute_command<S>(session: &S, command: &str) -> Result<String, ScpError>
where
    S: SessionProvider,
{
    let mut invocation = session.open_invocation().await?;
    drop(invocation.stdin_pipe()?);
    let mut stdout = invocation.stdout_pipe()?;

    let reader = tokio::spawn(async move {
        let mut output = Vec::new();
        stdout.read_to_end(&mut output).await.map(|_| output)
    });

    let status = match invocation.run(command).await {
        Ok(status) => status,
        Err(e) => {
            reader.abort();
            return Err(e.into());
        }
    };
    let output = reader
        .await
        .map_err(|e| TransferError::TaskFailed(e.to_string()))??;

    match status {
        Some(0) | None => Ok(String::from_utf8_lossy(&output).into_owned()),
        Some(status) => Err(SessionError::CommandFailed {
            command: command.to_string(),
            status,
        }
        .into()),
    }
}
