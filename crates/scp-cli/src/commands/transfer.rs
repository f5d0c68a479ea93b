//! `get` and `put`

use std::path::Path;

use anyhow::{Context, Result};

use scp_client::{receive_file, send_file, ReceiveRequest, SendRequest, SshSession};
use scp_core::config::ConfigFile;
use scp_core::TransferSummary;

use crate::options::{split_local, split_remote};
use crate::output::{format_summary, print_success, print_warning};

/// Download `remote` (`dir/name`) into `local_dir`
pub async fn get_command(
    settings: &ConfigFile,
    remote: &str,
    local_dir: &Path,
    local_name: Option<&str>,
) -> Result<()> {
    let (remote_dir, remote_name) = split_remote(remote)?;
    let mut request = ReceiveRequest::new(remote_dir, remote_name, local_dir);
    if let Some(name) = local_name {
        request = request.with_local_name(name);
    }

    let session = connect(settings).await?;
    let result = receive_file(&session, &request, &settings.transfer).await;
    disconnect(session).await;

    let summary = result.with_context(|| format!("Failed to download {}", remote))?;
    report(&summary);
    Ok(())
}

/// Upload `local` into the remote login directory
pub async fn put_command(settings: &ConfigFile, local: &Path) -> Result<()> {
    let (local_dir, file_name) = split_local(local)?;
    let request = SendRequest::new(local_dir, file_name);

    let session = connect(settings).await?;
    let result = send_file(&session, &request, &settings.transfer).await;
    disconnect(session).await;

    let summary = result.with_context(|| format!("Failed to upload {:?}", local))?;
    report(&summary);
    Ok(())
}

pub(crate) async fn connect(settings: &ConfigFile) -> Result<SshSession> {
    SshSession::connect(&settings.connection)
        .await
        .with_context(|| format!("Failed to connect to {}", settings.connection.address()))
}

pub(crate) async fn disconnect(session: SshSession) {
    if let Err(e) = session.close().await {
        tracing::debug!("Disconnect failed: {}", e);
    }
}

fn report(summary: &TransferSummary) {
    if summary.complete {
        print_success(&format_summary(summary));
    } else {
        print_warning(&format!("Incomplete: {}", format_summary(summary)));
    }
}
