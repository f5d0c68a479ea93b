//! `exec`

use std::io::Write;

use anyhow::{Context, Result};

use scp_client::execute_command;
use scp_core::config::ConfigFile;

use super::transfer::{connect, disconnect};

/// Run one command on the remote host and print its output
pub async fn exec_command(settings: &ConfigFile, words: &[String]) -> Result<()> {
    let command = words.join(" ");
    if command.trim().is_empty() {
        anyhow::bail!("No command given");
    }

    let session = connect(settings).await?;
    let result = execute_command(&session, &command).await;
    disconnect(session).await;

    let output = result.with_context(|| format!("Failed to run {:?}", command))?;
    let mut stdout = std::io::stdout();
    stdout.write_all(output.as_bytes())?;
    stdout.flush()?;
    Ok(())
}
