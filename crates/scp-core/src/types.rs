//! Core domain types

use std::fmt;
use std::path::PathBuf;

use scp_protocol::ControlLine;

/// Direction of a single-file transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferDirection {
    /// Remote file copied to the local machine
    Download,
    /// Local file copied to the remote machine
    Upload,
}

impl fmt::Display for TransferDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransferDirection::Download => write!(f, "download"),
            TransferDirection::Upload => write!(f, "upload"),
        }
    }
}

/// Outcome of one completed transfer invocation
#[derive(Debug, Clone)]
pub struct TransferSummary {
    /// Which way the file went
    pub direction: TransferDirection,
    /// Local file written or read
    pub local_path: PathBuf,
    /// Remote path handed to the remote `scp`
    pub remote_path: String,
    /// Control line exchanged, if the exchange got that far
    pub control: Option<ControlLine>,
    /// Content bytes moved, excluding framing
    pub bytes_transferred: u64,
    /// Exit status of the remote command, when the channel reported one
    pub exit_status: Option<u32>,
    /// Whether the background exchange finished without error
    pub complete: bool,
}

impl TransferSummary {
    /// Start a summary before any bytes have moved
    pub fn new(
        direction: TransferDirection,
        local_path: impl Into<PathBuf>,
        remote_path: impl Into<String>,
    ) -> Self {
        Self {
            direction,
            local_path: local_path.into(),
            remote_path: remote_path.into(),
            control: None,
            bytes_transferred: 0,
            exit_status: None,
            complete: false,
        }
    }
}

impl fmt::Display for TransferSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (from, to) = match self.direction {
            TransferDirection::Download => (
                self.remote_path.clone(),
                self.local_path.display().to_string(),
            ),
            TransferDirection::Upload => (
                self.local_path.display().to_string(),
                self.remote_path.clone(),
            ),
        };
        write!(
            f,
            "{} {} -> {} ({} bytes)",
            self.direction, from, to, self.bytes_transferred
        )
    }
}
