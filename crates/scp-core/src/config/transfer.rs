//! Transfer engine configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

use scp_protocol::{FileMode, Terminator, DEFAULT_MODE};

use super::serde_utils::{octal_mode, option_duration_secs};

/// Remote `scp` binary invoked by both engines
pub const DEFAULT_SCP_PATH: &str = "/usr/bin/scp";

/// Default chunk size for streaming file content
pub const DEFAULT_BUFFER_SIZE: usize = 32 * 1024;

/// How acknowledgments are exchanged with the peer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AckMode {
    /// Receiver acks every chunk and stops at end of stream; sender never
    /// waits for acks and ends with a `\0\n` terminator.
    ///
    /// Everything up to end of stream lands in the file, including the
    /// status byte a source `scp -f` writes after the content. A download
    /// from a real `scp` is therefore one `\0` longer than the declared size.
    /// Use [`AckMode::Checked`] for byte-exact downloads.
    #[default]
    Stream,
    /// Both sides read the peer's status byte at every step and surface
    /// warnings/errors; receiver reads exactly the declared size.
    Checked,
}

impl AckMode {
    /// Terminator the sender writes after the content
    pub fn terminator(&self) -> Terminator {
        match self {
            AckMode::Stream => Terminator::Line,
            AckMode::Checked => Terminator::Status,
        }
    }
}

/// What a transfer does with failures that happen after setup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorPolicy {
    /// Every failure is returned to the caller
    #[default]
    Strict,
    /// Only setup failures are returned; failures inside the exchange are
    /// logged and the partial summary is returned
    Lenient,
}

/// Configuration shared by the receive and send engines
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransferConfig {
    /// Path of the `scp` binary on the remote host
    pub scp_path: String,

    /// Permission bits announced for uploads
    #[serde(with = "octal_mode")]
    pub default_mode: FileMode,

    /// Announce the local file's own permission bits instead of `default_mode`
    pub preserve_mode: bool,

    /// Chunk size used for streaming content
    pub buffer_size: usize,

    /// Acknowledgment handling
    pub ack_mode: AckMode,

    /// Failure reporting
    pub error_policy: ErrorPolicy,

    /// Deadline for a whole transfer (none by default)
    #[serde(
        default,
        with = "option_duration_secs",
        skip_serializing_if = "Option::is_none"
    )]
    pub timeout: Option<Duration>,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            scp_path: DEFAULT_SCP_PATH.to_string(),
            default_mode: DEFAULT_MODE,
            preserve_mode: false,
            buffer_size: DEFAULT_BUFFER_SIZE,
            ack_mode: AckMode::default(),
            error_policy: ErrorPolicy::default(),
            timeout: None,
        }
    }
}

impl TransferConfig {
    /// Chunk size, never zero
    pub fn chunk_size(&self) -> usize {
        self.buffer_size.max(1)
    }

    /// Command that makes the remote `scp` send `path`
    pub fn source_command(&self, path: &str) -> String {
        format!("{} -f {}", self.scp_path, path)
    }

    /// Command that makes the remote `scp` receive into its working directory
    pub fn sink_command(&self) -> String {
        format!("{} -t ./", self.scp_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_commands() {
        let config = TransferConfig::default();
        assert_eq!(
            config.source_command("/var/data/report.csv"),
            "/usr/bin/scp -f /var/data/report.csv"
        );
        assert_eq!(config.sink_command(), "/usr/bin/scp -t ./");
    }

    #[test]
    fn test_default_chunk_size() {
        assert_eq!(TransferConfig::default().chunk_size(), 32 * 1024);
    }

    #[test]
    fn test_chunk_size_never_zero() {
        let config = TransferConfig {
            buffer_size: 0,
            ..Default::default()
        };
        assert_eq!(config.chunk_size(), 1);
    }

    #[test]
    fn test_terminator_per_mode() {
        assert_eq!(AckMode::Stream.terminator(), Terminator::Line);
        assert_eq!(AckMode::Checked.terminator(), Terminator::Status);
    }

    #[test]
    fn test_toml_roundtrip() {
        let config = TransferConfig {
            preserve_mode: true,
            ack_mode: AckMode::Checked,
            error_policy: ErrorPolicy::Lenient,
            timeout: Some(Duration::from_secs(120)),
            ..Default::default()
        };

        let text = toml::to_string_pretty(&config).unwrap();
        assert!(text.contains(r#"ack_mode = "checked""#));
        assert!(text.contains(r#"default_mode = "0644""#));

        let parsed: TransferConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed.ack_mode, AckMode::Checked);
        assert_eq!(parsed.error_policy, ErrorPolicy::Lenient);
        assert_eq!(parsed.timeout, Some(Duration::from_secs(120)));
        assert!(parsed.preserve_mode);
    }
}
