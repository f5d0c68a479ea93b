//! Protocol error types

use thiserror::Error;

/// Errors that can occur while encoding or decoding SCP records
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// Control line did not have the `C<mode> <size> <name>` shape
    #[error("Malformed control line: {0:?}")]
    MalformedControlLine(String),

    /// Permission field was not an octal number
    #[error("Invalid file mode: {0:?}")]
    InvalidMode(String),

    /// Size field was not a decimal number
    #[error("Invalid file size: {0:?}")]
    InvalidSize(String),

    /// Peer supplied a file name that would escape the destination directory
    #[error("Unsafe file name from peer: {0:?}")]
    UnsafeFileName(String),

    /// Control line exceeded the maximum accepted length
    #[error("Control line too long: more than {max} bytes")]
    ControlLineTooLong { max: usize },

    /// Peer sent a record kind this client does not handle
    #[error("Unsupported record type: {0:?}")]
    UnsupportedRecord(char),

    /// Peer sent a byte that does not start any known record
    #[error("Unexpected byte from peer: 0x{0:02x}")]
    UnexpectedByte(u8),

    /// Peer reported a warning (0x01) or fatal error (0x02)
    #[error("Remote {}: {message}", severity(.fatal))]
    Remote { fatal: bool, message: String },

    /// Stream ended where a record was expected
    #[error("Unexpected end of stream while waiting for {0}")]
    UnexpectedEof(&'static str),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn severity(fatal: &bool) -> &'static str {
    if *fatal {
        "error"
    } else {
        "warning"
    }
}
