//! Acknowledgment and status bytes
//!
//! A receiver paces the sender with single `0x00` bytes. Real SCP peers also
//! report problems with `0x01` (warning) or `0x02` (fatal) followed by a
//! newline-terminated message.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::control::MAX_CONTROL_LINE;
use crate::error::ProtocolError;

/// "Proceed" byte
pub const ACK: u8 = 0x00;

/// Status byte introducing a warning message
pub const WARNING: u8 = 0x01;

/// Status byte introducing a fatal error message
pub const FATAL: u8 = 0x02;

/// Status reported by a peer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// Peer is ready for the next step
    Ok,
    /// Peer reported a recoverable problem
    Warning(String),
    /// Peer reported an error and will stop
    Fatal(String),
}

impl Response {
    /// Whether the peer signalled "proceed"
    pub fn is_ok(&self) -> bool {
        matches!(self, Response::Ok)
    }

    /// Turn a warning or fatal response into an error
    pub fn into_result(self) -> Result<(), ProtocolError> {
        match self {
            Response::Ok => Ok(()),
            Response::Warning(message) => Err(ProtocolError::Remote {
                fatal: false,
                message,
            }),
            Response::Fatal(message) => Err(ProtocolError::Remote {
                fatal: true,
                message,
            }),
        }
    }
}

/// End-of-transfer marker written by the sender after the content
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Terminator {
    /// Null byte plus newline
    Line,
    /// Bare null status byte, as real SCP sources send it
    Status,
}

impl Terminator {
    /// Bytes of the terminator on the wire
    pub fn as_bytes(&self) -> &'static [u8] {
        match self {
            Terminator::Line => b"\0\n",
            Terminator::Status => b"\0",
        }
    }
}

/// Write a single acknowledgment byte and flush it
pub async fn write_ack<W>(writer: &mut W) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(&[ACK]).await?;
    writer.flush().await
}

/// Read one status record from the peer
pub async fn read_response<R>(reader: &mut R) -> Result<Response, ProtocolError>
where
    R: AsyncRead + Unpin,
{
    let mut byte = [0u8; 1];
    if reader.read(&mut byte).await? == 0 {
        return Err(ProtocolError::UnexpectedEof("response"));
    }

    match byte[0] {
        ACK => Ok(Response::Ok),
        code @ (WARNING | FATAL) => {
            let message = read_message_line(reader).await?;
            if code == FATAL {
                Ok(Response::Fatal(message))
            } else {
                Ok(Response::Warning(message))
            }
        }
        other => Err(ProtocolError::UnexpectedByte(other)),
    }
}

/// Read the message that follows a warning/fatal status byte
async fn read_message_line<R>(reader: &mut R) -> Result<String, ProtocolError>
where
    R: AsyncRead + Unpin,
{
    let mut message = Vec::new();
    let mut byte = [0u8; 1];
    loop {
        if reader.read(&mut byte).await? == 0 {
            break;
        }
        if byte[0] == b'\n' {
            break;
        }
        message.push(byte[0]);
        if message.len() > MAX_CONTROL_LINE {
            return Err(ProtocolError::ControlLineTooLong {
                max: MAX_CONTROL_LINE,
            });
        }
    }
    Ok(String::from_utf8_lossy(&message).into_owned())
}
