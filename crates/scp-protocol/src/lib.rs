//! scp-protocol: Wire format of the legacy SCP exchange
//!
//! This crate defines the control line, acknowledgment bytes and record
//! codec spoken with a remote `scp -f` / `scp -t` process over its
//! standard input and output.

pub mod ack;
pub mod codec;
pub mod control;
pub mod error;

pub use ack::{read_response, write_ack, Response, Terminator, ACK};
pub use codec::{ControlLineCodec, Record};
pub use control::{ControlLine, FileMode, DEFAULT_MODE, MAX_CONTROL_LINE};
pub use error::ProtocolError;
