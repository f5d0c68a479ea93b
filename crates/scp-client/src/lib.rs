//! scp-client: Single-file SCP transfers over an SSH session
//!
//! The engines in [`transfer`] speak the legacy SCP exchange with a remote
//! `scp -f` / `scp -t` process. They only need a
//! [`SessionProvider`](scp_core::SessionProvider); [`ssh::SshSession`] is the
//! russh-backed one.

pub mod exec;
pub mod ssh;
pub mod transfer;

pub use exec::execute_command;
pub use ssh::{SshInvocation, SshSession};
pub use transfer::{receive_file, send_file, ReceiveRequest, SendRequest};
