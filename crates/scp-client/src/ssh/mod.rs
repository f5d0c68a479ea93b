//! SSH session provider backed by russh
//!
//! [`SshSession`] holds one authenticated connection and hands out a fresh
//! session channel per [`SshInvocation`].

mod connector;
mod invocation;

pub use connector::SshSession;
pub use invocation::SshInvocation;
