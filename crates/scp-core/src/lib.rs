//! scp-core: Core abstractions and configuration for rscp
//!
//! This crate provides shared types, traits, error types and configuration
//! structures used by the transfer engines and the CLI.

pub mod config;
pub mod error;
pub mod traits;
pub mod types;

pub use error::{ConfigError, ScpError, SessionError, TransferError};
pub use traits::{CommandInvocation, SessionProvider};
pub use types::{TransferDirection, TransferSummary};
