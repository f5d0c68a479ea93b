//! rscp: Command-line interface for single-file SCP transfers
//!
//! Provides the `rscp` binary: `get` and `put` copy one file over the
//! legacy SCP exchange, `exec` runs a one-shot remote command.

pub mod commands;
pub mod options;
pub mod output;
