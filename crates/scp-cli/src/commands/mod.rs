//! CLI command implementations

mod config;
mod exec;
mod transfer;

pub use config::{config_get, config_init, config_path, config_set, config_show};
pub use exec::exec_command;
pub use transfer::{get_command, put_command};
