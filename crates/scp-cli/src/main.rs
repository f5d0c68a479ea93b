//! rscp CLI
//!
//! Copies single files to and from a remote host by driving the remote
//! `scp` binary over SSH:
//! - `get`: remote file into a local directory
//! - `put`: local file into the remote login directory
//! - `exec`: one-shot remote command

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use rscp::commands;
use rscp::options::{load_settings, ConnectionArgs, TransferArgs};

#[derive(Parser)]
#[command(name = "rscp")]
#[command(author, version, about = "Single-file SCP client over SSH")]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Log level (error, warn, info, debug, trace); overrides -v/-q
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Download a remote file
    Get {
        /// Remote file, as `dir/name`
        remote: String,
        /// Local directory to write into
        #[arg(default_value = ".")]
        local_dir: PathBuf,
        /// Store under this name instead of the one sent by the remote
        #[arg(short, long)]
        output: Option<String>,
        #[command(flatten)]
        connection: ConnectionArgs,
        #[command(flatten)]
        transfer: TransferArgs,
    },

    /// Upload a local file into the remote login directory
    Put {
        /// Local file
        local: PathBuf,
        #[command(flatten)]
        connection: ConnectionArgs,
        #[command(flatten)]
        transfer: TransferArgs,
    },

    /// Run a command on the remote host and print its output
    Exec {
        #[command(flatten)]
        connection: ConnectionArgs,
        /// Command and arguments
        #[arg(required = true, trailing_var_arg = true)]
        command: Vec<String>,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration
    Show,
    /// Write a configuration file with default values
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
    /// Get specific config value
    Get { key: String },
    /// Set config value
    Set { key: String, value: String },
    /// Show config file path
    Path,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    let log_level = match (cli.log_level.as_deref(), cli.quiet, cli.verbose) {
        (Some(level), _, _) => level,
        (None, true, _) => "error",
        (None, false, 0) => "warn",
        (None, false, 1) => "info",
        (None, false, 2) => "debug",
        (None, false, _) => "trace",
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| log_level.into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let config_path = cli.config.as_ref();

    match cli.command {
        Commands::Get {
            remote,
            local_dir,
            output,
            connection,
            transfer,
        } => {
            let mut settings = load_settings(config_path)?;
            connection.apply(&mut settings.connection);
            transfer.apply(&mut settings.transfer);
            commands::get_command(&settings, &remote, &local_dir, output.as_deref()).await?;
        }

        Commands::Put {
            local,
            connection,
            transfer,
        } => {
            let mut settings = load_settings(config_path)?;
            connection.apply(&mut settings.connection);
            transfer.apply(&mut settings.transfer);
            commands::put_command(&settings, &local).await?;
        }

        Commands::Exec {
            connection,
            command,
        } => {
            let mut settings = load_settings(config_path)?;
            connection.apply(&mut settings.connection);
            commands::exec_command(&settings, &command).await?;
        }

        Commands::Config { action } => match action {
            ConfigAction::Show => commands::config_show(config_path)?,
            ConfigAction::Init { force } => commands::config_init(config_path, force)?,
            ConfigAction::Get { key } => commands::config_get(config_path, &key)?,
            ConfigAction::Set { key, value } => commands::config_set(config_path, &key, &value)?,
            ConfigAction::Path => commands::config_path(config_path),
        },
    }

    Ok(())
}
