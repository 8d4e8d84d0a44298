use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod config;
mod sync;

use commands::{
    ConfigCommand, DeleteCommand, ListCommand, PullCommand, PutCommand, StatusCommand,
    SyncCommand,
};
use config::Config;
use sync::try_auto_sync;

#[derive(Parser)]
#[command(name = "larder")]
#[command(version)]
#[command(about = "Offline-first record collections with server sync", long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or update a record
    Put(PutCommand),

    /// Delete a record
    Delete(DeleteCommand),

    /// List records in a collection
    List(ListCommand),

    /// Push local changes and pull remote ones
    Sync(SyncCommand),

    /// Pull remote changes without pushing
    Pull(PullCommand),

    /// Show sync configuration and server status
    Status,

    /// Manage configuration
    Config(ConfigCommand),
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Load configuration
    let config = Config::load(cli.config)?;

    // Auto-sync BEFORE read commands
    if let Some(collection) = read_collection(&cli.command) {
        try_auto_sync(&config, collection);
    }

    // Execute the command
    let result = execute_command(&cli.command, &config);

    // Auto-sync AFTER write commands (only if command succeeded)
    if result.is_ok() {
        if let Some(collection) = written_collection(&cli.command) {
            try_auto_sync(&config, collection);
        }
    }

    result
}

fn execute_command(
    command: &Option<Commands>,
    config: &Config,
) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Some(Commands::Put(cmd)) => cmd.run(config)?,
        Some(Commands::Delete(cmd)) => cmd.run(config)?,
        Some(Commands::List(cmd)) => cmd.run(config)?,
        Some(Commands::Sync(cmd)) => cmd.run(config)?,
        Some(Commands::Pull(cmd)) => cmd.run(config)?,
        Some(Commands::Status) => StatusCommand.run(config)?,
        Some(Commands::Config(cmd)) => cmd.run(config)?,
        None => {
            println!("Use --help to see available commands");
        }
    }

    Ok(())
}

/// Collection read by the command, synced before it runs.
fn read_collection(cmd: &Option<Commands>) -> Option<&str> {
    match cmd {
        Some(Commands::List(list)) => Some(list.collection.as_str()),
        _ => None,
    }
}

/// Collection changed by the command, synced after it succeeds.
fn written_collection(cmd: &Option<Commands>) -> Option<&str> {
    match cmd {
        Some(Commands::Put(put)) => Some(put.collection.as_str()),
        Some(Commands::Delete(delete)) => Some(delete.collection.as_str()),
        _ => None,
    }
}
