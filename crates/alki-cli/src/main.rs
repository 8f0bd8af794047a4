//! Alki CLI
//!
//! Command-line interface for Alki - HTML/CSS/JS items for the live preview
//! editor.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use alki_core::seed::DEFAULT_KIND;
use alki_core::{Config, Session, Status, SyncMode};

mod commands;
mod logging;
mod output;

use commands::item::FieldArgs;
use output::{Output, OutputFormat};

#[derive(Parser)]
#[command(name = "alki")]
#[command(about = "Alki - items for the live preview editor")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Quiet mode - minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Use a specific config file
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Keep every change in this session (nothing is sent)
    #[arg(long, global = true)]
    local: bool,

    /// More logging (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List all items
    #[command(alias = "ls")]
    List,
    /// Show an item (the selected one if no id is given)
    Show {
        /// Item ID
        id: Option<String>,
    },
    /// Create a new item
    Add {
        /// Item name (defaults to the next "UI Asset N")
        #[arg(short, long)]
        name: Option<String>,
        /// Item type
        #[arg(short = 't', long = "type", default_value = DEFAULT_KIND)]
        kind: String,
    },
    /// Change fields of an item
    Edit {
        /// Item ID
        id: String,
        #[command(flatten)]
        fields: FieldArgs,
    },
    /// Write the full item again
    Save {
        /// Item ID
        id: String,
    },
    /// Remove an item
    #[command(alias = "rm")]
    Remove {
        /// Item ID
        id: String,
        /// Remove from this session only, without telling the server
        #[arg(long)]
        session_only: bool,
    },
    /// Show collection status
    Status,
    /// Show or set configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand, Clone)]
enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key (api_url, mode, backend, data_dir, quiet_period_ms, ...)
        key: String,
        /// Configuration value
        value: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let output = Output::new(OutputFormat::from_flags(cli.json, cli.quiet));

    // Config commands don't need a session
    if let Commands::Config { command } = &cli.command {
        return handle_config_command(command.clone(), cli.config.as_ref(), &output);
    }

    let mut config = Config::load_with_cli_override(cli.config.as_ref())
        .context("Failed to load configuration")?;
    if cli.local {
        config.mode = SyncMode::Local;
    }
    logging::init(&config, cli.verbose);

    let session = Session::from_config(&config)?;
    if session.bootstrap().await == Some(Status::Offline) && config.mode == SyncMode::Remote {
        if let Some(failure) = session.last_error() {
            output.warn(&format!(
                "Could not load items ({}); showing built-in items",
                failure.message
            ));
        }
    }

    let result = match cli.command {
        Commands::List => commands::item::list(&session, &output),
        Commands::Show { id } => commands::item::show(&session, id, &output),
        Commands::Add { name, kind } => commands::item::add(&session, name, kind, &output).await,
        Commands::Edit { id, fields } => commands::item::edit(&session, id, fields, &output).await,
        Commands::Save { id } => commands::item::save(&session, id, &output).await,
        Commands::Remove { id, session_only } => {
            commands::item::remove(&session, id, session_only, &output).await
        }
        Commands::Status => commands::status::show(&session, &config, &output),
        Commands::Config { .. } => unreachable!(), // Handled above
    };

    // Push anything still waiting for its quiet period
    if !session.close().await {
        output.warn("Some changes could not be written");
    }

    result
}

fn handle_config_command(
    command: Option<ConfigCommands>,
    config_path: Option<&PathBuf>,
    output: &Output,
) -> Result<()> {
    match command {
        Some(ConfigCommands::Show) | None => commands::config::show(config_path, output),
        Some(ConfigCommands::Set { key, value }) => {
            commands::config::set(key, value, config_path, output)
        }
    }
}
