//! # buzz
//!
//! Command-line surface for buzzline.
//!
//! ## Commands
//!
//! - `init`: Create the local actor profile
//! - `contact`: Manage the target directory
//! - `send`: Buzz one or more contacts
//! - `group`: Create or join a group channel
//! - `status`: Show profile, contacts, and channel mode
//!
//! ## Example
//!
//! ```bash
//! # Create a profile
//! buzz init --name "Ann"
//!
//! # Save a contact (a pasted relay URL works too)
//! buzz contact add Bob abc123
//!
//! # Buzz everyone
//! buzz send "Meeting starts in 5!" --all
//!
//! # Create a group and listen for events
//! buzz group create Standup --listen
//!
//! # On another machine, join it
//! buzz group join 4242 --listen
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod config;

use commands::{contacts, group, init, send, status};

/// Lightweight attention alerts: direct buzzes and group channels.
#[derive(Parser, Debug)]
#[command(name = "buzz")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Data directory for profile, contacts, and settings
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create the local actor profile
    Init {
        /// Display name attached to outgoing buzzes
        #[arg(long, short)]
        name: String,
    },

    /// Manage saved contacts
    Contact {
        #[command(subcommand)]
        action: ContactAction,
    },

    /// Buzz one or more contacts
    Send {
        /// Message to deliver
        message: String,

        /// Contact names to buzz (repeatable)
        #[arg(long, short, conflicts_with = "all")]
        to: Vec<String>,

        /// Buzz every saved contact
        #[arg(long, conflicts_with = "to")]
        all: bool,
    },

    /// Create or join a group channel
    Group {
        #[command(subcommand)]
        action: GroupAction,
    },

    /// Show profile, contacts, and channel mode
    Status,
}

#[derive(Subcommand, Debug)]
enum ContactAction {
    /// Save a contact
    Add {
        /// Contact name
        name: String,
        /// Relay endpoint key, or a pasted relay URL
        key: String,
    },
    /// List saved contacts
    List,
    /// Remove a contact
    Remove {
        /// Contact name
        name: String,
    },
}

#[derive(Subcommand, Debug)]
enum GroupAction {
    /// Create a group and print its join code
    Create {
        /// Group name
        name: String,

        /// Stay subscribed and print incoming events
        #[arg(long)]
        listen: bool,
    },
    /// Join a group by code
    Join {
        /// 4-digit join code
        code: String,

        /// Stay subscribed and print incoming events
        #[arg(long)]
        listen: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    let data_dir = match cli.data_dir {
        Some(dir) => dir,
        None => default_data_dir()?,
    };
    tokio::fs::create_dir_all(&data_dir)
        .await
        .context("Failed to create data directory")?;

    match cli.command {
        Commands::Init { name } => {
            init::run(&data_dir, &name).await?;
        }
        Commands::Contact { action } => match action {
            ContactAction::Add { name, key } => {
                contacts::add(&data_dir, &name, &key).await?;
            }
            ContactAction::List => {
                contacts::list(&data_dir).await?;
            }
            ContactAction::Remove { name } => {
                contacts::remove(&data_dir, &name).await?;
            }
        },
        Commands::Send { message, to, all } => {
            send::run(&data_dir, &message, &to, all).await?;
        }
        Commands::Group { action } => match action {
            GroupAction::Create { name, listen } => {
                group::create(&data_dir, &name, listen).await?;
            }
            GroupAction::Join { code, listen } => {
                group::join(&data_dir, &code, listen).await?;
            }
        },
        Commands::Status => {
            status::run(&data_dir).await?;
        }
    }

    Ok(())
}

/// Get the default data directory for buzz.
fn default_data_dir() -> Result<PathBuf> {
    let dirs = directories::ProjectDirs::from("app", "buzzline", "buzz")
        .context("Could not determine home directory")?;
    Ok(dirs.data_dir().to_path_buf())
}
