//! Sitewright CLI - inspect and prune assistant conversations.
//!
//! File commands (`stats`, `prune`) work on a JSON array of messages and
//! never touch the session store. `session` commands go through
//! [`ContextService`](sitewright_context::ContextService) backed by SQLite.

mod commands;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use sitewright_config::SitewrightConfig;
use sitewright_types::Role;

#[derive(Parser)]
#[command(name = "sitewright")]
#[command(about = "Inspect, prune and manage assistant conversations", long_about = None)]
#[command(version)]
struct Cli {
    /// Config file (defaults to $SITEWRIGHT_CONFIG or ~/.sitewright/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print message counts and token estimate for a messages file
    Stats {
        /// JSON array of messages
        file: PathBuf,
    },
    /// Prune a messages file with the configured policy
    Prune {
        /// JSON array of messages
        file: PathBuf,
        /// Summary to carry into the result
        #[arg(long)]
        summary: Option<String>,
        #[arg(long)]
        max_messages: Option<usize>,
        #[arg(long)]
        max_tokens: Option<u32>,
        #[arg(long)]
        preserve_recent: Option<usize>,
        /// Write the result here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Stored session commands
    Session {
        /// Session database (overrides [store] path)
        #[arg(long)]
        store: Option<PathBuf>,

        #[command(subcommand)]
        command: SessionCommands,
    },
}

#[derive(Subcommand)]
enum SessionCommands {
    /// List stored sessions
    List,
    /// Print a session record
    Show { key: String },
    /// Print stats for a session
    Stats { key: String },
    /// Append a message, pruning if the session exceeds the policy
    Append {
        key: String,
        #[arg(long, default_value = "user")]
        role: Role,
        #[arg(long)]
        content: String,
    },
    /// Delete a session
    Clear { key: String },
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    // stdout carries command output; logs go to stderr.
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(env_filter)
        .init();
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => SitewrightConfig::load_from(path)?,
        None => SitewrightConfig::load()?,
    }
    .unwrap_or_default();

    match cli.command {
        Commands::Stats { file } => commands::file_stats(&file),
        Commands::Prune {
            file,
            summary,
            max_messages,
            max_tokens,
            preserve_recent,
            output,
        } => {
            let mut policy = config.policy();
            if let Some(max_messages) = max_messages {
                policy.max_messages = max_messages;
            }
            if let Some(max_tokens) = max_tokens {
                policy.max_tokens = max_tokens;
            }
            if let Some(count) = preserve_recent {
                policy.preserve_recent_count = count;
            }
            commands::prune_file(&file, summary.as_deref(), &policy, output.as_deref())
        }
        Commands::Session { store, command } => {
            let mut service = commands::open_service(&config, store)?;
            match command {
                SessionCommands::List => commands::list_sessions(&service),
                SessionCommands::Show { key } => commands::show_session(&service, &key),
                SessionCommands::Stats { key } => commands::session_stats(&service, &key),
                SessionCommands::Append { key, role, content } => {
                    commands::append_message(&mut service, &key, role, content)
                }
                SessionCommands::Clear { key } => commands::clear_session(&mut service, &key),
            }
        }
    }
}
