//! CLI entry point for agent-runloop.

pub mod replay;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Agent run loop CLI
#[derive(Parser, Debug)]
#[command(name = "agent-runloop", version, about = "Replay agent event feeds through the run loop")]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Replay a recorded engine feed and print the client event stream
    Replay(ReplayArgs),
}

/// Arguments for the `replay` subcommand.
#[derive(Parser, Debug)]
pub struct ReplayArgs {
    /// Feed file, one JSON event per line
    pub file: PathBuf,

    /// Thread id stamped on state snapshots
    #[arg(long, default_value = "replay")]
    pub thread_id: String,

    /// Agent name stamped on state snapshots
    #[arg(long, default_value = "agent")]
    pub agent_name: String,

    /// Run id (generated when omitted)
    #[arg(long)]
    pub run_id: Option<String>,

    /// TOML config file (defaults to the user config dir, then env)
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}
