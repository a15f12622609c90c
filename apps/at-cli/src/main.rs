//! # at-cli
//!
//! Command-line companion for the autoscaling trigger harness.
//!
//! - `triggerctl validate <file>` — check trigger definitions without starting them
//! - `triggerctl state list/show/clear` — inspect checkpointed trigger state

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

/// Autoscaling trigger tool — validate definitions and inspect checkpoints.
#[derive(Parser)]
#[command(name = "triggerctl", version, about)]
struct Cli {
    /// Store configuration (TOML). Without one, an empty in-memory store is used.
    #[arg(long, global = true, default_value = "store.toml")]
    store: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a trigger definition file (.toml, .yaml or .yml).
    Validate {
        /// Definition file.
        file: PathBuf,
        /// Extra properties accepted on top of the base set (repeatable).
        #[arg(long = "allow")]
        allow: Vec<String>,
    },
    /// Inspect checkpointed trigger state.
    State {
        #[command(subcommand)]
        command: commands::state::StateCommands,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("at_trigger=info".parse()?)
                .add_directive("at_state=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Validate { file, allow } => commands::validate::execute(file, allow),
        Commands::State { command } => commands::state::execute(command, &cli.store),
    }
}
