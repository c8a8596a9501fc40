//! Bankist CLI - a small demo bank in your terminal

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod output;

use commands::{accounts, shell, GlobalOptions};

/// Bankist - a small demo bank in your terminal
#[derive(Parser)]
#[command(name = "bankist", version, about, long_about = None)]
struct Cli {
    /// Directory holding settings.json
    #[arg(long, global = true, env = "BANKIST_DIR")]
    dir: Option<PathBuf>,

    /// Log out after this many idle seconds
    #[arg(long, global = true, value_name = "SECS")]
    logout_after: Option<u64>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start an interactive session (default)
    Shell {
        /// Output as JSON lines
        #[arg(long)]
        json: bool,
    },

    /// List the configured accounts
    Accounts {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn init_tracing() {
    // stdout belongs to the shell, logs go to stderr
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output::error(&format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let options = GlobalOptions {
        dir: cli.dir,
        logout_after: cli.logout_after,
    };

    match cli.command.unwrap_or(Commands::Shell { json: false }) {
        Commands::Shell { json } => shell::run(&options, json).await,
        Commands::Accounts { json } => accounts::run(&options, json),
    }
}
