use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod cmd;

#[derive(Parser)]
#[command(name = "kanban-relay")]
#[command(version, about = "Real-time collaborative Kanban board relay")]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to relay.toml. Defaults to .kanban/relay.toml when it exists.
    #[arg(long, global = true, env = "KANBAN_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Serve the board over WebSocket and HTTP
    Serve {
        /// Port to serve on (overrides config and PORT)
        #[arg(short, long)]
        port: Option<u16>,

        /// Interface to bind (overrides config and KANBAN_HOST)
        #[arg(long)]
        host: Option<String>,

        /// Enable dev mode (CORS permissive for a UI dev server)
        #[arg(long)]
        dev: bool,

        /// Start with an empty board instead of the demo board
        #[arg(long)]
        no_seed: bool,

        /// Log output format: pretty, json
        #[arg(long)]
        log_format: Option<String>,

        /// Also append logs to this file
        #[arg(long)]
        log_file: Option<PathBuf>,
    },
    /// View, validate or initialize configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand, Clone)]
pub enum ConfigCommands {
    /// Show the effective configuration as TOML
    Show,
    /// Validate configuration
    Validate,
    /// Write a default relay.toml
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    match &cli.command {
        Commands::Serve {
            port,
            host,
            dev,
            no_seed,
            log_format,
            log_file,
        } => {
            let overrides = cmd::ServeOverrides {
                port: *port,
                host: host.clone(),
                dev: *dev,
                no_seed: *no_seed,
                log_format: log_format.clone(),
                log_file: log_file.clone(),
            };
            cmd::cmd_serve(cli.config.as_deref(), overrides, cli.verbose).await?;
        }
        Commands::Config { command } => {
            cmd::cmd_config(cli.config.as_deref(), command.clone())?;
        }
    }

    Ok(())
}
