use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod config;

use crate::commands::CommandContext;
use crate::commands::report::{ExportArgs, ShowArgs};
use crate::config::CliConfig;
use anyhow::Result;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "learnhub", about = "LearnHub offline reporting")]
pub struct Cli {
    /// Path to configuration file (TOML)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// JSON data snapshot (overrides $LEARNHUB_DATA)
    #[arg(long)]
    pub data: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
#[command(about = "Inspect or create CLI configuration")]
pub enum ConfigCommands {
    /// Show current effective configuration
    Show,
    /// Write the effective configuration to a file
    Init {
        #[arg(default_value = "learnhub.toml")]
        path: PathBuf,
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Export a report as JSON, CSV, XLSX or PDF
    Export(ExportArgs),

    /// Print one page of a report with its summary
    Show(ShowArgs),

    /// Count the records in the data snapshot
    Inspect,

    /// Inspect or create configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let cli = Cli::parse();

    // Load configuration
    let config = CliConfig::resolve_config(cli.config, cli.data)?;

    // Create command context
    let ctx = CommandContext::new(config);

    // Dispatch commands
    match cli.command {
        Commands::Export(args) => {
            let path = commands::report::export_report(&ctx, args)?;
            println!("{}", path.display());
        }
        Commands::Show(args) => {
            commands::report::show_report(&ctx, args)?;
        }
        Commands::Inspect => {
            commands::inspect(&ctx)?;
        }
        Commands::Config { command } => {
            commands::config::handle_config_command(&ctx, command)?;
        }
    }

    Ok(())
}
