use clap::{Parser, Subcommand};
use rustls::crypto::{ring::default_provider, CryptoProvider};
use std::{path::PathBuf, time::Duration};
use tracing_subscriber::EnvFilter;

mod commands;
use commands::{handle_config_command, load_config, run_probe, ConfigCommands, ProbeOptions};

#[derive(Parser)]
#[command(name = "brpc-cli")]
#[command(about = "Operator tool for the blockchain RPC exporter")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Configuration Management
    #[command(subcommand)]
    Config(ConfigCommands),

    /// Run a single scrape against the configured endpoints and print the result
    Probe {
        /// Path to config file (defaults to BRPC_CONFIG or /config/config.yml)
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Seconds to wait for subscriptions before scraping
        #[arg(long, default_value = "5")]
        settle: u64,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Config(config_command) => {
            handle_config_command(config_command)?;
        }

        Commands::Probe { file, settle } => {
            CryptoProvider::install_default(default_provider())
                .map_err(|e| format!("Failed to install crypto provider: {e:?}"))?;

            let config = load_config(file.as_deref(), None)?;
            run_probe(&config, &ProbeOptions { settle: Duration::from_secs(settle) }).await?;
        }
    }

    Ok(())
}
