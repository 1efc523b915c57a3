use clap::Subcommand;
use brpc_core::{config::ExporterConfig, utils::redacted_host};
use std::path::PathBuf;

use super::{
    load_config,
    utils::{print_error, print_info, print_success, CliResult},
};

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Validate a configuration
    Validate {
        /// Path to config file (defaults to BRPC_CONFIG or /config/config.yml)
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Path to the validation document listing allowed providers
        #[arg(long)]
        validation: Option<PathBuf>,
    },

    /// Print the resolved configuration as JSON
    Show {
        /// Path to config file (defaults to BRPC_CONFIG or /config/config.yml)
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Print full endpoint URLs, including credentials and API keys
        #[arg(long)]
        show_sensitive: bool,
    },
}

#[allow(clippy::needless_pass_by_value)]
pub fn handle_config_command(command: ConfigCommands) -> CliResult<()> {
    match command {
        ConfigCommands::Validate { file, validation } => {
            validate_config(&load_config(file.as_deref(), validation.as_deref())?)
        }
        ConfigCommands::Show { file, show_sensitive } => {
            show_config(load_config(file.as_deref(), None)?, show_sensitive)
        }
    }
}

fn validate_config(config: &ExporterConfig) -> CliResult<()> {
    print_info("Validating configuration...");
    if let Err(e) = config.validate() {
        print_error(&e.to_string());
        return Err(e.into());
    }

    print_success("Configuration is valid!");

    println!("Configuration Summary:");
    println!("  Blockchain: {} ({})", config.blockchain, config.network_name);
    println!("  Network type: {}", config.network_type.as_str());
    println!("  Collector: {}", config.collector);
    println!("  Endpoints: {}", config.endpoints.len());
    println!("  Server: {}:{}", config.server.bind_address, config.server.bind_port);
    println!("  Alive gating: {}", if config.scrape.gate_on_alive { "enabled" } else { "disabled" });

    Ok(())
}

fn show_config(mut config: ExporterConfig, show_sensitive: bool) -> CliResult<()> {
    if !show_sensitive {
        redact_endpoints(&mut config);
    }
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}

fn redact_endpoints(config: &mut ExporterConfig) {
    for endpoint in &mut config.endpoints {
        endpoint.url = redacted_host(&endpoint.url);
    }
}
