pub mod config;
pub mod probe;
pub mod utils;

pub use config::{handle_config_command, ConfigCommands};
pub use probe::{run_probe, ProbeOptions};

use brpc_core::config::ExporterConfig;
use std::path::Path;
use utils::CliResult;

/// Loads the config at `file`, or from the environment-selected paths when `None`.
pub fn load_config(file: Option<&Path>, validation: Option<&Path>) -> CliResult<ExporterConfig> {
    let config = match file {
        Some(path) => {
            let config = ExporterConfig::from_file(path)?;
            match validation {
                Some(validation) => config.with_validation_file(validation)?,
                None => config,
            }
        }
        None => ExporterConfig::load()?,
    };
    Ok(config)
}
