//! Tests for layered configuration loading
//!
//! These tests touch process-wide environment variables and run serially.

use brpc_core::config::{ConfigError, ExporterConfig};
use serial_test::serial;
use std::{fs, path::PathBuf};

const CONFIG: &str = r"
blockchain: ethereum
chain_id: 1
network_name: mainnet
network_type: Mainnet
collector: evm
endpoints:
  - url: wss://eth-mainnet.example.com/ws/KEY
    provider: alpha
  - url: wss://eth.other.example.org
    provider: beta
";

fn write_temp(name: &str, contents: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("brpc-config-tests-{}", std::process::id()));
    fs::create_dir_all(&dir).unwrap();
    let path = dir.join(name);
    fs::write(&path, contents).unwrap();
    path
}

fn clear_env() {
    for var in [
        "BRPC_CONFIG",
        "CONFIG_FILE_PATH",
        "BRPC_VALIDATION_FILE",
        "VALIDATION_FILE_PATH",
        "BRPC__SERVER__BIND_PORT",
        "BRPC__SCRAPE__GATE_ON_ALIVE",
    ] {
        std::env::remove_var(var);
    }
}

#[test]
#[serial]
fn test_load_reads_config_and_validation_files() {
    clear_env();
    let config_path = write_temp("load.yml", CONFIG);
    let validation_path = write_temp("validation.yml", "allowed_providers:\n  - alpha\n");
    std::env::set_var("BRPC_CONFIG", &config_path);
    std::env::set_var("BRPC_VALIDATION_FILE", &validation_path);

    let config = ExporterConfig::load().unwrap();
    clear_env();

    assert_eq!(config.allowed_providers, Some(vec!["alpha".to_string()]));
    let Err(ConfigError::Invalid(problems)) = config.validate() else {
        panic!("beta is not an allowed provider");
    };
    assert_eq!(problems.len(), 1);
    assert!(problems[0].contains("beta"));
}

#[test]
#[serial]
fn test_legacy_path_variables() {
    clear_env();
    let config_path = write_temp("legacy.yml", CONFIG);
    std::env::set_var("CONFIG_FILE_PATH", &config_path);
    std::env::set_var("VALIDATION_FILE_PATH", "/nonexistent/validation.yml");

    let config = ExporterConfig::load().unwrap();
    clear_env();

    assert_eq!(config.allowed_providers, None);
    assert_eq!(config.endpoints.len(), 2);
    assert!(config.validate().is_ok());
}

#[test]
#[serial]
fn test_env_overrides_file_values() {
    clear_env();
    let config_path = write_temp("override.yml", CONFIG);
    std::env::set_var("BRPC__SERVER__BIND_PORT", "9100");
    std::env::set_var("BRPC__SCRAPE__GATE_ON_ALIVE", "true");

    let config = ExporterConfig::from_file(&config_path).unwrap();
    clear_env();

    assert_eq!(config.server.bind_port, 9100);
    assert!(config.scrape.gate_on_alive);
    assert_eq!(config.server.bind_address, "0.0.0.0");
}

#[test]
#[serial]
fn test_missing_config_file_is_an_error() {
    clear_env();
    std::env::set_var("BRPC_CONFIG", "/nonexistent/config.yml");

    let result = ExporterConfig::load();
    clear_env();

    assert!(matches!(result, Err(ConfigError::Load(_))));
}

#[test]
#[serial]
fn test_malformed_validation_file_is_an_error() {
    clear_env();
    let config_path = write_temp("malformed.yml", CONFIG);
    let validation_path = write_temp("bad-validation.yml", "allowed_providers: 7\n");
    std::env::set_var("BRPC_CONFIG", &config_path);
    std::env::set_var("BRPC_VALIDATION_FILE", &validation_path);

    let result = ExporterConfig::load();
    clear_env();

    assert!(matches!(result, Err(ConfigError::ValidationFile { .. })));
}
