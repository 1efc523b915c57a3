use std::fmt;

#[derive(Debug)]
pub enum CliError {
    Config(String),
    Registry(String),
    General(String),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "Configuration error: {msg}"),
            Self::Registry(msg) => write!(f, "Registry error: {msg}"),
            Self::General(msg) => write!(f, "Error: {msg}"),
        }
    }
}

impl std::error::Error for CliError {}

impl From<serde_json::Error> for CliError {
    fn from(error: serde_json::Error) -> Self {
        Self::General(error.to_string())
    }
}

impl From<brpc_core::config::ConfigError> for CliError {
    fn from(error: brpc_core::config::ConfigError) -> Self {
        Self::Config(error.to_string())
    }
}

impl From<brpc_core::registry::RegistryError> for CliError {
    fn from(error: brpc_core::registry::RegistryError) -> Self {
        Self::Registry(error.to_string())
    }
}

pub type CliResult<T> = Result<T, CliError>;

pub fn print_success(message: &str) {
    println!("[SUCCESS] {message}");
}

pub fn print_error(message: &str) {
    eprintln!("[ERROR] {message}");
}

pub fn print_info(message: &str) {
    println!("[INFO] {message}");
}
