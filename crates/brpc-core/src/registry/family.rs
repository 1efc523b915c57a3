use std::fmt;
use thiserror::Error;

/// Raised when a configuration names a collector this exporter cannot build.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("collector {collector} on blockchain {blockchain} is not supported")]
    UnsupportedCollector { collector: String, blockchain: String },

    #[error("endpoint {host}: {reason}")]
    InvalidEndpoint { host: String, reason: String },
}

/// How a family talks to its endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    /// Long-lived `ws(s)://` subscription plus short WebSocket queries.
    Subscription,
    /// Short WebSocket queries only.
    WebSocketQuery,
    /// HTTPS JSON-RPC or REST.
    Https,
}

/// Blockchain families with distinct probing dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChainFamily {
    Evm,
    EvmHttp,
    Conflux,
    Cardano,
    Bitcoin,
    Dogecoin,
    Filecoin,
    Solana,
    Starknet,
    Aptos,
    Tron,
}

impl ChainFamily {
    pub const ALL: [ChainFamily; 11] = [
        Self::Evm,
        Self::EvmHttp,
        Self::Conflux,
        Self::Cardano,
        Self::Bitcoin,
        Self::Dogecoin,
        Self::Filecoin,
        Self::Solana,
        Self::Starknet,
        Self::Aptos,
        Self::Tron,
    ];

    /// Resolves the configured `collector` name in the context of `blockchain`.
    ///
    /// Conflux speaks its own subscription dialect even when configured as `evm`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::UnsupportedCollector`] for unknown names.
    pub fn resolve(collector: &str, blockchain: &str) -> Result<Self, RegistryError> {
        let family = match (collector, blockchain.to_ascii_lowercase().as_str()) {
            ("evm" | "conflux", "conflux") | ("conflux", _) => Self::Conflux,
            ("evm", _) => Self::Evm,
            ("evmhttp", _) => Self::EvmHttp,
            ("cardano", _) => Self::Cardano,
            ("bitcoin", _) => Self::Bitcoin,
            ("doge", _) => Self::Dogecoin,
            ("filecoin", _) => Self::Filecoin,
            ("solana", _) => Self::Solana,
            ("starknet" | "starkware", _) => Self::Starknet,
            ("aptos", _) => Self::Aptos,
            ("tron", _) => Self::Tron,
            _ => {
                return Err(RegistryError::UnsupportedCollector {
                    collector: collector.to_string(),
                    blockchain: blockchain.to_string(),
                })
            }
        };
        Ok(family)
    }

    #[must_use]
    pub fn transport(self) -> TransportKind {
        match self {
            Self::Evm | Self::Conflux => TransportKind::Subscription,
            Self::Cardano => TransportKind::WebSocketQuery,
            _ => TransportKind::Https,
        }
    }

    /// Families whose payloads or labels need an EVM chain id.
    #[must_use]
    pub fn requires_chain_id(self) -> bool {
        matches!(self, Self::Evm | Self::EvmHttp | Self::Conflux | Self::Tron)
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Evm => "evm",
            Self::EvmHttp => "evmhttp",
            Self::Conflux => "conflux",
            Self::Cardano => "cardano",
            Self::Bitcoin => "bitcoin",
            Self::Dogecoin => "doge",
            Self::Filecoin => "filecoin",
            Self::Solana => "solana",
            Self::Starknet => "starknet",
            Self::Aptos => "aptos",
            Self::Tron => "tron",
        }
    }
}

impl fmt::Display for ChainFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
