//! Fixed request payloads and response fields per chain family.

use crate::{registry::ChainFamily, transport::RpcQuery};
use serde_json::{json, Value};

/// Data driving a [`SubscriptionCollector`](super::SubscriptionCollector).
#[derive(Debug, Clone, PartialEq)]
pub struct SubscriptionProfile {
    /// Sent once after every (re)connect.
    pub subscribe: Value,
    /// Field of the notification payload holding the hex block height.
    pub height_field: &'static str,
    /// Short-lived query for the node version.
    pub client_version: RpcQuery,
}

/// A query plus the field of its result that carries the metric.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldProbe {
    pub query: RpcQuery,
    /// `None` when the whole result is the value.
    pub field: Option<&'static str>,
}

impl FieldProbe {
    #[must_use]
    pub fn whole(query: RpcQuery) -> Self {
        Self { query, field: None }
    }

    #[must_use]
    pub fn field(query: RpcQuery, field: &'static str) -> Self {
        Self { query, field: Some(field) }
    }

    /// Picks the metric out of a validated result.
    #[must_use]
    pub fn select(&self, result: &Value) -> Option<Value> {
        match self.field {
            None => Some(result.clone()),
            Some(field) => result.get(field).filter(|v| !v.is_null()).cloned(),
        }
    }
}

/// Data driving a [`QueryCollector`](super::QueryCollector).
#[derive(Debug, Clone, PartialEq)]
pub struct QueryProfile {
    /// The endpoint is alive when this query returns anything.
    pub liveness: RpcQuery,
    pub block_height: Option<FieldProbe>,
    pub client_version: Option<FieldProbe>,
    pub total_difficulty: Option<FieldProbe>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CollectorProfile {
    Subscription(SubscriptionProfile),
    Query(QueryProfile),
}

fn json_rpc(method: &str, id: &Value) -> RpcQuery {
    RpcQuery::JsonRpc(json!({"jsonrpc": "2.0", "method": method, "params": [], "id": id}))
}

fn json_rpc_with(method: &str, params: Value) -> RpcQuery {
    RpcQuery::JsonRpc(json!({"jsonrpc": "2.0", "method": method, "params": params, "id": 1}))
}

fn bitcoin_rpc(method: &str) -> RpcQuery {
    RpcQuery::JsonRpc(json!({"jsonrpc": "1.0", "id": "exporter", "method": method, "params": []}))
}

/// Returns the probing profile of `family`.
///
/// EVM-style families use the chain id as JSON-RPC request id, matching what the
/// nodes echo back in subscription confirmations.
#[must_use]
pub fn profile_for(family: ChainFamily, chain_id: Option<u64>) -> CollectorProfile {
    let id = chain_id.map_or_else(|| json!(1), |id| json!(id));

    match family {
        ChainFamily::Evm => CollectorProfile::Subscription(SubscriptionProfile {
            subscribe: json!({
                "method": "eth_subscribe",
                "jsonrpc": "2.0",
                "id": id,
                "params": ["newHeads"]
            }),
            height_field: "number",
            client_version: json_rpc("web3_clientVersion", &id),
        }),
        ChainFamily::Conflux => CollectorProfile::Subscription(SubscriptionProfile {
            subscribe: json!({
                "method": "cfx_subscribe",
                "jsonrpc": "2.0",
                "id": id,
                "params": ["newHeads"]
            }),
            height_field: "height",
            client_version: json_rpc("cfx_clientVersion", &id),
        }),
        ChainFamily::Cardano => {
            let block_height = RpcQuery::SkipChecks {
                payload: json!({
                    "type": "jsonwsp/request",
                    "version": "1.0",
                    "servicename": "ogmios",
                    "methodname": "Query",
                    "args": {"query": "blockHeight"}
                }),
                key: "result",
            };
            CollectorProfile::Query(QueryProfile {
                liveness: block_height.clone(),
                block_height: Some(FieldProbe::whole(block_height)),
                client_version: None,
                total_difficulty: None,
            })
        }
        ChainFamily::EvmHttp => {
            let block_number = json_rpc("eth_blockNumber", &id);
            CollectorProfile::Query(QueryProfile {
                liveness: block_number.clone(),
                block_height: Some(FieldProbe::whole(block_number)),
                client_version: Some(FieldProbe::whole(json_rpc("web3_clientVersion", &id))),
                total_difficulty: Some(FieldProbe::field(
                    json_rpc_with("eth_getBlockByNumber", json!(["latest", false])),
                    "totalDifficulty",
                )),
            })
        }
        ChainFamily::Tron => {
            let block_number = json_rpc("eth_blockNumber", &id);
            CollectorProfile::Query(QueryProfile {
                liveness: block_number.clone(),
                block_height: Some(FieldProbe::whole(block_number)),
                client_version: Some(FieldProbe::whole(json_rpc("web3_clientVersion", &id))),
                total_difficulty: None,
            })
        }
        ChainFamily::Bitcoin | ChainFamily::Dogecoin => {
            let network_info = bitcoin_rpc("getnetworkinfo");
            let blockchain_info = bitcoin_rpc("getblockchaininfo");
            CollectorProfile::Query(QueryProfile {
                liveness: network_info.clone(),
                block_height: Some(FieldProbe::field(blockchain_info.clone(), "blocks")),
                client_version: Some(FieldProbe::field(network_info, "version")),
                total_difficulty: Some(FieldProbe::field(blockchain_info, "difficulty")),
            })
        }
        ChainFamily::Filecoin => {
            let version = json_rpc_with("Filecoin.Version", json!([]));
            CollectorProfile::Query(QueryProfile {
                liveness: version.clone(),
                block_height: Some(FieldProbe::field(
                    json_rpc_with("Filecoin.ChainHead", json!([])),
                    "Height",
                )),
                client_version: Some(FieldProbe::field(version, "Version")),
                total_difficulty: None,
            })
        }
        ChainFamily::Solana => {
            let version = json_rpc_with("getVersion", json!([]));
            CollectorProfile::Query(QueryProfile {
                liveness: version.clone(),
                block_height: Some(FieldProbe::whole(json_rpc_with("getBlockHeight", json!([])))),
                client_version: Some(FieldProbe::field(version, "solana-core")),
                total_difficulty: None,
            })
        }
        ChainFamily::Starknet => {
            let block_number = json_rpc_with("starknet_blockNumber", json!([]));
            CollectorProfile::Query(QueryProfile {
                liveness: block_number.clone(),
                block_height: Some(FieldProbe::whole(block_number)),
                client_version: None,
                total_difficulty: None,
            })
        }
        ChainFamily::Aptos => {
            // ledger info lives at the API root, which is the configured URL
            let ledger_info = RpcQuery::RestGet { path: "", params: Vec::new() };
            CollectorProfile::Query(QueryProfile {
                liveness: ledger_info.clone(),
                block_height: Some(FieldProbe::field(ledger_info.clone(), "block_height")),
                client_version: Some(FieldProbe::field(ledger_info, "git_hash")),
                total_difficulty: None,
            })
        }
    }
}
