//! Mock Infrastructure for Testing the Exporter
//!
//! This module provides reusable mock nodes for testing probes without requiring
//! real network connections.
//!
//! ## Components
//!
//! - `RpcMockBuilder`: Wraps mockito to mock JSON-RPC and REST probe responses
//! - `MockWebSocketServer`: Provides a mock WebSocket node for subscription testing
//! - Test helpers for configs and timings
//!
//! ## Usage
//!
//! ```ignore
//! use tests::mock_infrastructure::{exporter_config, RpcMockBuilder};
//!
//! let mut mock = RpcMockBuilder::new().await;
//! mock.mock_method("getBlockHeight", &json!(100));
//!
//! let config = exporter_config("solana", "solana", None, &[(&mock.url(), "alpha")]);
//! ```

pub mod rpc_mock;
pub mod test_helpers;
pub mod websocket_mock;

pub use rpc_mock::RpcMockBuilder;
pub use test_helpers::*;
pub use websocket_mock::MockWebSocketServer;
