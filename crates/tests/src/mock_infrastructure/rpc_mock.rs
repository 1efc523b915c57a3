//! RPC Mock Builder for JSON-RPC and REST probe testing
//!
//! Wraps mockito to provide response builders for the methods the exporter probes.

use mockito::{Matcher, Mock, Server, ServerGuard};
use serde_json::{json, Value};

/// Builder for creating mock node responses.
///
/// Uses mockito internally but provides probe-specific helpers.
pub struct RpcMockBuilder {
    server: ServerGuard,
    mocks: Vec<Mock>,
}

fn method_matcher(method: &str) -> Matcher {
    Matcher::Regex(format!(r#""method"\s*:\s*"{method}""#))
}

fn envelope(result: &Value) -> String {
    json!({
        "jsonrpc": "2.0",
        "id": 1,
        "result": result
    })
    .to_string()
}

impl RpcMockBuilder {
    /// Creates a new RPC mock builder with a fresh mockito server.
    pub async fn new() -> Self {
        Self { server: Server::new_async().await, mocks: Vec::new() }
    }

    /// Returns the URL of the mock server.
    #[must_use]
    pub fn url(&self) -> String {
        self.server.url()
    }

    /// Mocks an `eth_blockNumber` request.
    pub fn mock_block_number(&mut self, block_number: u64) -> &mut Self {
        self.mock_method("eth_blockNumber", &json!(format!("0x{block_number:x}")))
    }

    /// Mocks a `web3_clientVersion` request.
    pub fn mock_client_version(&mut self, version: &str) -> &mut Self {
        self.mock_method("web3_clientVersion", &json!(version))
    }

    /// Mocks a generic JSON-RPC method with custom result.
    pub fn mock_method(&mut self, method: &str, result: &Value) -> &mut Self {
        let mock = self
            .server
            .mock("POST", "/")
            .match_body(method_matcher(method))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(envelope(result))
            .create();

        self.mocks.push(mock);
        self
    }

    /// Mocks a JSON-RPC method that must be hit exactly `hits` times.
    ///
    /// Check with [`RpcMockBuilder::assert_all`].
    pub fn mock_method_expect(&mut self, method: &str, result: &Value, hits: usize) -> &mut Self {
        let mock = self
            .server
            .mock("POST", "/")
            .match_body(method_matcher(method))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(envelope(result))
            .expect(hits)
            .create();

        self.mocks.push(mock);
        self
    }

    /// Mocks a REST GET returning `body` as plain JSON.
    pub fn mock_rest_get(&mut self, path: &str, body: &Value) -> &mut Self {
        let mock = self
            .server
            .mock("GET", path)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(body.to_string())
            .create();

        self.mocks.push(mock);
        self
    }

    /// Mocks an RPC error response.
    pub fn mock_rpc_error(&mut self, method: &str, code: i32, message: &str) -> &mut Self {
        let mock = self
            .server
            .mock("POST", "/")
            .match_body(method_matcher(method))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "jsonrpc": "2.0",
                    "id": 1,
                    "error": {
                        "code": code,
                        "message": message
                    }
                })
                .to_string(),
            )
            .create();

        self.mocks.push(mock);
        self
    }

    /// Mocks a timeout by returning a gateway timeout error.
    ///
    /// Note: mockito doesn't support actual delays, so we simulate timeout
    /// with a 504 Gateway Timeout response.
    pub fn mock_timeout(&mut self, method: &str) -> &mut Self {
        let mock = self
            .server
            .mock("POST", "/")
            .match_body(method_matcher(method))
            .with_status(504)
            .with_body("Gateway Timeout")
            .create();

        self.mocks.push(mock);
        self
    }

    /// Mocks a server error (500) for every POST.
    pub fn mock_server_error(&mut self) -> &mut Self {
        let mock = self
            .server
            .mock("POST", "/")
            .with_status(500)
            .with_body("Internal Server Error")
            .create();

        self.mocks.push(mock);
        self
    }

    /// Returns a reference to the underlying mockito server for advanced mocking.
    pub fn get_server(&mut self) -> &mut mockito::ServerGuard {
        &mut self.server
    }

    /// Verifies all mocks were called.
    #[must_use]
    pub fn verify_all_called(&self) -> bool {
        self.mocks.iter().all(mockito::Mock::matched)
    }

    /// Asserts every mock's expected hit count.
    pub async fn assert_all(&self) {
        for mock in &self.mocks {
            mock.assert_async().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_rpc_mock_builder_creation() {
        let mock = RpcMockBuilder::new().await;
        assert!(mock.url().starts_with("http://"));
    }

    #[test]
    fn test_envelope() {
        let body: Value = serde_json::from_str(&envelope(&json!("0x64"))).unwrap();
        assert_eq!(body["result"], "0x64");
        assert_eq!(body["jsonrpc"], "2.0");
    }

    #[test]
    fn test_method_matcher_tolerates_whitespace() {
        let Matcher::Regex(pattern) = method_matcher("eth_blockNumber") else {
            panic!("expected a regex matcher");
        };
        assert!(pattern.contains("eth_blockNumber"));
    }
}
