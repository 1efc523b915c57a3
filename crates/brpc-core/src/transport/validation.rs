//! Response validation modes.
//!
//! JSON-RPC 2.0 (and Bitcoin's 1.0 dialect) wrap the payload in an envelope whose
//! `error` member is either absent or `null` on success. REST endpoints return plain
//! JSON, and a few dialects such as ogmios put the payload under a fixed key.

use super::ProbeError;
use serde_json::Value;

/// Parses a body as plain JSON.
///
/// # Errors
///
/// Returns [`ProbeError::InvalidJson`] if the body is not JSON.
pub fn parse_json(body: &str) -> Result<Value, ProbeError> {
    serde_json::from_str(body).map_err(|e| ProbeError::InvalidJson(e.to_string()))
}

/// Validates a JSON-RPC envelope and returns its `result`.
///
/// A `null` result is treated as missing: every probed method returns data when
/// the node is healthy.
///
/// # Errors
///
/// Returns [`ProbeError::RpcError`] for a non-null `error` member and
/// [`ProbeError::MissingResult`] when `result` is absent or `null`.
pub fn json_rpc_result(body: &str) -> Result<Value, ProbeError> {
    let mut envelope = parse_json(body)?;

    if let Some(error) = envelope.get("error").filter(|e| !e.is_null()) {
        let code = error.get("code").and_then(Value::as_i64).unwrap_or_default();
        let message = error
            .get("message")
            .and_then(Value::as_str)
            .map_or_else(|| error.to_string(), str::to_string);
        return Err(ProbeError::RpcError { code, message });
    }

    match envelope.get_mut("result").map(Value::take) {
        Some(Value::Null) | None => Err(ProbeError::MissingResult),
        Some(result) => Ok(result),
    }
}

/// Returns the value under a fixed top-level key, skipping envelope checks.
///
/// # Errors
///
/// Returns [`ProbeError::MissingField`] when the key is absent or `null`.
pub fn top_level_key(body: &str, key: &str) -> Result<Value, ProbeError> {
    let mut document = parse_json(body)?;
    match document.get_mut(key).map(Value::take) {
        Some(Value::Null) | None => Err(ProbeError::MissingField(key.to_string())),
        Some(value) => Ok(value),
    }
}
