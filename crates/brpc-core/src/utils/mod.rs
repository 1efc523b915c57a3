//! Small helpers shared by transports and collectors.
//!
//! - [`canonical_json`]: key-sorted JSON used for request fingerprints
//! - [`quantity`]: decoding of hex, decimal, and JSON-number counters
//! - [`redact`]: hostname-only rendering of endpoint URLs for logs

pub mod canonical_json;
pub mod quantity;
pub mod redact;

pub use canonical_json::canonical_json;
pub use quantity::{quantity_f64, quantity_u64, version_string, QuantityError};
pub use redact::redacted_host;
