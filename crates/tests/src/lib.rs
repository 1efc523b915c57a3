//! Integration Tests for the Blockchain RPC Exporter
//!
//! This crate contains various test modules:
//!
//! - `e2e_scrape_tests`: Full scrapes over mock nodes, from config to rendered exposition
//! - `subscription_tests`: Head counting, reconnects, and the stale watchdog
//! - `cache_tests`: Per-cycle memoization of shared probe requests
//! - `server_tests`: The `/metrics`, `/liveness`, and `/readiness` routes
//! - `config_tests`: File and environment layering (serialized on process env)
//! - `mock_infrastructure`: Reusable mock nodes for testing (WebSocket, JSON-RPC, REST)
//!
//! ## Running Tests
//!
//! No external node is needed; every test binds its own mock on `127.0.0.1`.
//!
//! ```bash
//! cargo test --package tests
//! ```




#[cfg(test)]
mod server_tests;

#[cfg(test)]
mod config_tests;

/// Mock infrastructure for testing
pub mod mock_infrastructure;
