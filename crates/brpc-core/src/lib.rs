//! # brpc-core
//!
//! Core library of the blockchain RPC exporter: probes a pool of node endpoints and
//! turns what it learns into Prometheus metric families.
//!
//! - **[`subscription`]**: one long-lived WebSocket head subscription per subscribing
//!   endpoint, with reconnect backoff, disconnect accounting, ping latency, and a
//!   stale-connection watchdog.
//!
//! - **[`transport`]**: HTTPS and short-lived WebSocket request/response probes with
//!   per-cycle memoization ([`cache`]).
//!
//! - **[`collectors`]**: the uniform, partially implemented metric surface over one
//!   endpoint, plus the per-family request payloads.
//!
//! - **[`scrape`]**: the per-scrape fan-out, aggregation, and pool-relative deltas.
//!
//! - **[`metrics`]**: the collected [`metrics::MetricSet`] and its Prometheus rendering.
//!
//! - **[`config`]** and **[`registry`]**: configuration loading, validation, and
//!   collector construction.
//!
//! ## Architecture
//!
//! ```text
//!            background (process lifetime)                scrape (per request)
//! ┌─────────────────────────────────────┐   ┌──────────────────────────────────────┐
//! │ SubscriptionManager ──► State ◄─────┼───┤ ScrapeOrchestrator                   │
//! │  (one task per ws endpoint)         │   │   │ reset_cycle, fan out, aggregate  │
//! └─────────────────────────────────────┘   │   ▼                                  │
//!                                           │ EndpointCollector (one per endpoint) │
//!                                           │   │ cached_query                     │
//!                                           │   ▼                                  │
//!                                           │ QueryTransport ──► QueryMemo         │
//!                                           └──────────────────────────────────────┘
//! ```

pub mod cache;
pub mod collectors;
pub mod config;
pub mod metrics;
pub mod registry;
pub mod scrape;
pub mod subscription;
pub mod transport;
pub mod utils;
