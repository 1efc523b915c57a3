//! Scrape-cycle scoped memoization.
//!
//! [`QueryCache`] is the plain key/value store; the transport layer wraps it with
//! locking and single-flight fetching (see [`crate::transport::QueryMemo`]).

pub mod query_cache;

pub use query_cache::QueryCache;
