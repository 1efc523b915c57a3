//! HTTP front end of the blockchain RPC exporter.

pub mod router;

pub use router::create_app;
