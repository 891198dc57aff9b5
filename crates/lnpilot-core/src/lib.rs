//! Core types and storage for lnpilot.
//!
//! Provides the undirected channel graph ([`graph::NetworkGraph`]), the versioned
//! JSON snapshot format, snapshot persistence/restore, and the TOML configuration.

pub mod config;
pub mod graph;
pub mod schema;
pub mod storage;
