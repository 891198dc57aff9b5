//! RPC session to a running Lightning node.
//!
//! # Architecture
//!
//! - **session**: `NodeRpc` trait, the single seam every other crate talks through,
//!   with typed helpers for the five calls the autopilot issues
//! - **unix**: `UnixSocketRpc`, a blocking JSON-RPC 2.0 client for the node's Unix socket

pub mod session;
#[cfg(unix)]
pub mod unix;

pub use session::{NodeRpc, Record, RpcError};
#[cfg(unix)]
pub use unix::UnixSocketRpc;
