//! Network acquisition and channel allocation for lnpilot.
//!
//! # Architecture
//!
//! - **seeds**: `SeedSource` trait and the DNS/bech32 seed resolver
//! - **bootstrap**: best-effort peering with seeds when the node has no peers
//! - **crawl**: builds a `NetworkGraph` from `listnodes`/`listchannels`
//! - **allocation**: `Allocator` trait and the executor that opens channels
//! - **heuristics**: baseline degree/capacity allocator
//!
//! [`acquire_graph`] ties restore, crawl and persist together.

pub mod allocation;
pub mod bootstrap;
pub mod crawl;
pub mod heuristics;
pub mod seeds;

pub use allocation::{
    AllocationExecutor, AllocationPlan, AllocationReport, Allocator, Distribution, Strategy,
    satoshis_for,
};
pub use bootstrap::{BootstrapReport, PeeringBootstrapper};
pub use crawl::{CrawlError, CrawlOptions, CrawlOutcome, GraphCrawler};
pub use heuristics::DegreeAllocator;
pub use seeds::{DnsSeedResolver, SeedError, SeedRecord, SeedSource};

use lnpilot_core::config::SnapshotConfig;
use lnpilot_core::graph::NetworkGraph;
use lnpilot_core::storage;
use lnpilot_rpc::NodeRpc;
use std::path::PathBuf;

/// Where the graph comes from and where it goes.
#[derive(Debug, Clone)]
pub struct AcquireOptions {
    /// Snapshot to restore from before crawling.
    pub input: Option<PathBuf>,
    /// Snapshot written after a successful crawl.
    pub output: PathBuf,
    pub dont_store: bool,
    pub snapshot: SnapshotConfig,
}

impl Default for AcquireOptions {
    fn default() -> Self {
        let snapshot = SnapshotConfig::default();
        Self {
            input: None,
            output: snapshot.path.clone(),
            dont_store: false,
            snapshot,
        }
    }
}

/// Errors that stop the autopilot before any channel is opened.
#[derive(Debug, thiserror::Error)]
pub enum PilotError {
    #[error(transparent)]
    Crawl(#[from] CrawlError),
    #[error("crawl produced no usable graph: the channel list is unavailable")]
    NoUsableGraph,
    #[error("snapshot error: {0}")]
    Snapshot(String),
}

/// Restore the graph from `options.input`, or crawl and persist a fresh one.
pub fn acquire_graph<S: SeedSource>(
    rpc: &mut dyn NodeRpc,
    crawler: &GraphCrawler<S>,
    options: &AcquireOptions,
) -> Result<NetworkGraph, PilotError> {
    if let Some(input) = &options.input {
        tracing::info!(path = %input.display(), "trying to load graph from snapshot");
        match storage::restore(input).map_err(|e| PilotError::Snapshot(format!("{:#}", e)))? {
            Some(graph) => return Ok(graph),
            None => tracing::info!("snapshot not found, downloading graph from the node"),
        }
    } else {
        tracing::info!("no snapshot given, downloading graph from the node");
    }

    let graph = crawler
        .crawl(rpc)?
        .into_graph()
        .ok_or(PilotError::NoUsableGraph)?;

    storage::persist_unless(
        &options.output,
        &graph,
        &options.snapshot,
        options.dont_store,
    )
    .map_err(|e| PilotError::Snapshot(format!("{:#}", e)))?;

    Ok(graph)
}
