//! Topology crawl: rebuild the local network graph from the node's gossip view.
//!
//! The graph is built from scratch on every crawl. It will be incomplete if the
//! node is still syncing gossip, and it lives entirely in memory.

use crate::bootstrap::PeeringBootstrapper;
use crate::seeds::SeedSource;
use lnpilot_core::graph::NetworkGraph;
use lnpilot_rpc::{NodeRpc, Record, RpcError};
use serde_json::Value;
use std::time::Duration;

/// Fatal crawl failures. The caller cannot get a graph out of these.
#[derive(Debug, thiserror::Error)]
pub enum CrawlError {
    #[error("peer list could not be retrieved: {0}")]
    PeerListUnavailable(#[source] RpcError),
    #[error("node list could not be retrieved: {0}")]
    NodeListUnavailable(#[source] RpcError),
    #[error("channel list could not be retrieved: {0}")]
    ChannelListUnavailable(#[source] RpcError),
    #[error("node list still empty after {0} polls")]
    NoNodes(u32),
}

/// Result of a crawl that did not fail fatally.
#[derive(Debug)]
pub enum CrawlOutcome {
    Complete(NetworkGraph),
    /// Nodes were found but the node rejected the channel query; no usable graph.
    ChannelsUnavailable,
}

impl CrawlOutcome {
    pub fn into_graph(self) -> Option<NetworkGraph> {
        match self {
            Self::Complete(graph) => Some(graph),
            Self::ChannelsUnavailable => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CrawlOptions {
    /// Pause between empty node-list polls.
    pub poll_interval: Duration,
    /// Stop after this many empty polls; `None` polls until nodes appear.
    pub max_node_polls: Option<u32>,
}

impl Default for CrawlOptions {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(2),
            max_node_polls: None,
        }
    }
}

pub struct GraphCrawler<S> {
    bootstrapper: PeeringBootstrapper<S>,
    options: CrawlOptions,
}

impl<S: SeedSource> GraphCrawler<S> {
    pub fn new(bootstrapper: PeeringBootstrapper<S>, options: CrawlOptions) -> Self {
        Self {
            bootstrapper,
            options,
        }
    }

    /// Build a fresh graph from `listnodes` and `listchannels`.
    pub fn crawl(&self, rpc: &mut dyn NodeRpc) -> Result<CrawlOutcome, CrawlError> {
        let nodes = self.fetch_nodes(rpc)?;

        let mut graph = NetworkGraph::new();
        let mut skipped = 0usize;
        for node in nodes {
            match string_field(&node, "nodeid") {
                Some(id) => graph.add_node(id, node),
                None => skipped += 1,
            }
        }
        if skipped > 0 {
            tracing::warn!(skipped, "ignored node records without a nodeid");
        }
        tracing::info!(
            nodes = graph.node_count(),
            "added nodes to the local network graph"
        );

        tracing::info!("requesting channel list");
        let channels = match rpc.list_channels() {
            Ok(channels) => channels,
            Err(e) if e.is_data_error() => {
                tracing::error!("channel list could not be retrieved from the node");
                tracing::debug!(error = %e, "listchannels failed");
                return Ok(CrawlOutcome::ChannelsUnavailable);
            }
            Err(e) => return Err(CrawlError::ChannelListUnavailable(e)),
        };
        tracing::info!(channels = channels.len(), "retrieved channels");

        let mut skipped = 0usize;
        for channel in channels {
            let endpoints = string_field(&channel, "source")
                .zip(string_field(&channel, "destination"));
            match endpoints {
                Some((source, destination)) => graph.add_edge(source, destination, channel),
                None => skipped += 1,
            }
        }
        if skipped > 0 {
            tracing::warn!(
                skipped,
                "ignored channel records without source/destination"
            );
        }
        tracing::info!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            "network graph complete"
        );

        Ok(CrawlOutcome::Complete(graph))
    }

    /// Poll until the node reports at least one node, bootstrapping whenever it has no peers.
    fn fetch_nodes(&self, rpc: &mut dyn NodeRpc) -> Result<Vec<Record>, CrawlError> {
        let mut polls = 0u32;
        loop {
            let peers = rpc.list_peers().map_err(|e| {
                tracing::error!(error = %e, "peer list could not be retrieved from the node");
                CrawlError::PeerListUnavailable(e)
            })?;
            if peers.is_empty() {
                tracing::info!("node has no peers, connecting to seed nodes");
                self.bootstrapper.bootstrap(rpc);
            }

            tracing::info!("requesting node list");
            let nodes = rpc.list_nodes().map_err(|e| {
                tracing::error!("node list could not be retrieved from the node");
                tracing::debug!(error = %e, "listnodes failed");
                CrawlError::NodeListUnavailable(e)
            })?;
            polls += 1;
            if !nodes.is_empty() {
                return Ok(nodes);
            }

            if let Some(max) = self.options.max_node_polls
                && polls >= max
            {
                return Err(CrawlError::NoNodes(polls));
            }
            tracing::debug!(polls, "node list empty, polling again");
            if !self.options.poll_interval.is_zero() {
                std::thread::sleep(self.options.poll_interval);
            }
        }
    }
}

fn string_field(record: &Record, field: &str) -> Option<String> {
    record
        .get(field)
        .and_then(Value::as_str)
        .map(str::to_string)
}
