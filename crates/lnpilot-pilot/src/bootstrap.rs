//! Best-effort peering with seed nodes for a node that has no peers yet.

use crate::seeds::SeedSource;
use lnpilot_rpc::NodeRpc;
use rand::seq::SliceRandom;
use std::time::Duration;

/// Outcome of one bootstrap round. Purely informational.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BootstrapReport {
    pub seeds: usize,
    pub attempted: usize,
    pub connected: usize,
}

/// Connects the local node to seeds from a [`SeedSource`].
pub struct PeeringBootstrapper<S> {
    seeds: S,
    connect_delay: Duration,
}

impl<S: SeedSource> PeeringBootstrapper<S> {
    pub fn new(seeds: S, connect_delay: Duration) -> Self {
        Self {
            seeds,
            connect_delay,
        }
    }

    /// Try every seed once, in random order, pausing `connect_delay` between attempts.
    ///
    /// Never fails: peering only improves the odds of a useful crawl, so seed
    /// resolution and connection errors are logged and otherwise ignored.
    pub fn bootstrap(&self, rpc: &mut dyn NodeRpc) -> BootstrapReport {
        let mut node_ids = match self.seeds.seed_node_ids() {
            Ok(ids) => ids,
            Err(e) => {
                tracing::warn!(error = %e, "seed resolution failed, skipping bootstrap");
                return BootstrapReport::default();
            }
        };
        node_ids.shuffle(&mut rand::rng());

        let mut report = BootstrapReport {
            seeds: node_ids.len(),
            ..BootstrapReport::default()
        };
        for (i, node_id) in node_ids.iter().enumerate() {
            if i > 0 && !self.connect_delay.is_zero() {
                std::thread::sleep(self.connect_delay);
            }
            tracing::info!(node_id = %node_id, "peering with seed node");
            report.attempted += 1;
            match rpc.connect(node_id) {
                Ok(_) => report.connected += 1,
                Err(e) => tracing::debug!(node_id = %node_id, error = %e, "seed connection failed"),
            }
        }

        tracing::info!(
            seeds = report.seeds,
            connected = report.connected,
            "bootstrap finished"
        );
        report
    }
}
