//! Turning an allocation plan into channel-open requests.
//!
//! Which nodes to pick and how much to give each is decided by an [`Allocator`];
//! [`AllocationExecutor`] only rounds amounts and talks to the node.

use lnpilot_core::graph::NetworkGraph;
use lnpilot_rpc::{NodeRpc, RpcError};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Probability assigned to each candidate node.
pub type Distribution = BTreeMap<String, f64>;

/// Fraction of the balance to commit to each node, each in [0, 1].
/// Fractions need not sum to exactly 1.
pub type AllocationPlan = BTreeMap<String, f64>;

/// How candidate rankings are combined.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Strategy {
    /// Alternate between rankings so each heuristic contributes picks.
    #[default]
    Diverse,
    /// Combine rankings into one score and take the top entries.
    Merge,
}

impl FromStr for Strategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "diverse" => Ok(Self::Diverse),
            "merge" => Ok(Self::Merge),
            other => Err(format!(
                "unknown strategy `{}` (expected diverse or merge)",
                other
            )),
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Diverse => write!(f, "diverse"),
            Self::Merge => write!(f, "merge"),
        }
    }
}

/// Candidate selection and capacity model.
pub trait Allocator {
    /// Pick up to `count` nodes to open channels to.
    fn find_candidates(
        &self,
        graph: &NetworkGraph,
        count: usize,
        strategy: Strategy,
        percentile: Option<f64>,
    ) -> Vec<String>;

    /// Probability distribution over `candidates`.
    fn score_candidates(&self, graph: &NetworkGraph, candidates: &[String]) -> Distribution;

    /// Turn a distribution into per-node balance fractions.
    fn allocate_capacity(&self, distribution: &Distribution, balance: u64) -> AllocationPlan;
}

/// Satoshis for one channel: `ceil(balance * fraction)`.
///
/// Each node is rounded up independently, so the sum over a plan can exceed
/// `balance` by less than one satoshi per node.
pub fn satoshis_for(balance: u64, fraction: f64) -> u64 {
    (balance as f64 * fraction).ceil() as u64
}

/// A channel-open request the node accepted.
#[derive(Debug)]
pub struct ChannelOpen {
    pub node_id: String,
    pub satoshis: u64,
    pub response: Value,
}

/// A channel-open request the node rejected or that never reached it.
#[derive(Debug)]
pub struct FailedOpen {
    pub node_id: String,
    pub satoshis: u64,
    pub error: RpcError,
}

#[derive(Debug, Default)]
pub struct AllocationReport {
    pub opened: Vec<ChannelOpen>,
    pub failed: Vec<FailedOpen>,
}

impl AllocationReport {
    pub fn attempted(&self) -> usize {
        self.opened.len() + self.failed.len()
    }

    /// Sum of the amounts requested, successful or not.
    pub fn total_requested_sat(&self) -> u64 {
        self.opened.iter().map(|o| o.satoshis).sum::<u64>()
            + self.failed.iter().map(|f| f.satoshis).sum::<u64>()
    }
}

pub struct AllocationExecutor<'a> {
    allocator: &'a dyn Allocator,
}

impl<'a> AllocationExecutor<'a> {
    pub fn new(allocator: &'a dyn Allocator) -> Self {
        Self { allocator }
    }

    /// Open one channel per plan entry.
    ///
    /// A failed open is logged and recorded, and the remaining entries are still
    /// attempted. Nothing is retried or rolled back, and neither funds nor
    /// existing channels are checked beforehand.
    pub fn connect(
        &self,
        rpc: &mut dyn NodeRpc,
        graph: &NetworkGraph,
        candidates: &[String],
        balance: u64,
    ) -> AllocationReport {
        let distribution = self.allocator.score_candidates(graph, candidates);
        let plan = self.allocator.allocate_capacity(&distribution, balance);
        tracing::info!(
            candidates = candidates.len(),
            planned = plan.len(),
            balance,
            "executing allocation plan"
        );

        let mut report = AllocationReport::default();
        for (node_id, fraction) in plan {
            let satoshis = satoshis_for(balance, fraction);
            tracing::info!(node_id = %node_id, satoshis, "opening channel");
            match rpc.fund_channel(&node_id, satoshis) {
                Ok(response) => report.opened.push(ChannelOpen {
                    node_id,
                    satoshis,
                    response,
                }),
                Err(error) => {
                    tracing::error!(
                        node_id = %node_id,
                        satoshis,
                        error = %error,
                        "could not open channel"
                    );
                    report.failed.push(FailedOpen {
                        node_id,
                        satoshis,
                        error,
                    });
                }
            }
        }

        tracing::info!(
            opened = report.opened.len(),
            failed = report.failed.len(),
            requested_sat = report.total_requested_sat(),
            "allocation finished"
        );
        report
    }
}
