mod common;

use common::*;
use lnpilot_core::graph::NetworkGraph;
use lnpilot_pilot::{
    AllocationExecutor, AllocationPlan, Allocator, DegreeAllocator, Distribution, Strategy,
};
use lnpilot_rpc::RpcError;

/// Allocator that ignores the graph and returns a fixed plan.
struct FixedPlan(Vec<(&'static str, f64)>);

impl Allocator for FixedPlan {
    fn find_candidates(
        &self,
        _graph: &NetworkGraph,
        count: usize,
        _strategy: Strategy,
        _percentile: Option<f64>,
    ) -> Vec<String> {
        self.0
            .iter()
            .take(count)
            .map(|(id, _)| (*id).to_string())
            .collect()
    }

    fn score_candidates(&self, _graph: &NetworkGraph, candidates: &[String]) -> Distribution {
        candidates
            .iter()
            .map(|c| (c.clone(), 1.0 / candidates.len() as f64))
            .collect()
    }

    fn allocate_capacity(&self, _distribution: &Distribution, _balance: u64) -> AllocationPlan {
        self.0
            .iter()
            .map(|(id, fraction)| ((*id).to_string(), *fraction))
            .collect()
    }
}

fn ids(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| (*s).to_string()).collect()
}

#[test]
fn test_plan_fractions_become_channel_amounts() {
    let allocator = FixedPlan(vec![("A", 0.5), ("B", 0.3)]);
    let mut node = healthy_node();

    let report = AllocationExecutor::new(&allocator).connect(
        &mut node,
        &NetworkGraph::new(),
        &ids(&["A", "B"]),
        10_000_000,
    );

    assert_eq!(
        node.funding_requests(),
        vec![("A".to_string(), 5_000_000), ("B".to_string(), 3_000_000)]
    );
    assert_eq!(report.opened.len(), 2);
    assert!(report.failed.is_empty());
    // fractions need not sum to 1
    assert_eq!(report.total_requested_sat(), 8_000_000);
}

#[test]
fn test_one_failed_open_does_not_stop_the_rest() {
    let allocator = FixedPlan(vec![("A", 0.25), ("B", 0.25), ("C", 0.25), ("D", 0.25)]);
    let mut node = healthy_node().refuse_funding("B");

    let report = AllocationExecutor::new(&allocator).connect(
        &mut node,
        &NetworkGraph::new(),
        &ids(&["A", "B", "C", "D"]),
        1_000_000,
    );

    assert_eq!(node.calls_to("fundchannel"), 4);
    assert_eq!(report.attempted(), 4);
    assert_eq!(report.opened.len(), 3);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].node_id, "B");
    assert_eq!(report.failed[0].satoshis, 250_000);
    assert!(matches!(report.failed[0].error, RpcError::Rpc { .. }));
}

#[test]
fn test_transport_failure_mid_plan_is_recorded() {
    let allocator = FixedPlan(vec![("A", 0.5), ("B", 0.5)]);
    let mut node = healthy_node().queue("fundchannel", Err(io_error()));

    let report = AllocationExecutor::new(&allocator).connect(
        &mut node,
        &NetworkGraph::new(),
        &ids(&["A", "B"]),
        2_000_000,
    );

    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].node_id, "A");
    assert_eq!(report.opened[0].node_id, "B");
    assert_eq!(report.opened[0].response["txid"], "00ff");
}

#[test]
fn test_each_node_funded_at_most_once() {
    let allocator = FixedPlan(vec![("A", 0.4), ("A", 0.6)]);
    let mut node = healthy_node();

    AllocationExecutor::new(&allocator).connect(
        &mut node,
        &NetworkGraph::new(),
        &ids(&["A"]),
        1_000_000,
    );

    // a plan is keyed by node, so the later fraction replaces the earlier
    assert_eq!(node.funding_requests(), vec![("A".to_string(), 600_000)]);
}

#[test]
fn test_empty_plan_opens_nothing() {
    let allocator = FixedPlan(vec![]);
    let mut node = healthy_node();

    let report = AllocationExecutor::new(&allocator).connect(
        &mut node,
        &NetworkGraph::new(),
        &[],
        1_000_000,
    );

    assert_eq!(report.attempted(), 0);
    assert!(node.calls.is_empty());
}

#[test]
fn test_degree_allocator_end_to_end() {
    let mut crawl_node = healthy_node();
    let graph = crawler(StaticSeeds(vec![]))
        .crawl(&mut crawl_node)
        .unwrap()
        .into_graph()
        .unwrap();

    let allocator = DegreeAllocator::default();
    let candidates = allocator.find_candidates(&graph, 21, Strategy::Diverse, None);
    assert_eq!(candidates.len(), 3);

    let mut node = healthy_node();
    let report = AllocationExecutor::new(&allocator).connect(
        &mut node,
        &graph,
        &candidates,
        900_000,
    );

    // triangle: equal degrees, equal shares, rounded up
    assert_eq!(report.opened.len(), 3);
    for (_, amount) in node.funding_requests() {
        assert!((300_000..=300_001).contains(&amount), "{}", amount);
    }
}
