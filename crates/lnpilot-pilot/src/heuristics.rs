//! Baseline [`Allocator`] built on two structural rankings: channel count and
//! total channel capacity per node.

use crate::allocation::{AllocationPlan, Allocator, Distribution, Strategy};
use lnpilot_core::graph::{Attributes, NetworkGraph};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap, HashSet};

/// Ranks nodes by degree and capacity and weights candidates by degree.
#[derive(Debug, Clone)]
pub struct DegreeAllocator {
    /// Plan entries smaller than this are dropped and the rest renormalised.
    pub min_channel_sat: u64,
}

impl Default for DegreeAllocator {
    fn default() -> Self {
        Self {
            min_channel_sat: 20_000,
        }
    }
}

/// Capacity of a channel record in satoshis.
///
/// Older nodes report `satoshis`; newer ones report `amount_msat`, either as an
/// integer or as a string like `"100000000msat"`.
pub fn channel_capacity_sat(channel: &Attributes) -> u64 {
    if let Some(sat) = channel.get("satoshis").and_then(Value::as_u64) {
        return sat;
    }
    match channel.get("amount_msat") {
        Some(Value::Number(n)) => n.as_u64().unwrap_or(0) / 1000,
        Some(Value::String(s)) => s
            .strip_suffix("msat")
            .unwrap_or(s)
            .parse::<u64>()
            .map_or(0, |msat| msat / 1000),
        _ => 0,
    }
}

/// Sum of capacities over all channels touching `node_id`.
pub fn node_capacity_sat(graph: &NetworkGraph, node_id: &str) -> u64 {
    graph
        .incident_edges(node_id)
        .map(|(_, attrs)| channel_capacity_sat(attrs))
        .sum()
}

/// Per-node channel count and total capacity, tallied in one pass over the edges.
fn node_totals(graph: &NetworkGraph) -> HashMap<&str, (u64, u64)> {
    let mut totals: HashMap<&str, (u64, u64)> = graph.nodes().map(|(id, _)| (id, (0, 0))).collect();
    for (key, attrs) in graph.edges() {
        let capacity = channel_capacity_sat(attrs);
        // a self-loop counts once, matching NetworkGraph::degree
        let far_end = (key.a() != key.b()).then(|| key.b());
        for id in std::iter::once(key.a()).chain(far_end) {
            let entry = totals.entry(id).or_default();
            entry.0 += 1;
            entry.1 += capacity;
        }
    }
    totals
}

/// Node IDs sorted by score descending, ties broken by ID.
fn rank_by(
    totals: &HashMap<&str, (u64, u64)>,
    score: impl Fn(&(u64, u64)) -> u64,
) -> Vec<(String, u64)> {
    let mut ranked: Vec<(String, u64)> = totals
        .iter()
        .map(|(id, t)| ((*id).to_string(), score(t)))
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked
}

/// Keep the top `percentile` share of a ranking (at least one entry).
/// Values above 1 are read as percentages, so `10` and `0.1` mean the same.
fn apply_cutoff<T>(mut ranked: Vec<T>, percentile: Option<f64>) -> Vec<T> {
    let Some(p) = percentile else {
        return ranked;
    };
    let share = if p > 1.0 { p / 100.0 } else { p };
    if !(share > 0.0 && share < 1.0) {
        return ranked;
    }
    let keep = ((ranked.len() as f64 * share).ceil() as usize).max(1);
    ranked.truncate(keep);
    ranked
}

/// Normalise by the maximum so heterogeneous scores can be added.
fn normalised(ranked: &[(String, u64)]) -> BTreeMap<&str, f64> {
    let max = ranked.iter().map(|(_, s)| *s).max().unwrap_or(0).max(1) as f64;
    ranked
        .iter()
        .map(|(id, s)| (id.as_str(), *s as f64 / max))
        .collect()
}

impl Allocator for DegreeAllocator {
    fn find_candidates(
        &self,
        graph: &NetworkGraph,
        count: usize,
        strategy: Strategy,
        percentile: Option<f64>,
    ) -> Vec<String> {
        let totals = node_totals(graph);
        let by_degree = apply_cutoff(rank_by(&totals, |t| t.0), percentile);
        let by_capacity = apply_cutoff(rank_by(&totals, |t| t.1), percentile);

        let candidates: Vec<String> = match strategy {
            Strategy::Diverse => {
                let mut seen = HashSet::new();
                let mut picks = Vec::new();
                let mut degree_iter = by_degree.iter();
                let mut capacity_iter = by_capacity.iter();
                loop {
                    let next_degree = degree_iter.next();
                    let next_capacity = capacity_iter.next();
                    if next_degree.is_none() && next_capacity.is_none() {
                        break;
                    }
                    for (id, _) in next_degree.into_iter().chain(next_capacity) {
                        if picks.len() < count && seen.insert(id.clone()) {
                            picks.push(id.clone());
                        }
                    }
                    if picks.len() >= count {
                        break;
                    }
                }
                picks
            }
            Strategy::Merge => {
                let degree_scores = normalised(&by_degree);
                let capacity_scores = normalised(&by_capacity);
                let mut combined: BTreeMap<&str, f64> = BTreeMap::new();
                for (id, s) in degree_scores.iter().chain(capacity_scores.iter()) {
                    *combined.entry(*id).or_default() += *s;
                }
                let mut merged: Vec<(&str, f64)> = combined.into_iter().collect();
                merged.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
                merged
                    .into_iter()
                    .take(count)
                    .map(|(id, _)| id.to_string())
                    .collect()
            }
        };

        tracing::info!(
            strategy = %strategy,
            requested = count,
            found = candidates.len(),
            "selected channel candidates"
        );
        candidates
    }

    fn score_candidates(&self, graph: &NetworkGraph, candidates: &[String]) -> Distribution {
        // +1 keeps freshly announced nodes without channels in the distribution
        let weights: Vec<(String, f64)> = candidates
            .iter()
            .map(|id| (id.clone(), graph.degree(id) as f64 + 1.0))
            .collect();
        let total: f64 = weights.iter().map(|(_, w)| w).sum();
        if total <= 0.0 {
            return Distribution::new();
        }
        weights.into_iter().map(|(id, w)| (id, w / total)).collect()
    }

    fn allocate_capacity(&self, distribution: &Distribution, balance: u64) -> AllocationPlan {
        let mut plan: AllocationPlan = distribution
            .iter()
            .filter(|(_, p)| **p > 0.0)
            .map(|(id, p)| (id.clone(), *p))
            .collect();

        // Dropping an entry raises everyone else's share, so iterate to a fixed point.
        loop {
            let total: f64 = plan.values().sum();
            if total <= 0.0 {
                return AllocationPlan::new();
            }
            for fraction in plan.values_mut() {
                *fraction /= total;
            }
            let before = plan.len();
            plan.retain(|_, fraction| balance as f64 * *fraction >= self.min_channel_sat as f64);
            if plan.len() == before {
                return plan;
            }
        }
    }
}
