//! Graph data model for the local view of the payment-channel network.

use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Opaque attribute record copied verbatim from an RPC node or channel entry.
pub type Attributes = Map<String, Value>;

/// Unordered pair of node IDs identifying an undirected edge.
///
/// The constructor sorts the endpoints, so `EdgeKey::new(a, b) == EdgeKey::new(b, a)`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EdgeKey {
    a: String,
    b: String,
}

impl EdgeKey {
    pub fn new(x: impl Into<String>, y: impl Into<String>) -> Self {
        let (x, y) = (x.into(), y.into());
        if x <= y {
            Self { a: x, b: y }
        } else {
            Self { a: y, b: x }
        }
    }

    /// The lexicographically smaller endpoint.
    pub fn a(&self) -> &str {
        &self.a
    }

    /// The lexicographically larger endpoint.
    pub fn b(&self) -> &str {
        &self.b
    }

    pub fn contains(&self, node_id: &str) -> bool {
        self.a == node_id || self.b == node_id
    }

    /// The endpoint opposite `node_id`, if `node_id` is one of the endpoints.
    pub fn other(&self, node_id: &str) -> Option<&str> {
        if self.a == node_id {
            Some(&self.b)
        } else if self.b == node_id {
            Some(&self.a)
        } else {
            None
        }
    }
}

/// Undirected topology graph: G = (V, E).
///
/// Vertices are keyed by node ID (public key hex) and carry the node's RPC record.
/// Edges are keyed by the unordered endpoint pair and carry the channel's RPC record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NetworkGraph {
    nodes: BTreeMap<String, Attributes>,
    edges: BTreeMap<EdgeKey, Attributes>,
}

impl NetworkGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a vertex, replacing the attributes of an existing vertex with the same ID.
    pub fn add_node(&mut self, node_id: impl Into<String>, attributes: Attributes) {
        self.nodes.insert(node_id.into(), attributes);
    }

    /// Insert an undirected edge between `source` and `destination`.
    ///
    /// Endpoints missing from the vertex set are added with empty attributes.
    /// An existing edge for the same pair has its attributes replaced: channel
    /// records arrive once per direction and the later direction wins, so the
    /// per-direction fields (fees, `active`, flags) of the earlier one are lost.
    pub fn add_edge(
        &mut self,
        source: impl Into<String>,
        destination: impl Into<String>,
        attributes: Attributes,
    ) {
        let (source, destination) = (source.into(), destination.into());
        self.nodes.entry(source.clone()).or_default();
        self.nodes.entry(destination.clone()).or_default();
        self.edges
            .insert(EdgeKey::new(source, destination), attributes);
    }

    pub fn node(&self, node_id: &str) -> Option<&Attributes> {
        self.nodes.get(node_id)
    }

    pub fn edge(&self, x: &str, y: &str) -> Option<&Attributes> {
        self.edges.get(&EdgeKey::new(x, y))
    }

    pub fn contains_node(&self, node_id: &str) -> bool {
        self.nodes.contains_key(node_id)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Iterate vertices in node ID order.
    pub fn nodes(&self) -> impl Iterator<Item = (&str, &Attributes)> {
        self.nodes.iter().map(|(id, attrs)| (id.as_str(), attrs))
    }

    /// Iterate edges in key order.
    pub fn edges(&self) -> impl Iterator<Item = (&EdgeKey, &Attributes)> {
        self.edges.iter()
    }

    /// All edges touching `node_id`.
    pub fn incident_edges<'a>(
        &'a self,
        node_id: &'a str,
    ) -> impl Iterator<Item = (&'a EdgeKey, &'a Attributes)> + 'a {
        self.edges
            .iter()
            .filter(move |(key, _)| key.contains(node_id))
    }

    /// IDs of all nodes sharing an edge with `node_id`. A self-loop yields the node itself.
    pub fn neighbors<'a>(&'a self, node_id: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.incident_edges(node_id)
            .filter_map(move |(key, _)| key.other(node_id))
    }

    /// Number of edges touching `node_id`.
    pub fn degree(&self, node_id: &str) -> usize {
        self.incident_edges(node_id).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn attrs(value: serde_json::Value) -> Attributes {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_edge_key_is_unordered() {
        assert_eq!(EdgeKey::new("b", "a"), EdgeKey::new("a", "b"));
        let key = EdgeKey::new("z", "m");
        assert_eq!(key.a(), "m");
        assert_eq!(key.b(), "z");
        assert_eq!(key.other("m"), Some("z"));
        assert_eq!(key.other("q"), None);
    }

    #[test]
    fn test_add_edge_adds_missing_endpoints() {
        let mut graph = NetworkGraph::new();
        graph.add_edge("a", "b", Attributes::new());
        assert_eq!(graph.node_count(), 2);
        assert!(graph.node("a").unwrap().is_empty());
    }

    #[test]
    fn test_reverse_direction_overwrites_attributes() {
        let mut graph = NetworkGraph::new();
        let forward = attrs(json!({"source": "a", "fee_per_millionth": 1}));
        let backward = attrs(json!({"source": "b", "fee_per_millionth": 9}));
        graph.add_edge("a", "b", forward);
        graph.add_edge("b", "a", backward);

        assert_eq!(graph.edge_count(), 1);
        let edge = graph.edge("a", "b").unwrap();
        assert_eq!(edge["source"], "b");
        assert_eq!(edge["fee_per_millionth"], 9);
    }

    #[test]
    fn test_degree_and_neighbors() {
        let mut graph = NetworkGraph::new();
        graph.add_edge("hub", "x", Attributes::new());
        graph.add_edge("y", "hub", Attributes::new());
        graph.add_edge("x", "y", Attributes::new());

        assert_eq!(graph.degree("hub"), 2);
        let mut neighbors: Vec<&str> = graph.neighbors("hub").collect();
        neighbors.sort_unstable();
        assert_eq!(neighbors, vec!["x", "y"]);
        assert_eq!(graph.degree("missing"), 0);
    }
}
