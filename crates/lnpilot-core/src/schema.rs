//! Versioned JSON snapshot format for [`NetworkGraph`].
//!
//! JSON objects can only be keyed by strings, so vertices and edges are written
//! as arrays of records rather than maps. The format is not compatible with
//! snapshots produced by other autopilot implementations.

use crate::graph::{Attributes, NetworkGraph};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const CURRENT_VERSION: &str = "1.0.0";

/// On-disk representation of a crawled graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub version: String,
    pub created_at: DateTime<Utc>,
    pub node_count: usize,
    pub edge_count: usize,
    pub nodes: Vec<NodeRecord>,
    pub edges: Vec<EdgeRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeRecord {
    pub id: String,
    #[serde(default)]
    pub attributes: Attributes,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeRecord {
    pub a: String,
    pub b: String,
    #[serde(default)]
    pub attributes: Attributes,
}

impl Snapshot {
    pub fn from_graph(graph: &NetworkGraph) -> Self {
        let nodes: Vec<NodeRecord> = graph
            .nodes()
            .map(|(id, attributes)| NodeRecord {
                id: id.to_string(),
                attributes: attributes.clone(),
            })
            .collect();
        let edges: Vec<EdgeRecord> = graph
            .edges()
            .map(|(key, attributes)| EdgeRecord {
                a: key.a().to_string(),
                b: key.b().to_string(),
                attributes: attributes.clone(),
            })
            .collect();
        Self {
            version: CURRENT_VERSION.to_string(),
            created_at: Utc::now(),
            node_count: nodes.len(),
            edge_count: edges.len(),
            nodes,
            edges,
        }
    }

    /// Rebuild the graph. Nodes are inserted before edges so that vertex attributes
    /// are never shadowed by the empty placeholders `add_edge` creates.
    pub fn into_graph(self) -> NetworkGraph {
        let mut graph = NetworkGraph::new();
        for node in self.nodes {
            graph.add_node(node.id, node.attributes);
        }
        for edge in self.edges {
            graph.add_edge(edge.a, edge.b, edge.attributes);
        }
        graph
    }
}

/// Validate a snapshot's schema version and declared counts.
pub fn validate(snapshot: &Snapshot) -> Result<()> {
    if snapshot.version != CURRENT_VERSION {
        anyhow::bail!(
            "snapshot version mismatch: expected {}, found {}",
            CURRENT_VERSION,
            snapshot.version
        );
    }
    if snapshot.node_count != snapshot.nodes.len() || snapshot.edge_count != snapshot.edges.len() {
        anyhow::bail!(
            "snapshot is inconsistent: header declares {} nodes / {} edges, body has {} / {}",
            snapshot.node_count,
            snapshot.edge_count,
            snapshot.nodes.len(),
            snapshot.edges.len()
        );
    }
    Ok(())
}

/// Serialize a graph to a compact JSON snapshot.
pub fn to_json(graph: &NetworkGraph) -> Result<String> {
    serde_json::to_string(&Snapshot::from_graph(graph)).context("failed to serialize snapshot")
}

/// Deserialize and validate a JSON snapshot.
pub fn from_json(json: &str) -> Result<NetworkGraph> {
    let snapshot: Snapshot =
        serde_json::from_str(json).context("failed to deserialize snapshot")?;
    validate(&snapshot)?;
    Ok(snapshot.into_graph())
}
