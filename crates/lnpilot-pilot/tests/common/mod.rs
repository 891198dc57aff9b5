//! Shared test doubles: a scripted node and fixed seed sources.
#![allow(dead_code)]

use lnpilot_pilot::{
    CrawlOptions, GraphCrawler, PeeringBootstrapper, SeedError, SeedRecord, SeedSource,
};
use lnpilot_rpc::{NodeRpc, RpcError};
use serde_json::{Value, json};
use std::collections::{HashMap, HashSet, VecDeque};
use std::time::Duration;

/// In-memory node. Each method answers from its one-shot queue first, then from
/// its sticky response; unknown methods fail like the real node does.
#[derive(Default)]
pub struct ScriptedNode {
    queued: HashMap<String, VecDeque<Result<Value, RpcError>>>,
    sticky: HashMap<String, Value>,
    refuse_funding: HashSet<String>,
    pub calls: Vec<(String, Value)>,
}

impl ScriptedNode {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer every `method` call with `result` once the queue is drained.
    pub fn respond(mut self, method: &str, result: Value) -> Self {
        self.sticky.insert(method.to_string(), result);
        self
    }

    /// Answer the next `method` call with `result`.
    pub fn queue(mut self, method: &str, result: Result<Value, RpcError>) -> Self {
        self.queued
            .entry(method.to_string())
            .or_default()
            .push_back(result);
        self
    }

    /// Make `fundchannel` fail for `node_id`.
    pub fn refuse_funding(mut self, node_id: &str) -> Self {
        self.refuse_funding.insert(node_id.to_string());
        self
    }

    pub fn calls_to(&self, method: &str) -> usize {
        self.calls.iter().filter(|(m, _)| m == method).count()
    }

    pub fn methods(&self) -> Vec<&str> {
        self.calls.iter().map(|(m, _)| m.as_str()).collect()
    }

    pub fn connected_ids(&self) -> Vec<String> {
        self.params_for("connect", "id")
    }

    /// (node id, amount) for every fundchannel call, in call order.
    pub fn funding_requests(&self) -> Vec<(String, u64)> {
        self.calls
            .iter()
            .filter(|(m, _)| m == "fundchannel")
            .map(|(_, p)| {
                (
                    p["id"].as_str().unwrap().to_string(),
                    p["amount"].as_u64().unwrap(),
                )
            })
            .collect()
    }

    fn params_for(&self, method: &str, field: &str) -> Vec<String> {
        self.calls
            .iter()
            .filter(|(m, _)| m == method)
            .filter_map(|(_, p)| p[field].as_str().map(str::to_string))
            .collect()
    }
}

impl NodeRpc for ScriptedNode {
    fn call(&mut self, method: &str, params: Value) -> Result<Value, RpcError> {
        self.calls.push((method.to_string(), params.clone()));

        if method == "fundchannel"
            && let Some(id) = params["id"].as_str()
            && self.refuse_funding.contains(id)
        {
            return Err(rpc_error(method, "Cannot afford transaction"));
        }
        if let Some(result) = self.queued.get_mut(method).and_then(|q| q.pop_front()) {
            return result;
        }
        self.sticky
            .get(method)
            .cloned()
            .ok_or_else(|| rpc_error(method, "Unknown command"))
    }
}

pub fn rpc_error(method: &str, message: &str) -> RpcError {
    RpcError::Rpc {
        method: method.to_string(),
        code: -1,
        message: message.to_string(),
    }
}

pub fn io_error() -> RpcError {
    RpcError::Io(std::io::Error::from(std::io::ErrorKind::BrokenPipe))
}

pub fn peers(count: usize) -> Value {
    let peers: Vec<Value> = (0..count)
        .map(|i| json!({"id": format!("03peer{}", i), "connected": true}))
        .collect();
    json!({ "peers": peers })
}

pub fn nodes(ids: &[&str]) -> Value {
    let nodes: Vec<Value> = ids
        .iter()
        .map(|id| json!({"nodeid": id, "alias": format!("alias-{}", id), "color": "000000"}))
        .collect();
    json!({ "nodes": nodes })
}

/// One record per (source, destination) pair, in the given order.
pub fn channels(pairs: &[(&str, &str)]) -> Value {
    let channels: Vec<Value> = pairs
        .iter()
        .enumerate()
        .map(|(i, (source, destination))| {
            json!({
                "source": source,
                "destination": destination,
                "short_channel_id": format!("500000x{}x0", i),
                "satoshis": 1_000_000,
                "active": true,
            })
        })
        .collect();
    json!({ "channels": channels })
}

/// A well-connected node with a small triangle topology.
pub fn healthy_node() -> ScriptedNode {
    ScriptedNode::new()
        .respond("listpeers", peers(2))
        .respond("listnodes", nodes(&["02a", "02b", "02c"]))
        .respond(
            "listchannels",
            channels(&[
                ("02a", "02b"),
                ("02b", "02a"),
                ("02b", "02c"),
                ("02c", "02a"),
            ]),
        )
        .respond("connect", json!({"id": "ok"}))
        .respond("fundchannel", json!({"txid": "00ff", "channel_id": "abcd"}))
}

pub struct StaticSeeds(pub Vec<&'static str>);

impl SeedSource for StaticSeeds {
    fn seed_records(&self) -> Result<Vec<SeedRecord>, SeedError> {
        Ok(self
            .0
            .iter()
            .map(|id| SeedRecord {
                label: format!("label-{}", id),
                node_id: (*id).to_string(),
            })
            .collect())
    }
}

pub struct FailingSeeds;

impl SeedSource for FailingSeeds {
    fn seed_records(&self) -> Result<Vec<SeedRecord>, SeedError> {
        Err(SeedError::Resolve {
            domain: "lseed.example".to_string(),
            message: "no route to host".to_string(),
        })
    }
}

/// Crawler with no pauses.
pub fn crawler<S: SeedSource>(seeds: S) -> GraphCrawler<S> {
    crawler_with(seeds, None)
}

pub fn crawler_with<S: SeedSource>(seeds: S, max_node_polls: Option<u32>) -> GraphCrawler<S> {
    GraphCrawler::new(
        PeeringBootstrapper::new(seeds, Duration::ZERO),
        CrawlOptions {
            poll_interval: Duration::ZERO,
            max_node_polls,
        },
    )
}
