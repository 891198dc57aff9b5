//! The node RPC abstraction.
//!
//! A session is a stateful handle owned by one caller and used serially, hence
//! `&mut self` everywhere. Implementors only provide [`NodeRpc::call`]; the
//! typed helpers unwrap the response envelopes.

use serde_json::{Map, Value, json};

/// A raw record (node, channel, peer) as returned by the node.
pub type Record = Map<String, Value>;

/// Errors from node RPC calls.
#[derive(Debug, thiserror::Error)]
pub enum RpcError {
    #[error("failed to reach node: {0}")]
    Io(#[from] std::io::Error),
    #[error("{method} failed ({code}): {message}")]
    Rpc {
        method: String,
        code: i64,
        message: String,
    },
    #[error("malformed {method} response: {reason}")]
    Malformed { method: String, reason: String },
}

impl RpcError {
    /// True when the node answered but the answer was an error or unusable.
    ///
    /// Transport failures (`Io`) are not data errors: the session itself is broken.
    pub fn is_data_error(&self) -> bool {
        matches!(self, Self::Rpc { .. } | Self::Malformed { .. })
    }

    pub(crate) fn malformed(method: &str, reason: impl Into<String>) -> Self {
        Self::Malformed {
            method: method.to_string(),
            reason: reason.into(),
        }
    }
}

/// Control interface of a Lightning node.
pub trait NodeRpc {
    /// Issue one request and return the `result` member of the response.
    fn call(&mut self, method: &str, params: Value) -> Result<Value, RpcError>;

    /// Currently connected peers.
    fn list_peers(&mut self) -> Result<Vec<Value>, RpcError> {
        let response = self.call("listpeers", json!({}))?;
        take_array(response, "listpeers", "peers")
    }

    /// Every node the local node has heard about through gossip.
    fn list_nodes(&mut self) -> Result<Vec<Record>, RpcError> {
        let response = self.call("listnodes", json!({}))?;
        take_records(response, "listnodes", "nodes")
    }

    /// Every channel half the local node knows; one record per direction.
    fn list_channels(&mut self) -> Result<Vec<Record>, RpcError> {
        let response = self.call("listchannels", json!({}))?;
        take_records(response, "listchannels", "channels")
    }

    /// Establish a peer connection. The node resolves the address itself.
    fn connect(&mut self, node_id: &str) -> Result<Value, RpcError> {
        self.call("connect", json!({ "id": node_id }))
    }

    /// Open and fund a channel of `satoshis` to `node_id`.
    fn fund_channel(&mut self, node_id: &str, satoshis: u64) -> Result<Value, RpcError> {
        self.call("fundchannel", json!({ "id": node_id, "amount": satoshis }))
    }
}

fn take_array(response: Value, method: &str, field: &str) -> Result<Vec<Value>, RpcError> {
    match response {
        Value::Object(mut obj) => match obj.remove(field) {
            Some(Value::Array(items)) => Ok(items),
            Some(_) => Err(RpcError::malformed(method, format!("`{field}` is not an array"))),
            None => Err(RpcError::malformed(method, format!("missing `{field}`"))),
        },
        _ => Err(RpcError::malformed(method, "result is not an object")),
    }
}

fn take_records(response: Value, method: &str, field: &str) -> Result<Vec<Record>, RpcError> {
    take_array(response, method, field)?
        .into_iter()
        .map(|item| match item {
            Value::Object(record) => Ok(record),
            _ => Err(RpcError::malformed(
                method,
                format!("`{field}` contains a non-object entry"),
            )),
        })
        .collect()
}
