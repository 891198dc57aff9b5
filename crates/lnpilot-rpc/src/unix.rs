//! Blocking JSON-RPC 2.0 client over the node's Unix domain socket.
//!
//! The node writes one JSON object per response and no framing beyond that, so
//! responses are read with a streaming `serde_json` deserializer. There is no
//! timeout: a call blocks until the node answers or closes the socket.

use crate::session::{NodeRpc, RpcError};
use serde::Deserialize;
use serde_json::{Value, json};
use std::io::{BufReader, Write};
use std::os::unix::net::UnixStream;
use std::path::{Path, PathBuf};

/// A connected session to `lightning-rpc`.
pub struct UnixSocketRpc {
    path: PathBuf,
    reader: BufReader<UnixStream>,
    writer: UnixStream,
    next_id: u64,
}

impl UnixSocketRpc {
    pub fn connect(path: impl AsRef<Path>) -> Result<Self, RpcError> {
        let path = path.as_ref().to_path_buf();
        let stream = UnixStream::connect(&path)?;
        let writer = stream.try_clone()?;
        tracing::info!(path = %path.display(), "connected to RPC interface");
        Ok(Self {
            path,
            reader: BufReader::new(stream),
            writer,
            next_id: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl NodeRpc for UnixSocketRpc {
    fn call(&mut self, method: &str, params: Value) -> Result<Value, RpcError> {
        let id = self.next_id;
        self.next_id += 1;

        let request = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });
        tracing::debug!(method, id, "sending RPC request");
        serde_json::to_writer(&mut self.writer, &request).map_err(std::io::Error::from)?;
        self.writer.flush()?;

        let mut de = serde_json::Deserializer::from_reader(&mut self.reader);
        let response = Value::deserialize(&mut de).map_err(|e| {
            if e.is_io() || e.is_eof() {
                RpcError::Io(e.into())
            } else {
                RpcError::malformed(method, e.to_string())
            }
        })?;

        parse_response(method, id, response)
    }
}

/// Split a JSON-RPC response into its result or error.
///
/// A response carrying another request's id means the stream is out of step with
/// our calls. Every later read would be off by one, so that is reported as a
/// broken session (`Io`) rather than a bad answer.
fn parse_response(method: &str, id: u64, response: Value) -> Result<Value, RpcError> {
    let Value::Object(mut obj) = response else {
        return Err(RpcError::malformed(method, "response is not an object"));
    };

    if let Some(resp_id) = obj.get("id")
        && resp_id.as_u64() != Some(id)
    {
        return Err(RpcError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!(
                "{} response id {} does not match request id {}",
                method, resp_id, id
            ),
        )));
    }

    if let Some(err) = obj.remove("error")
        && !err.is_null()
    {
        return Err(RpcError::Rpc {
            method: method.to_string(),
            code: err.get("code").and_then(|c| c.as_i64()).unwrap_or(-1),
            message: err
                .get("message")
                .and_then(|m| m.as_str())
                .unwrap_or("unknown error")
                .to_string(),
        });
    }

    obj.remove("result")
        .ok_or_else(|| RpcError::malformed(method, "missing `result`"))
}
