//! Read/write graph snapshots from disk.

use crate::config::SnapshotConfig;
use crate::graph::NetworkGraph;
use crate::schema;
use anyhow::{Context, Result};
use std::ffi::OsString;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Default snapshot location, relative to the working directory.
pub const DEFAULT_SNAPSHOT_FILE: &str = "lightning_network_graph.json";

const ZSTD_MAGIC: [u8; 4] = [0x28, 0xB5, 0x2F, 0xFD];
const ZSTD_LEVEL: i32 = 3;

/// Check if a snapshot exists at `path`.
pub fn snapshot_exists(path: &Path) -> bool {
    path.is_file()
}

/// Restore a graph from `path`.
///
/// Returns `Ok(None)` when the file does not exist so the caller can fall back
/// to a fresh crawl. Unreadable or malformed snapshots are errors.
pub fn restore(path: &Path) -> Result<Option<NetworkGraph>> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            tracing::info!(path = %path.display(), "no snapshot found");
            return Ok(None);
        }
        Err(e) => {
            return Err(e)
                .with_context(|| format!("failed to read snapshot from {}", path.display()));
        }
    };

    let json = if bytes.starts_with(&ZSTD_MAGIC) {
        let raw = zstd::decode_all(bytes.as_slice())
            .with_context(|| format!("failed to decompress snapshot {}", path.display()))?;
        String::from_utf8(raw).context("decompressed snapshot is not valid UTF-8")?
    } else {
        String::from_utf8(bytes).context("snapshot is not valid UTF-8")?
    };

    let graph = schema::from_json(&json)
        .with_context(|| format!("failed to load snapshot {}", path.display()))?;
    tracing::info!(
        path = %path.display(),
        nodes = graph.node_count(),
        edges = graph.edge_count(),
        "restored network graph from snapshot"
    );
    Ok(Some(graph))
}

/// Write `graph` to `path`, overwriting any previous snapshot.
///
/// The data goes to a sibling temp file first and is renamed into place, so an
/// interrupted write never leaves a truncated snapshot behind.
pub fn persist(path: &Path, graph: &NetworkGraph, config: &SnapshotConfig) -> Result<()> {
    if let Some(dir) = path.parent()
        && !dir.as_os_str().is_empty()
    {
        fs::create_dir_all(dir)
            .with_context(|| format!("failed to create snapshot directory {}", dir.display()))?;
    }

    let json = schema::to_json(graph)?;
    let bytes = if config.compress {
        zstd::encode_all(json.as_bytes(), ZSTD_LEVEL).context("failed to compress snapshot")?
    } else {
        json.into_bytes()
    };

    let tmp = temp_sibling(path);
    fs::write(&tmp, bytes)
        .with_context(|| format!("failed to write snapshot to {}", tmp.display()))?;
    fs::rename(&tmp, path)
        .with_context(|| format!("failed to move snapshot into {}", path.display()))?;

    tracing::info!(
        path = %path.display(),
        nodes = graph.node_count(),
        edges = graph.edge_count(),
        compressed = config.compress,
        "persisted network graph"
    );
    Ok(())
}

/// Persist unless the caller asked not to store. Returns whether a write happened.
pub fn persist_unless(
    path: &Path,
    graph: &NetworkGraph,
    config: &SnapshotConfig,
    dont_store: bool,
) -> Result<bool> {
    if dont_store {
        tracing::debug!("snapshot persistence suppressed");
        return Ok(false);
    }
    persist(path, graph, config)?;
    Ok(true)
}

fn temp_sibling(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| OsString::from("snapshot"));
    name.push(".tmp");
    path.with_file_name(name)
}
