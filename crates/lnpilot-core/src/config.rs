//! Configuration for the autopilot.
//!
//! Load order: `lnpilot.toml` → environment variables → defaults.
//! Command-line flags are applied on top by the binary.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = "lnpilot.toml";

/// Top-level autopilot configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PilotConfig {
    pub rpc: RpcConfig,
    pub bootstrap: BootstrapConfig,
    pub crawl: CrawlConfig,
    pub snapshot: SnapshotConfig,
    pub allocation: AllocationConfig,
}

/// Node control interface.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RpcConfig {
    /// Path to the node's JSON-RPC Unix socket. A leading `~` is expanded.
    pub path: PathBuf,
}

/// Seed discovery and peering.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BootstrapConfig {
    /// DNS domain whose SRV records advertise seed nodes.
    pub domain: String,
    /// Pause between consecutive seed connection attempts.
    pub connect_delay_ms: u64,
}

/// Topology crawl.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CrawlConfig {
    /// Pause between node-list polls that came back empty.
    pub poll_interval_ms: u64,
    /// Give up after this many empty node-list polls. Unset means poll forever.
    pub max_node_polls: Option<u32>,
}

/// Snapshot storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapshotConfig {
    /// Where freshly crawled graphs are written.
    pub path: PathBuf,
    /// Compress the snapshot with zstd before writing.
    /// Decompression on load is automatic (detected by magic bytes).
    pub compress: bool,
}

/// Channel allocation defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AllocationConfig {
    /// Satoshis to spread across all new channels.
    pub balance: u64,
    /// Number of channels to open.
    pub channels: usize,
    /// Candidates whose share would fall below this are dropped from the plan.
    pub min_channel_sat: u64,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("~/.lightning/lightning-rpc"),
        }
    }
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            domain: "lseed.bitcoinstats.com".to_string(),
            connect_delay_ms: 2000,
        }
    }
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 2000,
            max_node_polls: None,
        }
    }
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(crate::storage::DEFAULT_SNAPSHOT_FILE),
            compress: false,
        }
    }
}

impl Default for AllocationConfig {
    fn default() -> Self {
        Self {
            balance: 1_000_000,
            channels: 21,
            min_channel_sat: 20_000,
        }
    }
}

/// Helper to parse an env var and apply it to a config field.
fn env_override<T: std::str::FromStr>(var: &str, target: &mut T) {
    if let Ok(v) = std::env::var(var)
        && let Ok(n) = v.parse()
    {
        *target = n;
    }
}

impl PilotConfig {
    /// Load `lnpilot.toml` from `dir`, with env var overrides.
    /// Falls back to defaults if no config file exists.
    pub fn load(dir: &Path) -> Result<Self> {
        Self::load_file(&dir.join(CONFIG_FILE))
    }

    /// Load a specific config file, with env var overrides.
    pub fn load_file(config_path: &Path) -> Result<Self> {
        let mut config = if config_path.exists() {
            let content = std::fs::read_to_string(config_path)
                .with_context(|| format!("failed to read {}", config_path.display()))?;
            toml::from_str(&content)
                .with_context(|| format!("failed to parse {}", config_path.display()))?
        } else {
            Self::default()
        };

        env_override("LNPILOT_RPC_PATH", &mut config.rpc.path);
        env_override("LNPILOT_SEED_DOMAIN", &mut config.bootstrap.domain);
        env_override(
            "LNPILOT_CONNECT_DELAY_MS",
            &mut config.bootstrap.connect_delay_ms,
        );
        env_override(
            "LNPILOT_POLL_INTERVAL_MS",
            &mut config.crawl.poll_interval_ms,
        );
        if let Ok(v) = std::env::var("LNPILOT_MAX_NODE_POLLS")
            && let Ok(n) = v.parse()
        {
            config.crawl.max_node_polls = Some(n);
        }
        env_override("LNPILOT_SNAPSHOT_PATH", &mut config.snapshot.path);
        env_override("LNPILOT_BALANCE", &mut config.allocation.balance);
        env_override("LNPILOT_CHANNELS", &mut config.allocation.channels);

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.allocation.min_channel_sat > self.allocation.balance {
            anyhow::bail!(
                "min_channel_sat ({}) must not exceed balance ({})",
                self.allocation.min_channel_sat,
                self.allocation.balance,
            );
        }
        Ok(())
    }
}

/// Expand a leading `~` to `$HOME`. Paths without one are returned unchanged.
pub fn expand_home(path: &Path) -> PathBuf {
    let Ok(rest) = path.strip_prefix("~") else {
        return path.to_path_buf();
    };
    match std::env::var_os("HOME") {
        Some(home) => PathBuf::from(home).join(rest),
        None => path.to_path_buf(),
    }
}
