use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::consensus::NodeId;

fn default_batch_size() -> usize {
    2
}

fn default_pool_capacity() -> usize {
    10_000
}

/// One peer row of the cluster table.
#[derive(Debug, Clone, Deserialize)]
pub struct PeerEntry {
    pub id: NodeId,
    pub addr: String,
}

/// Static node configuration, loaded from TOML.
///
/// ```toml
/// node_id = 0
/// primary = true
/// listen_addr = "127.0.0.1:7000"
/// rpc_addr = "127.0.0.1:8000"
/// batch_size = 2
///
/// [[peers]]
/// id = 1
/// addr = "127.0.0.1:7001"
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct NodeConfig {
    pub node_id: NodeId,
    #[serde(default)]
    pub primary: bool,
    /// Cluster-facing bind address (phase message transport).
    pub listen_addr: String,
    /// Client-facing bind address (HTTP API).
    pub rpc_addr: String,
    /// Votes per proposed block.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Bound on queued, not-yet-proposed votes.
    #[serde(default = "default_pool_capacity")]
    pub pool_capacity: usize,
    /// Identity key seed file; defaults to `node-<id>.key`.
    #[serde(default)]
    pub key_file: Option<PathBuf>,
    /// Every node in the cluster other than this one.
    pub peers: Vec<PeerEntry>,
}

impl NodeConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(&path)
            .with_context(|| format!("reading config {}", path.as_ref().display()))?;
        let cfg: NodeConfig = toml::from_str(&raw).context("parsing config")?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            anyhow::bail!("batch_size must be at least 1");
        }
        let mut seen = std::collections::HashSet::new();
        for peer in &self.peers {
            if peer.id == self.node_id {
                anyhow::bail!("peer table must not contain this node (id {})", self.node_id);
            }
            if !seen.insert(peer.id) {
                anyhow::bail!("duplicate peer id {}", peer.id);
            }
        }
        Ok(())
    }

    /// Total node count n, self included.
    pub fn cluster_size(&self) -> usize {
        self.peers.len() + 1
    }

    /// Maximum tolerated faulty nodes, f = (n - 1) / 3.
    pub fn fault_bound(&self) -> usize {
        (self.cluster_size() - 1) / 3
    }

    pub fn peer_table(&self) -> HashMap<NodeId, String> {
        self.peers.iter().map(|p| (p.id, p.addr.clone())).collect()
    }

    pub fn key_file(&self) -> PathBuf {
        self.key_file
            .clone()
            .unwrap_or_else(|| PathBuf::from(format!("node-{}.key", self.node_id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
node_id = 0
primary = true
listen_addr = "127.0.0.1:7000"
rpc_addr = "127.0.0.1:8000"

[[peers]]
id = 1
addr = "127.0.0.1:7001"

[[peers]]
id = 2
addr = "127.0.0.1:7002"

[[peers]]
id = 3
addr = "127.0.0.1:7003"
"#;

    #[test]
    fn parses_sample_and_derives_fault_bound() {
        let cfg: NodeConfig = toml::from_str(SAMPLE).unwrap();
        cfg.validate().unwrap();
        assert_eq!(cfg.node_id, 0);
        assert!(cfg.primary);
        assert_eq!(cfg.cluster_size(), 4);
        assert_eq!(cfg.fault_bound(), 1);
        assert_eq!(cfg.batch_size, 2);
        assert_eq!(cfg.peer_table().get(&2).unwrap(), "127.0.0.1:7002");
    }

    #[test]
    fn rejects_self_in_peer_table() {
        let mut cfg: NodeConfig = toml::from_str(SAMPLE).unwrap();
        cfg.peers.push(PeerEntry {
            id: 0,
            addr: "127.0.0.1:7000".into(),
        });
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_duplicate_peer_ids() {
        let mut cfg: NodeConfig = toml::from_str(SAMPLE).unwrap();
        cfg.peers.push(PeerEntry {
            id: 1,
            addr: "127.0.0.1:7009".into(),
        });
        assert!(cfg.validate().is_err());
    }
}
