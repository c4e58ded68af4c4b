//! Node settings assembled from CLI flags and environment

use anyhow::Result;
use std::path::PathBuf;

/// Everything a node needs to join the fabric.
#[derive(Debug, Clone)]
pub struct NodeSettings {
    /// This node's stable name.
    pub name: String,
    /// Names of every other fabric member.
    pub peers: Vec<String>,
    /// Port the peer endpoint listens on.
    pub port: u16,
    /// Directory holding the checkpoint and WAL.
    pub data_dir: PathBuf,
    /// Run with the adversarial test profile.
    pub attack_mode: bool,
    /// Administrative controller base URL, if deployed.
    pub controller_url: Option<String>,
}

impl NodeSettings {
    /// Parse the comma-separated peer list from configuration.
    pub fn parse_peers(raw: &str) -> Vec<String> {
        raw.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            anyhow::bail!("node name must not be empty");
        }
        if self.peers.iter().any(|p| p == &self.name) {
            anyhow::bail!("peer list must not contain the node itself");
        }
        Ok(())
    }
}
