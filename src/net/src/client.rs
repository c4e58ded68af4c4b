//! Typed peer RPC client

use crate::error::{NetError, Result};
use futures::future::join_all;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, warn};
use vigil_core::{
    AlertRequest, NodeName, ProposeRequest, RecoverRequest, StateDigest, StateSnapshot,
    VoteRequest,
};

/// Transport configuration.
#[derive(Debug, Clone)]
pub struct PeerClientConfig {
    /// Port every fabric node listens on.
    pub port: u16,
    /// Per-call timeout; a peer that misses it simply has not voted.
    pub timeout: Duration,
    /// Explicit name-to-base-URL overrides. Names without an override
    /// resolve to `http://<name>:<port>`.
    pub endpoints: HashMap<NodeName, String>,
}

impl Default for PeerClientConfig {
    fn default() -> Self {
        Self {
            port: 5000,
            timeout: Duration::from_secs(2),
            endpoints: HashMap::new(),
        }
    }
}

/// Shared HTTP client for all peer traffic from one node.
pub struct PeerClient {
    http: reqwest::Client,
    config: PeerClientConfig,
}

impl PeerClient {
    pub fn new(config: PeerClientConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;
        Ok(Self { http, config })
    }

    fn base_url(&self, peer: &str) -> String {
        self.config
            .endpoints
            .get(peer)
            .cloned()
            .unwrap_or_else(|| format!("http://{}:{}", peer, self.config.port))
    }

    async fn post<B: serde::Serialize>(&self, peer: &str, path: &str, body: &B) -> Result<()> {
        let url = format!("{}{}", self.base_url(peer), path);
        let resp = self
            .http
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|source| NetError::Request { peer: peer.to_string(), source })?;
        if !resp.status().is_success() {
            return Err(NetError::Status {
                peer: peer.to_string(),
                status: resp.status(),
            });
        }
        Ok(())
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, peer: &str, path: &str) -> Result<T> {
        let url = format!("{}{}", self.base_url(peer), path);
        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|source| NetError::Request { peer: peer.to_string(), source })?;
        if !resp.status().is_success() {
            return Err(NetError::Status {
                peer: peer.to_string(),
                status: resp.status(),
            });
        }
        resp.json()
            .await
            .map_err(|source| NetError::Request { peer: peer.to_string(), source })
    }

    pub async fn propose(&self, peer: &str, req: &ProposeRequest) -> Result<()> {
        self.post(peer, "/propose", req).await
    }

    pub async fn vote(&self, proposer: &str, req: &VoteRequest) -> Result<()> {
        self.post(proposer, "/vote", req).await
    }

    pub async fn alert(&self, peer: &str, req: &AlertRequest) -> Result<()> {
        self.post(peer, "/alert", req).await
    }

    pub async fn snapshot(&self, peer: &str) -> Result<StateSnapshot> {
        self.get_json(peer, "/state/snapshot").await
    }

    pub async fn digest(&self, peer: &str) -> Result<StateDigest> {
        self.get_json(peer, "/state/digest").await
    }

    /// Fan a propose out to every peer, logging and dropping failures.
    pub async fn broadcast_propose(&self, peers: &[NodeName], req: &ProposeRequest) {
        let calls = peers.iter().map(|peer| async move {
            if let Err(err) = self.propose(peer, req).await {
                warn!(peer = %peer, case_id = %req.case_id, %err, "propose not delivered");
            } else {
                debug!(peer = %peer, case_id = %req.case_id, "propose delivered");
            }
        });
        join_all(calls).await;
    }

    /// Fan a final alert out to every peer, best effort.
    pub async fn broadcast_alert(&self, peers: &[NodeName], req: &AlertRequest) {
        let calls = peers.iter().map(|peer| async move {
            if let Err(err) = self.alert(peer, req).await {
                warn!(peer = %peer, case_id = %req.case_id, %err, "alert not delivered");
            }
        });
        join_all(calls).await;
    }

    /// Collect whatever snapshots the peer set will give us.
    pub async fn collect_snapshots(&self, peers: &[NodeName]) -> Vec<StateSnapshot> {
        let calls = peers.iter().map(|peer| async move {
            match self.snapshot(peer).await {
                Ok(snap) => Some(snap),
                Err(err) => {
                    warn!(peer = %peer, %err, "snapshot not available");
                    None
                }
            }
        });
        join_all(calls).await.into_iter().flatten().collect()
    }

    /// Ask the administrative controller to push a restore. `base` is the
    /// controller's full base URL.
    pub async fn request_controller_recovery(&self, base: &str, req: &RecoverRequest) -> Result<()> {
        let url = format!("{base}/cluster/recover");
        let resp = self
            .http
            .post(&url)
            .json(req)
            .send()
            .await
            .map_err(|source| NetError::Request { peer: base.to_string(), source })?;
        if !resp.status().is_success() {
            return Err(NetError::Status {
                peer: base.to_string(),
                status: resp.status(),
            });
        }
        Ok(())
    }
}
