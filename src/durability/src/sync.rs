//! Replica synchronization
//!
//! Healthy nodes converge by pulling newer state from peers. The digest
//! (version + trust hash) is compared first so a full snapshot transfer
//! only happens when content actually differs; identical content at a
//! newer version just fast-forwards the local version.

use crate::store::Durability;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use vigil_core::{stable_trust_hash, Journal, NodeContext};
use vigil_net::PeerClient;

#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Period of the sync pass.
    pub interval: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
        }
    }
}

pub struct ReplicaSync {
    ctx: Arc<NodeContext>,
    durability: Arc<Durability>,
    client: Arc<PeerClient>,
    config: SyncConfig,
}

impl ReplicaSync {
    pub fn new(
        ctx: Arc<NodeContext>,
        durability: Arc<Durability>,
        client: Arc<PeerClient>,
        config: SyncConfig,
    ) -> Self {
        Self {
            ctx,
            durability,
            client,
            config,
        }
    }

    pub async fn run(self: Arc<Self>) {
        let mut ticker = tokio::time::interval(self.config.interval);
        loop {
            ticker.tick().await;
            self.tick().await;
        }
    }

    /// One sync pass over the peer set. Public so tests can drive it.
    pub async fn tick(&self) {
        if self.ctx.recovery_mode() {
            return;
        }

        for peer in self.ctx.peers() {
            let (local_version, local_hash) = {
                let state = self.ctx.read();
                (state.version, stable_trust_hash(&state.trust))
            };

            let digest = match self.client.digest(peer).await {
                Ok(digest) => digest,
                Err(err) => {
                    debug!(peer = %peer, %err, "digest not available");
                    continue;
                }
            };

            if digest.version <= local_version {
                continue;
            }

            if digest.trust_hash == local_hash {
                // Same content, newer counter: adopt the version without
                // a snapshot transfer.
                {
                    let mut state = self.ctx.write();
                    state.version = state.version.max(digest.version);
                }
                self.durability.schedule_checkpoint();
                debug!(peer = %peer, version = digest.version, "version fast-forwarded");
                continue;
            }

            match self.client.snapshot(peer).await {
                Ok(snap) => {
                    {
                        let mut state = self.ctx.write();
                        state.merge_snapshot(&snap);
                    }
                    self.durability.checkpoint_now();
                    info!(
                        peer = %peer,
                        remote_version = digest.version,
                        "merged newer replica state"
                    );
                }
                Err(err) => warn!(peer = %peer, %err, "snapshot pull failed"),
            }
        }
    }
}
