//! Peer-quorum self-recovery
//!
//! A node that comes up with factory-default trust or an empty reputation
//! ledger has lost its memory. After a bootstrap grace window it pulls
//! snapshots from every peer, groups them by trust-map digest, and adopts
//! the newest snapshot of the largest agreeing group. With no reachable
//! snapshots it asks the administrative controller to push one instead.

use crate::store::Durability;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use vigil_core::{
    stable_trust_hash, unix_now, NodeContext, RecoverRequest, StateSnapshot, DEFAULT_TRUST,
};
use vigil_net::PeerClient;

#[derive(Debug, Clone)]
pub struct RecoveryConfig {
    /// Period of the recovery check.
    pub interval: Duration,
    /// No recovery action during the first seconds of a process life.
    pub bootstrap_grace_secs: f64,
    /// Minimum spacing between attempts.
    pub attempt_cooldown_secs: f64,
    /// Administrative controller base URL, if one is deployed.
    pub controller_url: Option<String>,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(10),
            bootstrap_grace_secs: 25.0,
            attempt_cooldown_secs: 30.0,
            controller_url: None,
        }
    }
}

pub struct SelfRecovery {
    ctx: Arc<NodeContext>,
    durability: Arc<Durability>,
    client: Arc<PeerClient>,
    config: RecoveryConfig,
}

impl SelfRecovery {
    pub fn new(
        ctx: Arc<NodeContext>,
        durability: Arc<Durability>,
        client: Arc<PeerClient>,
        config: RecoveryConfig,
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

    /// One recovery check. Public so tests can drive it directly.
    pub async fn tick(&self) {
        if self.ctx.uptime_secs() < self.config.bootstrap_grace_secs {
            return;
        }
        if !self.state_looks_amnesiac() {
            return;
        }
        if unix_now() - self.ctx.last_recovery() < self.config.attempt_cooldown_secs {
            return;
        }

        self.ctx.set_recovery_mode(true);
        self.ctx.mark_recovery_attempt();
        warn!("state looks amnesiac, attempting quorum restore");

        let snapshots = self.client.collect_snapshots(self.ctx.peers()).await;
        if snapshots.is_empty() {
            if let Some(base) = &self.config.controller_url {
                let req = RecoverRequest {
                    node: self.ctx.name().to_string(),
                    reason: "no peer snapshots reachable".into(),
                };
                if let Err(err) = self.client.request_controller_recovery(base, &req).await {
                    warn!(%err, "controller recovery request failed");
                } else {
                    info!("controller recovery requested");
                }
            } else {
                warn!("no peer snapshots and no controller configured");
            }
        } else if let Some(chosen) = choose_quorum_snapshot(&snapshots, self.ctx.peers().len()) {
            info!(
                source = %chosen.node,
                candidates = snapshots.len(),
                "restoring from peer quorum snapshot"
            );
            self.durability.apply_restore(chosen, true);
        }

        self.ctx.set_recovery_mode(false);
    }

    /// Trigger condition: trust map empty or entirely at the default, or
    /// an empty reputation ledger.
    fn state_looks_amnesiac(&self) -> bool {
        let state = self.ctx.read();
        let trust_blank =
            state.trust.is_empty() || state.trust.values().all(|&t| t == DEFAULT_TRUST);
        trust_blank || state.reputation.is_empty()
    }
}

/// Pick the restore source: group candidates by trust-map digest, take
/// the newest member of any group reaching half the peer set, otherwise
/// fall back to the newest snapshot overall. `None` only for an empty
/// candidate set.
pub fn choose_quorum_snapshot(
    snapshots: &[StateSnapshot],
    peer_count: usize,
) -> Option<&StateSnapshot> {
    use std::collections::HashMap;

    fn newest<'a>(members: &[&'a StateSnapshot]) -> Option<&'a StateSnapshot> {
        members
            .iter()
            .copied()
            .max_by(|a, b| a.timestamp.total_cmp(&b.timestamp))
    }

    let quorum = (peer_count / 2).max(1);
    let mut groups: HashMap<String, Vec<&StateSnapshot>> = HashMap::new();
    for snap in snapshots {
        groups
            .entry(stable_trust_hash(&snap.trust))
            .or_default()
            .push(snap);
    }

    groups
        .values()
        .filter(|members| members.len() >= quorum)
        .max_by_key(|members| members.len())
        .and_then(|members| newest(members))
        .or_else(|| {
            let all: Vec<&StateSnapshot> = snapshots.iter().collect();
            newest(&all)
        })
}
