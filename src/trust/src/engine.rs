//! Trust engine
//!
//! Owns every mutation of trust, strikes, reputation and quarantine.
//! Mutations happen under the node-wide write lock; WAL records produced
//! during a mutation are buffered and handed to the journal after the
//! lock is released, so the journal never nests inside the state lock.

use crate::config::TrustConfig;
use crate::error::Result;
use crate::metrics::TrustMetrics;
use prometheus::Registry;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};
use vigil_core::{
    unix_now, CaseResult, Journal, NodeContext, NodeName, NodeState, StatusResponse, WalEntry,
    MAX_TRUST, MIN_TRUST,
};

pub struct TrustEngine {
    ctx: Arc<NodeContext>,
    journal: Arc<dyn Journal>,
    config: TrustConfig,
    metrics: TrustMetrics,
}

impl TrustEngine {
    pub fn new(
        ctx: Arc<NodeContext>,
        journal: Arc<dyn Journal>,
        config: TrustConfig,
        registry: &Registry,
    ) -> Result<Self> {
        let metrics = TrustMetrics::register(registry)?;
        Ok(Self {
            ctx,
            journal,
            config,
            metrics,
        })
    }

    pub fn config(&self) -> &TrustConfig {
        &self.config
    }

    /// Route a raw trust delta through the update pipeline: freeze gate,
    /// per-node cooldown, delta clamp, range clamp, EMA blend. The
    /// quarantine check runs on both the applied and the skipped path.
    pub fn apply_trust_update(&self, node: &str, raw_delta: f64) {
        if self.ctx.trust_frozen() {
            debug!(node, raw_delta, "trust frozen, update dropped");
            return;
        }

        let mut wal = Vec::new();
        let mut dirty = false;
        {
            let mut state = self.ctx.write();
            let now = unix_now();
            let last = state.last_trust_update.get(node).copied().unwrap_or(0.0);

            if now - last < self.config.cooldown_secs {
                debug!(node, raw_delta, "cooldown active, delta skipped");
            } else {
                let clamped = raw_delta.clamp(-self.config.max_delta, self.config.max_delta);
                let current = state.trust_of(node);
                let target = (current + clamped).clamp(MIN_TRUST, MAX_TRUST);
                let updated =
                    self.config.ema_alpha * target + (1.0 - self.config.ema_alpha) * current;

                state.trust.insert(node.to_string(), updated);
                state.last_trust_update.insert(node.to_string(), now);
                wal.push(WalEntry::TrustUpdate {
                    node: node.to_string(),
                    value: updated,
                    time: now,
                });
                dirty = true;
                debug!(node, from = current, to = updated, "trust updated");
            }

            dirty |= self.evaluate_quarantine_locked(&mut state, node);
        }
        self.commit(wal, dirty);
        self.observe();
    }

    /// Process a proposer's final alert: confirmed terminations reward,
    /// everything else counts as a false alarm.
    pub fn record_alert_outcome(&self, proposer: &str, result: CaseResult) {
        let mut wal = Vec::new();
        {
            let mut state = self.ctx.write();
            state.touch_activity(proposer, false);
            let now = unix_now();
            match result {
                CaseResult::Terminated => {
                    state.reputation.record_success(proposer);
                    state.strikes.insert(proposer.to_string(), 0);
                    wal.push(WalEntry::StrikeUpdate {
                        node: proposer.to_string(),
                        strikes: 0,
                        time: now,
                    });
                }
                CaseResult::Allowed | CaseResult::Rejected => {
                    state.reputation.record_false(proposer);
                    let strikes = state.strikes.entry(proposer.to_string()).or_insert(0);
                    *strikes += 1;
                    let strikes = *strikes;
                    wal.push(WalEntry::StrikeUpdate {
                        node: proposer.to_string(),
                        strikes,
                        time: now,
                    });
                    info!(proposer, strikes, ?result, "strike recorded");
                }
            }
        }
        self.commit(wal, true);

        match result {
            CaseResult::Terminated => self.apply_trust_update(proposer, self.config.reward),
            CaseResult::Allowed | CaseResult::Rejected => {
                self.apply_trust_update(proposer, -self.config.penalty)
            }
        }
    }

    /// Self-penalty after a case expires without quorum.
    pub fn penalize_self_rejection(&self) {
        let name = self.ctx.name().to_string();
        let mut wal = Vec::new();
        {
            let mut state = self.ctx.write();
            let strikes = state.strikes.entry(name.clone()).or_insert(0);
            *strikes += 1;
            let strikes = *strikes;
            wal.push(WalEntry::StrikeUpdate {
                node: name.clone(),
                strikes,
                time: unix_now(),
            });
            state.reputation.record_false(&name);
            info!(strikes, "case rejected, self strike");
        }
        self.commit(wal, true);
        self.apply_trust_update(&name, -self.config.penalty);
    }

    /// Governance penalty requested by the controller. Self-penalties and
    /// penalties against already-quarantined nodes are refused.
    pub fn governance_penalize(&self, node: &str, penalty: f64) {
        if node == self.ctx.name() {
            debug!(node, "governance penalty against self refused");
            return;
        }
        if self.ctx.read().is_quarantined(node) {
            debug!(node, "governance penalty against quarantined node refused");
            return;
        }
        self.apply_trust_update(node, -penalty.abs());
    }

    /// Governance quarantine order. A node receiving its own name
    /// self-quarantines.
    pub fn governance_quarantine(&self, node: &str, duration_secs: f64) {
        {
            let mut state = self.ctx.write();
            let q = state.quarantine.entry(node.to_string()).or_default();
            q.active = true;
            q.until = unix_now() + duration_secs;
        }
        warn!(node, duration_secs, "quarantine ordered");
        self.commit(Vec::new(), true);
    }

    /// Promote a node into quarantine when strikes or trust cross the
    /// line. Returns whether the state changed.
    fn evaluate_quarantine_locked(&self, state: &mut NodeState, node: &str) -> bool {
        let strikes = state.strikes.get(node).copied().unwrap_or(0);
        let trust = state.trust_of(node);
        let threshold = self.config.quarantine_threshold;
        let q = state.quarantine.entry(node.to_string()).or_default();

        if !q.active && (strikes >= self.config.max_strikes || trust < threshold) {
            q.active = true;
            q.until = unix_now() + self.config.quarantine_secs;
            warn!(node, strikes, trust, "node quarantined");
            true
        } else {
            false
        }
    }

    /// Release expired quarantines and wipe their strike counters.
    pub fn watchdog_tick(&self) {
        let mut released = Vec::new();
        {
            let mut state = self.ctx.write();
            let now = unix_now();
            for (node, q) in state.quarantine.iter_mut() {
                if q.active && now > q.until {
                    q.active = false;
                    released.push(node.clone());
                }
            }
            for node in &released {
                state.strikes.insert(node.clone(), 0);
            }
        }

        if !released.is_empty() {
            let now = unix_now();
            let wal = released
                .iter()
                .map(|node| WalEntry::StrikeUpdate {
                    node: node.clone(),
                    strikes: 0,
                    time: now,
                })
                .collect();
            for node in &released {
                info!(node = %node, "quarantine lifted");
            }
            self.commit(wal, true);
        }
        self.observe();
    }

    /// Decay idle low performers: trust at or below the median AND no
    /// activity inside the inactivity window. High-trust idle leaders are
    /// left alone.
    pub fn decay_tick(&self) {
        let candidates: Vec<NodeName> = {
            let state = self.ctx.read();
            let mut values: Vec<f64> = state.trust.values().copied().collect();
            if values.is_empty() {
                return;
            }
            values.sort_by(f64::total_cmp);
            let median = median_of_sorted(&values);
            let now = unix_now();

            state
                .trust
                .keys()
                .filter(|node| {
                    !state.is_quarantined(node)
                        && state.trust_of(node) <= median
                        && state
                            .stats
                            .get(*node)
                            .map_or(true, |a| now - a.last_activity > self.config.inactivity_secs)
                })
                .cloned()
                .collect()
        };

        for node in candidates {
            debug!(node = %node, "idle low performer, decaying");
            self.apply_trust_update(&node, -self.config.decay_rate);
        }
        self.observe();
    }

    /// Current quorum bar: scaled up as cluster-wide trust drops, floored
    /// at the configured minimum, never above the active node count.
    pub fn adaptive_threshold(&self) -> f64 {
        self.adaptive_threshold_for(&self.ctx.read())
    }

    pub fn adaptive_threshold_for(&self, state: &NodeState) -> f64 {
        let active: Vec<f64> = state
            .trust
            .iter()
            .filter(|(node, _)| !state.is_quarantined(node))
            .map(|(_, &t)| t)
            .collect();
        if active.is_empty() {
            return self.config.threshold_floor;
        }
        let avg = active.iter().sum::<f64>() / active.len() as f64;
        let raw = self.config.weight_threshold * (1.0 + (1.0 - avg));
        let hi = (active.len() as f64).max(self.config.threshold_floor);
        raw.clamp(self.config.threshold_floor, hi)
    }

    /// Trust-and-accuracy weighted sum over affirmative votes from
    /// non-quarantined voters.
    pub fn weighted_vote_sum(&self, votes: &HashMap<NodeName, bool>) -> f64 {
        let state = self.ctx.read();
        votes
            .iter()
            .filter(|(voter, &vote)| vote && !state.is_quarantined(voter))
            .map(|(voter, _)| state.trust_of(voter) * state.reputation.accuracy(voter))
            .sum()
    }

    /// `/status` view assembled under one read lock.
    pub fn status(&self) -> StatusResponse {
        let state = self.ctx.read();
        StatusResponse {
            node: self.ctx.name().to_string(),
            trust: state.trust.clone(),
            strikes: state.strikes.clone(),
            active_cases: state.pending_cases.len(),
            quarantined: state.quarantine.clone(),
            adaptive_quorum: self.adaptive_threshold_for(&state),
            version: state.version,
        }
    }

    /// Periodic quarantine watchdog.
    pub async fn run_watchdog(self: Arc<Self>) {
        let mut ticker = tokio::time::interval(self.config.watchdog_interval);
        loop {
            ticker.tick().await;
            self.watchdog_tick();
        }
    }

    /// Periodic trust decay.
    pub async fn run_decay(self: Arc<Self>) {
        let mut ticker = tokio::time::interval(self.config.decay_interval);
        loop {
            ticker.tick().await;
            self.decay_tick();
        }
    }

    fn commit(&self, wal: Vec<WalEntry>, dirty: bool) {
        for entry in wal {
            self.journal.append(entry);
        }
        if dirty {
            self.journal.schedule_checkpoint();
        }
    }

    fn observe(&self) {
        let state = self.ctx.read();
        let trust: Vec<f64> = state.trust.values().copied().collect();
        if !trust.is_empty() {
            self.metrics
                .avg_trust
                .set(trust.iter().sum::<f64>() / trust.len() as f64);
        }
        self.metrics.quarantined_nodes.set(
            state
                .quarantine
                .values()
                .filter(|q| q.active)
                .count() as f64,
        );
        self.metrics
            .adaptive_threshold
            .set(self.adaptive_threshold_for(&state));
    }
}

fn median_of_sorted(values: &[f64]) -> f64 {
    let n = values.len();
    if n % 2 == 1 {
        values[n / 2]
    } else {
        (values[n / 2 - 1] + values[n / 2]) / 2.0
    }
}
