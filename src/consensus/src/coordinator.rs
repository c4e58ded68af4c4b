//! Case coordinator
//!
//! Drives one incident at a time through its full lifecycle. Peer
//! failures never abort a case: a peer that cannot be reached simply has
//! not voted, and the window closing without quorum is itself a verdict
//! that costs the proposer a strike.

use crate::error::Result;
use crate::metrics::ConsensusMetrics;
use prometheus::Registry;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;
use vigil_core::{
    unix_now, AlertRequest, CaseResult, EventRecord, IncidentPayload, Journal, NodeContext,
    NodeName, PendingCase, ProcessScanner, ProposeRequest, WalEntry,
};
use vigil_net::PeerClient;
use vigil_trust::TrustEngine;

#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Length of the voting window.
    pub vote_timeout: Duration,
    /// Spacing between quorum checks inside the window.
    pub poll_interval: Duration,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            vote_timeout: Duration::from_secs(6),
            poll_interval: Duration::from_millis(400),
        }
    }
}

pub struct Coordinator {
    ctx: Arc<NodeContext>,
    trust: Arc<TrustEngine>,
    journal: Arc<dyn Journal>,
    client: Arc<PeerClient>,
    scanner: Arc<dyn ProcessScanner>,
    config: CoordinatorConfig,
    metrics: ConsensusMetrics,
}

impl Coordinator {
    pub fn new(
        ctx: Arc<NodeContext>,
        trust: Arc<TrustEngine>,
        journal: Arc<dyn Journal>,
        client: Arc<PeerClient>,
        scanner: Arc<dyn ProcessScanner>,
        config: CoordinatorConfig,
        registry: &Registry,
    ) -> Result<Self> {
        let metrics = ConsensusMetrics::register(registry)?;
        Ok(Self {
            ctx,
            trust,
            journal,
            client,
            scanner,
            config,
            metrics,
        })
    }

    pub fn metrics(&self) -> &ConsensusMetrics {
        &self.metrics
    }

    /// Run one incident to completion. Returns the final verdict, or
    /// `None` when the node is not allowed to propose.
    pub async fn run_case(&self, payload: IncidentPayload) -> Option<CaseResult> {
        if self.ctx.is_self_quarantined() {
            warn!(process = %payload.process, "self-quarantined, refusing to propose");
            return None;
        }
        if self.ctx.recovery_mode() {
            debug!(process = %payload.process, "in recovery, refusing to propose");
            return None;
        }

        let case_id = Uuid::new_v4().to_string();
        let start_time = unix_now();
        let name = self.ctx.name().to_string();

        {
            let mut state = self.ctx.write();
            let mut votes = HashMap::new();
            votes.insert(name.clone(), true);
            state.pending_cases.insert(
                case_id.clone(),
                PendingCase {
                    payload: payload.clone(),
                    start_time,
                    votes,
                },
            );
        }
        self.journal.append(WalEntry::PendingCase {
            case_id: case_id.clone(),
            payload: payload.clone(),
            start_time,
        });
        self.metrics.cases_proposed.inc();
        info!(
            case_id = %case_id,
            process = %payload.process,
            pid = payload.pid,
            cpu = payload.cpu,
            "incident proposed"
        );

        let req = ProposeRequest::from_incident(&case_id, &payload, start_time);
        self.client.broadcast_propose(self.ctx.peers(), &req).await;

        let won = self.voting_window(&case_id, &payload).await;

        let result = match won {
            Some(weighted) => {
                let record = EventRecord {
                    case_id: case_id.clone(),
                    process: payload.process.clone(),
                    node: name.clone(),
                    result: CaseResult::Terminated,
                    weighted,
                    time: unix_now(),
                    start_time,
                };
                self.ctx.write().push_event(record.clone());
                self.journal.append(WalEntry::Event { record });
                self.metrics.cases_terminated.inc();

                let alert = AlertRequest {
                    case_id: case_id.clone(),
                    node: name.clone(),
                    result: CaseResult::Terminated,
                    process: payload.process.clone(),
                };
                self.client.broadcast_alert(self.ctx.peers(), &alert).await;
                CaseResult::Terminated
            }
            None => {
                let weighted = self.current_weighted_sum(&case_id);
                self.trust.penalize_self_rejection();
                let record = EventRecord {
                    case_id: case_id.clone(),
                    process: payload.process.clone(),
                    node: name.clone(),
                    result: CaseResult::Rejected,
                    weighted,
                    time: unix_now(),
                    start_time,
                };
                self.ctx.write().push_event(record.clone());
                self.journal.append(WalEntry::Event { record });
                self.metrics.cases_rejected.inc();
                info!(case_id = %case_id, weighted, "no quorum, case rejected");
                CaseResult::Rejected
            }
        };

        self.ctx.write().pending_cases.remove(&case_id);
        self.journal.schedule_checkpoint();
        self.journal.compact_after_case();
        Some(result)
    }

    /// Poll the vote set until quorum or the window closes. Returns the
    /// winning weighted sum, if any.
    async fn voting_window(&self, case_id: &str, payload: &IncidentPayload) -> Option<f64> {
        let deadline = tokio::time::Instant::now() + self.config.vote_timeout;

        while tokio::time::Instant::now() < deadline {
            tokio::time::sleep(self.config.poll_interval).await;

            let votes = {
                let state = self.ctx.read();
                match state.pending_cases.get(case_id) {
                    Some(case) => case.votes.clone(),
                    None => return None,
                }
            };
            let weighted = self.trust.weighted_vote_sum(&votes);
            let threshold = self.trust.adaptive_threshold();
            debug!(case_id, weighted, threshold, votes = votes.len(), "quorum check");

            if weighted >= threshold {
                let outcome = self.scanner.kill(payload.pid).await;
                // Not-found and access-denied both count as success: the
                // process is gone or beyond our reach either way.
                info!(
                    case_id,
                    pid = payload.pid,
                    ?outcome,
                    weighted,
                    "quorum reached, process terminated"
                );
                return Some(weighted);
            }
        }
        None
    }

    fn current_weighted_sum(&self, case_id: &str) -> f64 {
        let votes = {
            let state = self.ctx.read();
            match state.pending_cases.get(case_id) {
                Some(case) => case.votes.clone(),
                None => return 0.0,
            }
        };
        self.trust.weighted_vote_sum(&votes)
    }

    /// Record a peer's vote against a pending case. Duplicate votes from
    /// one voter overwrite; votes for unknown cases only count as
    /// activity.
    pub fn record_vote(&self, case_id: &str, from: &NodeName, vote: bool) {
        let mut state = self.ctx.write();
        state.touch_activity(from, true);
        if let Some(case) = state.pending_cases.get_mut(case_id) {
            case.votes.insert(from.clone(), vote);
            debug!(case_id, from = %from, vote, "vote recorded");
        } else {
            debug!(case_id, from = %from, "vote for unknown case");
        }
        self.metrics.votes_received.inc();
    }
}
