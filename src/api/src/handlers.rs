//! Endpoint handlers
//!
//! Protocol handlers acknowledge promptly; anything slow (voting back,
//! alert processing side effects) happens behind the response. A node in
//! recovery mode or self-quarantine acknowledges proposals and votes
//! without acting on them.

use crate::error::{ApiError, Result};
use crate::state::AppState;
use axum::{extract::State, Json};
use prometheus::{Encoder, TextEncoder};
use tracing::{debug, info, warn};
use vigil_core::{
    stable_trust_hash, unix_now, Ack, AlertRequest, CaseResult, EventRecord, PenalizeRequest,
    ProposeRequest, QuarantineRequest, ReputationResponse, StateDigest, StateSnapshot,
    StatusResponse, VoteRequest,
};

/// `POST /propose`: vote on a peer's case. Honest nodes always vote yes;
/// the accuracy judgment lives in reputation weighting, not in
/// re-inspecting someone else's process table.
pub async fn propose(State(state): State<AppState>, Json(req): Json<ProposeRequest>) -> Json<Ack> {
    if state.ctx.recovery_mode() || state.ctx.is_self_quarantined() {
        debug!(case_id = %req.case_id, "not participating, propose ignored");
        return Json(Ack::ignored());
    }

    let mut vote = true;
    let mut delay = None;
    if let Some(attack) = &state.attack {
        if attack.skip_vote() {
            info!(case_id = %req.case_id, "attack profile skipped the vote");
            return Json(Ack::ok());
        }
        if attack.flip_vote() {
            vote = false;
        }
        if attack.delay_vote() {
            delay = Some(std::time::Duration::from_secs_f64(attack.delay_seconds));
        }
    }

    let reply = VoteRequest {
        case_id: req.case_id.clone(),
        from: state.ctx.name().to_string(),
        vote,
    };
    let client = state.client.clone();
    let proposer = req.from.clone();
    tokio::spawn(async move {
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if let Err(err) = client.vote(&proposer, &reply).await {
            warn!(proposer = %proposer, case_id = %reply.case_id, %err, "vote not delivered");
        }
    });

    Json(Ack::ok())
}

/// `POST /vote`: record a peer's verdict against a local pending case.
pub async fn vote(State(state): State<AppState>, Json(req): Json<VoteRequest>) -> Json<Ack> {
    if state.ctx.recovery_mode() || state.ctx.is_self_quarantined() {
        return Json(Ack::ignored());
    }
    state.coordinator.record_vote(&req.case_id, &req.from, req.vote);
    Json(Ack::ok())
}

/// `POST /alert`: fold the proposer's announced outcome into its trust,
/// reputation and strike records.
pub async fn alert(State(state): State<AppState>, Json(req): Json<AlertRequest>) -> Json<Ack> {
    let mut result = req.result;
    if let Some(attack) = &state.attack {
        if attack.forge_alert() {
            result = match result {
                CaseResult::Terminated => CaseResult::Rejected,
                CaseResult::Allowed | CaseResult::Rejected => CaseResult::Terminated,
            };
            info!(case_id = %req.case_id, "attack profile forged the alert result");
        }
    }

    state.trust.record_alert_outcome(&req.node, result);
    debug!(case_id = %req.case_id, node = %req.node, ?result, "alert processed");
    Json(Ack::ok())
}

/// `POST /governance/penalize`
pub async fn governance_penalize(
    State(state): State<AppState>,
    Json(req): Json<PenalizeRequest>,
) -> Json<Ack> {
    state.trust.governance_penalize(&req.node, req.penalty);
    Json(Ack::ok())
}

/// `POST /governance/quarantine`
pub async fn governance_quarantine(
    State(state): State<AppState>,
    Json(req): Json<QuarantineRequest>,
) -> Json<Ack> {
    state.trust.governance_quarantine(&req.node, req.duration);
    Json(Ack::ok())
}

/// `GET /status`
pub async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    Json(state.trust.status())
}

/// `GET /events`: tail of the bounded event log.
pub async fn events(State(state): State<AppState>) -> Json<Vec<EventRecord>> {
    let events = state.ctx.read().events.iter().cloned().collect();
    Json(events)
}

/// `GET /reputation`
pub async fn reputation(State(state): State<AppState>) -> Json<ReputationResponse> {
    let snapshot = {
        let guard = state.ctx.read();
        ReputationResponse {
            node_stats: guard.stats.clone(),
            engine: guard.reputation.snapshot(),
        }
    };
    Json(snapshot)
}

/// `GET /state/snapshot`
pub async fn state_snapshot(State(state): State<AppState>) -> Json<StateSnapshot> {
    Json(state.ctx.snapshot())
}

/// `GET /state/digest`
pub async fn state_digest(State(state): State<AppState>) -> Json<StateDigest> {
    let digest = {
        let guard = state.ctx.read();
        StateDigest {
            node: state.ctx.name().to_string(),
            version: guard.version,
            timestamp: unix_now(),
            trust_hash: stable_trust_hash(&guard.trust),
        }
    };
    Json(digest)
}

/// `POST /state/restore`: authoritative replace pushed by the
/// administrative controller.
pub async fn state_restore(
    State(state): State<AppState>,
    Json(snap): Json<StateSnapshot>,
) -> Json<Ack> {
    info!(source = %snap.node, "controller restore received");
    state.durability.apply_restore(&snap, false);
    Json(Ack::restored())
}

/// `GET /metrics`: Prometheus text exposition.
pub async fn metrics(State(state): State<AppState>) -> Result<String> {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder
        .encode(&state.registry.gather(), &mut buffer)
        .map_err(|err| ApiError::Internal(err.to_string()))?;
    String::from_utf8(buffer).map_err(|err| ApiError::Internal(err.to_string()))
}
