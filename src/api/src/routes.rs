//! Route table for the peer endpoint

use crate::{handlers, state::AppState};
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Consensus protocol
        .route("/propose", post(handlers::propose))
        .route("/vote", post(handlers::vote))
        .route("/alert", post(handlers::alert))
        // Governance
        .route("/governance/penalize", post(handlers::governance_penalize))
        .route("/governance/quarantine", post(handlers::governance_quarantine))
        // Read-only views
        .route("/status", get(handlers::status))
        .route("/events", get(handlers::events))
        .route("/reputation", get(handlers::reputation))
        .route("/metrics", get(handlers::metrics))
        // State transfer
        .route("/state/snapshot", get(handlers::state_snapshot))
        .route("/state/digest", get(handlers::state_digest))
        .route("/state/restore", post(handlers::state_restore))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
