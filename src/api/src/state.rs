//! Shared handler state

use prometheus::Registry;
use std::sync::Arc;
use vigil_consensus::Coordinator;
use vigil_core::{AttackProfile, NodeContext};
use vigil_durability::Durability;
use vigil_net::PeerClient;
use vigil_trust::TrustEngine;

#[derive(Clone)]
pub struct AppState {
    pub ctx: Arc<NodeContext>,
    pub trust: Arc<TrustEngine>,
    pub durability: Arc<Durability>,
    pub coordinator: Arc<Coordinator>,
    pub client: Arc<PeerClient>,
    /// Present only on adversarial test nodes.
    pub attack: Option<AttackProfile>,
    pub registry: Arc<Registry>,
}
