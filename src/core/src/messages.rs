//! Wire messages exchanged between peers
//!
//! Every endpoint has an explicit request/response schema; malformed
//! bodies are rejected at the extractor and never reach state.

use crate::state::{ActivityRecord, CaseResult, QuarantineStatus, ReputationEntry};
use crate::NodeName;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub use crate::state::IncidentPayload;

/// `POST /propose`: a coordinator asks this node to vote on a case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProposeRequest {
    pub case_id: String,
    pub from: NodeName,
    pub process: String,
    pub pid: u32,
    pub cpu: f64,
    pub time: f64,
    pub start_time: f64,
}

impl ProposeRequest {
    pub fn from_incident(case_id: &str, payload: &IncidentPayload, start_time: f64) -> Self {
        Self {
            case_id: case_id.to_string(),
            from: payload.from.clone(),
            process: payload.process.clone(),
            pid: payload.pid,
            cpu: payload.cpu,
            time: payload.time,
            start_time,
        }
    }
}

/// `POST /vote`: a peer's verdict on a pending case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoteRequest {
    pub case_id: String,
    pub from: NodeName,
    pub vote: bool,
}

/// `POST /alert`: the proposer's final outcome broadcast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertRequest {
    pub case_id: String,
    pub node: NodeName,
    pub result: CaseResult,
    pub process: String,
}

/// `POST /governance/penalize`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PenalizeRequest {
    pub node: NodeName,
    pub penalty: f64,
}

/// `POST /governance/quarantine`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuarantineRequest {
    pub node: NodeName,
    /// Quarantine duration in seconds.
    pub duration: f64,
}

/// Minimal acknowledgement body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ack {
    pub status: String,
}

impl Ack {
    pub fn ok() -> Self {
        Self { status: "ok".into() }
    }

    pub fn ignored() -> Self {
        Self { status: "ignored".into() }
    }

    pub fn restored() -> Self {
        Self { status: "restored".into() }
    }
}

/// `GET /status`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub node: NodeName,
    pub trust: HashMap<NodeName, f64>,
    pub strikes: HashMap<NodeName, u32>,
    pub active_cases: usize,
    pub quarantined: HashMap<NodeName, QuarantineStatus>,
    pub adaptive_quorum: f64,
    pub version: u64,
}

/// `GET /reputation`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReputationResponse {
    pub node_stats: HashMap<NodeName, ActivityRecord>,
    pub engine: HashMap<NodeName, ReputationEntry>,
}

/// `GET /state/digest`: cheap comparison handle for replica sync.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateDigest {
    pub node: NodeName,
    pub version: u64,
    pub timestamp: f64,
    pub trust_hash: String,
}

/// `POST /cluster/recover`: last-resort plea to the administrative
/// controller when no peer snapshot is reachable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecoverRequest {
    pub node: NodeName,
    pub reason: String,
}
