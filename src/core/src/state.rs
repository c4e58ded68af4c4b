//! Node state model
//!
//! One `NodeState` per process holds everything a node knows about itself
//! and its peers: trust scores, strike counters, quarantine intervals,
//! vote activity, the reputation ledger, in-flight cases and the bounded
//! event log. Peer rows are shadow copies updated by alerts, votes and
//! replica sync; no node writes another node's canonical record directly.

use crate::clock::unix_now;
use crate::{NodeName, DEFAULT_TRUST, MAX_EVENTS, SNAPSHOT_EVENT_TAIL};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};

/// Outcome of a finalized case, as broadcast in alerts and event records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaseResult {
    Terminated,
    Allowed,
    Rejected,
}

/// Per-node reputation counters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReputationRecord {
    pub total: u64,
    pub success: u64,
    #[serde(rename = "false")]
    pub false_calls: u64,
    pub last_activity: f64,
}

impl ReputationRecord {
    /// Historical accuracy; a node with no history is trusted at 1.0.
    pub fn accuracy(&self) -> f64 {
        if self.total == 0 {
            1.0
        } else {
            self.success as f64 / self.total as f64
        }
    }
}

/// Reputation record augmented with its derived accuracy, as served by
/// the `/reputation` endpoint and embedded in snapshots for display.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReputationEntry {
    pub total: u64,
    pub success: u64,
    #[serde(rename = "false")]
    pub false_calls: u64,
    pub last_activity: f64,
    pub accuracy: f64,
}

/// Ledger of success/false counters per known node.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReputationBook {
    records: HashMap<NodeName, ReputationRecord>,
}

impl ReputationBook {
    fn ensure(&mut self, node: &str) -> &mut ReputationRecord {
        self.records
            .entry(node.to_string())
            .or_insert_with(|| ReputationRecord {
                last_activity: unix_now(),
                ..Default::default()
            })
    }

    pub fn record_success(&mut self, node: &str) {
        let rec = self.ensure(node);
        rec.total += 1;
        rec.success += 1;
        rec.last_activity = unix_now();
    }

    pub fn record_false(&mut self, node: &str) {
        let rec = self.ensure(node);
        rec.total += 1;
        rec.false_calls += 1;
        rec.last_activity = unix_now();
    }

    /// Accuracy of `node`; unseen nodes score exactly 1.0.
    pub fn accuracy(&self, node: &str) -> f64 {
        self.records.get(node).map_or(1.0, ReputationRecord::accuracy)
    }

    /// The ledger with accuracy attached, rounded to three decimals.
    pub fn snapshot(&self) -> HashMap<NodeName, ReputationEntry> {
        self.records
            .iter()
            .map(|(node, rec)| {
                (
                    node.clone(),
                    ReputationEntry {
                        total: rec.total,
                        success: rec.success,
                        false_calls: rec.false_calls,
                        last_activity: rec.last_activity,
                        accuracy: (rec.accuracy() * 1000.0).round() / 1000.0,
                    },
                )
            })
            .collect()
    }

    /// Replace the per-node records wholesale (restore path).
    pub fn replace(&mut self, records: HashMap<NodeName, ReputationRecord>) {
        self.records = records;
    }

    /// Field-wise maximum merge used by replica sync.
    pub fn merge_max(&mut self, remote: &HashMap<NodeName, ReputationRecord>) {
        for (node, theirs) in remote {
            let ours = self.ensure(node);
            ours.total = ours.total.max(theirs.total);
            ours.success = ours.success.max(theirs.success);
            ours.false_calls = ours.false_calls.max(theirs.false_calls);
            ours.last_activity = ours.last_activity.max(theirs.last_activity);
        }
    }

    pub fn records(&self) -> &HashMap<NodeName, ReputationRecord> {
        &self.records
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Quarantine interval for one node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuarantineStatus {
    pub active: bool,
    pub until: f64,
}

/// Vote participation counters for one node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActivityRecord {
    pub votes: u64,
    pub last_activity: f64,
}

/// Incident handed from the detector to the coordinator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncidentPayload {
    pub from: NodeName,
    pub process: String,
    pub pid: u32,
    pub cpu: f64,
    pub time: f64,
}

/// A case awaiting quorum on the proposing node.
#[derive(Debug, Clone)]
pub struct PendingCase {
    pub payload: IncidentPayload,
    pub start_time: f64,
    pub votes: HashMap<NodeName, bool>,
}

/// Entry in the bounded event log, also the record peers see via `/events`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub case_id: String,
    pub process: String,
    pub node: NodeName,
    pub result: CaseResult,
    pub weighted: f64,
    pub time: f64,
    pub start_time: f64,
}

/// Full durable + transient state of one node.
#[derive(Debug, Clone, Default)]
pub struct NodeState {
    pub trust: HashMap<NodeName, f64>,
    pub strikes: HashMap<NodeName, u32>,
    pub quarantine: HashMap<NodeName, QuarantineStatus>,
    pub stats: HashMap<NodeName, ActivityRecord>,
    pub reputation: ReputationBook,
    pub pending_cases: HashMap<String, PendingCase>,
    pub events: VecDeque<EventRecord>,
    pub last_trust_update: HashMap<NodeName, f64>,
    pub version: u64,
}

impl NodeState {
    pub fn trust_of(&self, node: &str) -> f64 {
        self.trust.get(node).copied().unwrap_or(DEFAULT_TRUST)
    }

    pub fn is_quarantined(&self, node: &str) -> bool {
        self.quarantine.get(node).map_or(false, |q| q.active)
    }

    /// Nodes currently allowed to participate in voting.
    pub fn active_nodes(&self) -> Vec<NodeName> {
        self.trust
            .keys()
            .filter(|n| !self.is_quarantined(n))
            .cloned()
            .collect()
    }

    /// Seed default rows for every configured node without overwriting
    /// anything already loaded from disk.
    pub fn ensure_defaults<'a>(&mut self, nodes: impl IntoIterator<Item = &'a NodeName>) {
        for node in nodes {
            self.trust.entry(node.clone()).or_insert(DEFAULT_TRUST);
            self.strikes.entry(node.clone()).or_insert(0);
            self.quarantine.entry(node.clone()).or_default();
        }
    }

    /// Record an activity touch for `node`, bumping the vote counter when
    /// `voted` is set.
    pub fn touch_activity(&mut self, node: &str, voted: bool) {
        let rec = self.stats.entry(node.to_string()).or_default();
        if voted {
            rec.votes += 1;
        }
        rec.last_activity = unix_now();
    }

    /// Append an event and trim the log to its bound.
    pub fn push_event(&mut self, event: EventRecord) {
        self.events.push_back(event);
        while self.events.len() > MAX_EVENTS {
            self.events.pop_front();
        }
    }

    /// Clone the shareable state into a snapshot for peers.
    pub fn snapshot(&self, node: &str) -> StateSnapshot {
        let tail = self
            .events
            .iter()
            .rev()
            .take(SNAPSHOT_EVENT_TAIL)
            .cloned()
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect();

        StateSnapshot {
            node: node.to_string(),
            trust: self.trust.clone(),
            strikes: self.strikes.clone(),
            quarantined: self.quarantine.clone(),
            node_stats: self.stats.clone(),
            reputation: self.reputation.records().clone(),
            events: tail,
            timestamp: unix_now(),
            version: self.version,
        }
    }

    /// Authoritative replace from a peer or controller snapshot. Pending
    /// cases are local-only and survive untouched.
    pub fn apply_snapshot(&mut self, snap: &StateSnapshot) {
        self.trust = snap.trust.clone();
        self.strikes = snap.strikes.clone();
        self.quarantine = snap.quarantined.clone();
        self.stats = snap.node_stats.clone();
        self.reputation.replace(snap.reputation.clone());
        self.events = snap.events.iter().cloned().collect();
        while self.events.len() > MAX_EVENTS {
            self.events.pop_front();
        }
        self.version = self.version.max(snap.version);
    }

    /// Replica-sync merge: keep the higher trust and strike values, adopt
    /// the remote quarantine view, prefer local activity rows, take the
    /// field-wise maximum of reputation counters and extend the event log.
    pub fn merge_snapshot(&mut self, snap: &StateSnapshot) {
        for (node, &remote) in &snap.trust {
            let local = self.trust.entry(node.clone()).or_insert(remote);
            if remote > *local {
                *local = remote;
            }
        }
        for (node, &remote) in &snap.strikes {
            let local = self.strikes.entry(node.clone()).or_insert(remote);
            if remote > *local {
                *local = remote;
            }
        }
        for (node, q) in &snap.quarantined {
            self.quarantine.insert(node.clone(), q.clone());
        }
        for (node, rec) in &snap.node_stats {
            self.stats.entry(node.clone()).or_insert_with(|| rec.clone());
        }
        self.reputation.merge_max(&snap.reputation);

        let known: std::collections::HashSet<_> = self
            .events
            .iter()
            .map(|e| (e.case_id.clone(), e.node.clone(), e.time.to_bits()))
            .collect();
        for event in &snap.events {
            if !known.contains(&(event.case_id.clone(), event.node.clone(), event.time.to_bits())) {
                self.events.push_back(event.clone());
            }
        }
        while self.events.len() > MAX_EVENTS {
            self.events.pop_front();
        }
        self.version = self.version.max(snap.version);
    }
}

/// Serialized view of a node's durable state, exchanged over
/// `/state/snapshot` and `/state/restore`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateSnapshot {
    pub node: NodeName,
    pub trust: HashMap<NodeName, f64>,
    pub strikes: HashMap<NodeName, u32>,
    pub quarantined: HashMap<NodeName, QuarantineStatus>,
    pub node_stats: HashMap<NodeName, ActivityRecord>,
    pub reputation: HashMap<NodeName, ReputationRecord>,
    pub events: Vec<EventRecord>,
    pub timestamp: f64,
    #[serde(default)]
    pub version: u64,
}
