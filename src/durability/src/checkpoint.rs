//! Atomic checkpoint file
//!
//! Written to a temporary sibling and renamed into place so a crash mid
//! write leaves the previous checkpoint intact. Loading salvages each
//! field independently: a malformed quarantine map resets quarantine, it
//! does not discard trust.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::Write;
use std::path::Path;
use tracing::warn;
use vigil_core::{
    ActivityRecord, NodeName, NodeState, QuarantineStatus, ReputationRecord,
};

/// Durable fields of a node, exactly what survives a restart.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CheckpointDoc {
    pub trust: HashMap<NodeName, f64>,
    pub strikes: HashMap<NodeName, u32>,
    pub stats: HashMap<NodeName, ActivityRecord>,
    pub quarantine: HashMap<NodeName, QuarantineStatus>,
    pub reputation: HashMap<NodeName, ReputationRecord>,
    pub last_trust_update: HashMap<NodeName, f64>,
    pub state_version: u64,
    /// Wall-clock time of the write; WAL replay skips trust and strike
    /// entries already captured here.
    #[serde(default)]
    pub saved_at: f64,
}

impl CheckpointDoc {
    pub fn from_state(state: &NodeState) -> Self {
        Self {
            trust: state.trust.clone(),
            strikes: state.strikes.clone(),
            stats: state.stats.clone(),
            quarantine: state.quarantine.clone(),
            reputation: state.reputation.records().clone(),
            last_trust_update: state.last_trust_update.clone(),
            state_version: state.version,
            saved_at: vigil_core::unix_now(),
        }
    }

    pub fn apply_to(&self, state: &mut NodeState) {
        state.trust = self.trust.clone();
        state.strikes = self.strikes.clone();
        state.stats = self.stats.clone();
        state.quarantine = self.quarantine.clone();
        state.reputation.replace(self.reputation.clone());
        state.last_trust_update = self.last_trust_update.clone();
        state.version = self.state_version;
    }
}

/// Write the checkpoint atomically: tmp file, fsync, rename.
pub fn write_atomic(path: &Path, doc: &CheckpointDoc) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("tmp");
    {
        let mut file = std::fs::File::create(&tmp)?;
        file.write_all(serde_json::to_string_pretty(doc)?.as_bytes())?;
        file.sync_all()?;
    }
    std::fs::rename(&tmp, path)?;
    Ok(())
}

/// Load the checkpoint if one exists. Individual fields that fail to
/// parse fall back to their defaults instead of poisoning the load.
pub fn load(path: &Path) -> Option<CheckpointDoc> {
    let raw = std::fs::read_to_string(path).ok()?;
    let value: serde_json::Value = match serde_json::from_str(&raw) {
        Ok(value) => value,
        Err(err) => {
            warn!(path = %path.display(), %err, "checkpoint unreadable, starting fresh");
            return Some(CheckpointDoc::default());
        }
    };

    fn field<T: serde::de::DeserializeOwned + Default>(
        value: &serde_json::Value,
        name: &str,
    ) -> T {
        match value.get(name) {
            None => T::default(),
            Some(raw) => match serde_json::from_value(raw.clone()) {
                Ok(parsed) => parsed,
                Err(err) => {
                    warn!(field = name, %err, "checkpoint field malformed, reset to default");
                    T::default()
                }
            },
        }
    }

    Some(CheckpointDoc {
        trust: field(&value, "trust"),
        strikes: field(&value, "strikes"),
        stats: field(&value, "stats"),
        quarantine: field(&value, "quarantine"),
        reputation: field(&value, "reputation"),
        last_trust_update: field(&value, "last_trust_update"),
        state_version: field(&value, "state_version"),
        saved_at: field(&value, "saved_at"),
    })
}
