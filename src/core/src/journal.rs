//! Write-ahead-log schema and the journal seam
//!
//! Mutation sites hand the durability layer one record per change. Trust
//! and strike entries carry the resulting absolute value rather than the
//! delta, so replaying an entry that was already captured by a checkpoint
//! converges instead of double-applying.

use crate::state::{EventRecord, IncidentPayload};
use crate::NodeName;
use serde::{Deserialize, Serialize};

/// One record in the append-only WAL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WalEntry {
    TrustUpdate {
        node: NodeName,
        value: f64,
        time: f64,
    },
    StrikeUpdate {
        node: NodeName,
        strikes: u32,
        time: f64,
    },
    Event {
        record: EventRecord,
    },
    PendingCase {
        case_id: String,
        payload: IncidentPayload,
        start_time: f64,
    },
}

/// Sink for state mutations. Implemented by the durability layer; the
/// trust engine and coordinator only ever see this trait.
///
/// Both operations are deliberately infallible at the seam: persistence
/// failures are logged by the implementation and retried on the next
/// mutation rather than propagated into protocol handling.
pub trait Journal: Send + Sync {
    /// Append one record to the WAL.
    fn append(&self, entry: WalEntry);

    /// Mark durable state dirty so the next checkpoint flush picks it up.
    fn schedule_checkpoint(&self);

    /// Hook invoked after a case finalizes; the durability layer uses it
    /// to compact the WAL once the event log is large enough.
    fn compact_after_case(&self) {}
}

/// Journal that drops everything, for tests and ephemeral nodes.
#[derive(Debug, Default)]
pub struct NullJournal;

impl Journal for NullJournal {
    fn append(&self, _entry: WalEntry) {}
    fn schedule_checkpoint(&self) {}
}
