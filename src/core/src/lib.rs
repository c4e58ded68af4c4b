//! Shared data model for the Vigil host-security fabric
//!
//! Every node in the fabric keeps shadow copies of its peers' trust,
//! strike, reputation and quarantine records, keyed by node name. This
//! crate owns that state model, the wire messages exchanged between
//! peers, the write-ahead-log schema, and the contracts the other crates
//! plug into:
//!
//! - [`NodeContext`]: the single-lock state container every subsystem
//!   shares
//! - [`Journal`]: the seam through which mutations reach the durability
//!   layer
//! - [`ProcessScanner`]: the host process scanner collaborator

pub mod attack;
pub mod clock;
pub mod context;
pub mod digest;
pub mod journal;
pub mod messages;
pub mod scanner;
pub mod state;

pub use attack::AttackProfile;
pub use clock::unix_now;
pub use context::NodeContext;
pub use digest::stable_trust_hash;
pub use journal::{Journal, NullJournal, WalEntry};
pub use messages::{
    Ack, AlertRequest, IncidentPayload, PenalizeRequest, ProposeRequest, QuarantineRequest,
    RecoverRequest, ReputationResponse, StateDigest, StatusResponse, VoteRequest,
};
pub use scanner::{KillOutcome, ProcessSample, ProcessScanner};
pub use state::{
    ActivityRecord, CaseResult, EventRecord, NodeState, PendingCase, QuarantineStatus,
    ReputationBook, ReputationEntry, ReputationRecord, StateSnapshot,
};

/// Node identity: a stable, configuration-assigned name.
pub type NodeName = String;

/// Trust score assigned to a node that has never been observed.
pub const DEFAULT_TRUST: f64 = 1.0;

/// Lower clamp for any trust score.
pub const MIN_TRUST: f64 = 0.1;

/// Upper clamp for any trust score.
pub const MAX_TRUST: f64 = 2.0;

/// Bound on the in-memory event log.
pub const MAX_EVENTS: usize = 50;

/// Number of trailing events included in a state snapshot.
pub const SNAPSHOT_EVENT_TAIL: usize = 20;
