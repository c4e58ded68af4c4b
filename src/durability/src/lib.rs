//! Crash durability and state recovery
//!
//! Two artifacts on disk per node: an atomically replaced JSON checkpoint
//! and an append-only WAL of mutations since the last checkpoint. On
//! startup the checkpoint is loaded, the WAL replayed, and stale pending
//! cases dropped. Two recovery paths rebuild a node whose state is gone:
//! a controller-pushed restore and a pull-based peer quorum restore. A
//! replica-sync loop keeps healthy nodes converged by version.

pub mod checkpoint;
pub mod error;
pub mod recovery;
pub mod store;
pub mod sync;
pub mod wal;

pub use checkpoint::CheckpointDoc;
pub use error::{DurabilityError, Result};
pub use recovery::{choose_quorum_snapshot, RecoveryConfig, SelfRecovery};
pub use store::{Durability, DurabilityConfig};
pub use sync::{ReplicaSync, SyncConfig};
pub use wal::Wal;
