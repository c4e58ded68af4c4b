//! Incident consensus for the Vigil fabric
//!
//! A node never remediates on its own observation. The detector turns
//! scanner output into incident payloads; the coordinator drives each
//! incident through a case:
//!
//! 1. Record the case locally with a self-vote and a WAL entry
//! 2. Fan `/propose` out to every peer, best effort
//! 3. Poll the vote set against the adaptive trust-weighted threshold
//! 4. Terminate the process on quorum, abandon with a self-penalty on
//!    timeout
//! 5. Broadcast the final outcome and compact the WAL

pub mod coordinator;
pub mod detector;
pub mod error;
pub mod metrics;

pub use coordinator::{Coordinator, CoordinatorConfig};
pub use detector::{Detector, DetectorConfig};
pub use error::{ConsensusError, Result};
pub use metrics::ConsensusMetrics;
