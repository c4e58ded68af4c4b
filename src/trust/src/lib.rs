//! Adaptive trust and reputation engine
//!
//! Every peer interaction feeds back into a per-node trust scalar through
//! one pipeline: freeze gate, per-node cooldown, delta clamp, range clamp,
//! EMA blend. Strikes, reputation accuracy and the quarantine lifecycle
//! hang off the same updates, and the cluster-wide average trust drives
//! the adaptive quorum threshold:
//!
//! - healthy cluster (avg trust 1.0): threshold sits at the configured
//!   base weight
//! - degraded cluster: the bar rises, but never above the number of
//!   non-quarantined nodes

pub mod config;
pub mod engine;
pub mod error;
pub mod metrics;

pub use config::TrustConfig;
pub use engine::TrustEngine;
pub use error::{Result, TrustError};
pub use metrics::TrustMetrics;
