//! Prometheus gauges for the trust subsystem
//!
//! Registered on an explicit registry owned by the node so repeated
//! engine construction in one process never collides.

use crate::error::Result;
use prometheus::{Gauge, Opts, Registry};

pub struct TrustMetrics {
    /// Mean trust across known nodes.
    pub avg_trust: Gauge,

    /// Nodes currently excluded from voting.
    pub quarantined_nodes: Gauge,

    /// Current adaptive quorum threshold.
    pub adaptive_threshold: Gauge,
}

impl TrustMetrics {
    pub fn register(registry: &Registry) -> Result<Self> {
        let avg_trust = Gauge::with_opts(Opts::new(
            "vigil_trust_average",
            "Mean trust score across known nodes",
        ))?;
        let quarantined_nodes = Gauge::with_opts(Opts::new(
            "vigil_quarantined_nodes",
            "Number of nodes currently quarantined",
        ))?;
        let adaptive_threshold = Gauge::with_opts(Opts::new(
            "vigil_adaptive_threshold",
            "Current weighted-quorum threshold",
        ))?;

        registry.register(Box::new(avg_trust.clone()))?;
        registry.register(Box::new(quarantined_nodes.clone()))?;
        registry.register(Box::new(adaptive_threshold.clone()))?;

        Ok(Self {
            avg_trust,
            quarantined_nodes,
            adaptive_threshold,
        })
    }
}
