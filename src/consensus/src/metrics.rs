//! Prometheus counters for case flow

use crate::error::Result;
use prometheus::{IntCounter, Opts, Registry};

pub struct ConsensusMetrics {
    /// Cases this node has proposed.
    pub cases_proposed: IntCounter,

    /// Cases that reached quorum and terminated a process.
    pub cases_terminated: IntCounter,

    /// Cases abandoned without quorum.
    pub cases_rejected: IntCounter,

    /// Votes received from peers.
    pub votes_received: IntCounter,
}

impl ConsensusMetrics {
    pub fn register(registry: &Registry) -> Result<Self> {
        let cases_proposed = IntCounter::with_opts(Opts::new(
            "vigil_cases_proposed_total",
            "Cases proposed by this node",
        ))?;
        let cases_terminated = IntCounter::with_opts(Opts::new(
            "vigil_cases_terminated_total",
            "Cases that reached quorum and terminated a process",
        ))?;
        let cases_rejected = IntCounter::with_opts(Opts::new(
            "vigil_cases_rejected_total",
            "Cases abandoned without quorum",
        ))?;
        let votes_received = IntCounter::with_opts(Opts::new(
            "vigil_votes_received_total",
            "Peer votes received",
        ))?;

        registry.register(Box::new(cases_proposed.clone()))?;
        registry.register(Box::new(cases_terminated.clone()))?;
        registry.register(Box::new(cases_rejected.clone()))?;
        registry.register(Box::new(votes_received.clone()))?;

        Ok(Self {
            cases_proposed,
            cases_terminated,
            cases_rejected,
            votes_received,
        })
    }
}
