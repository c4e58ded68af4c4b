//! Adversarial test harness configuration
//!
//! Attack behaviors exist to exercise the trust and quarantine machinery
//! under misbehaving peers. They are fixed at startup by configuration
//! and cannot be toggled at runtime; a node built without an attack
//! profile behaves honestly on every path.

use serde::{Deserialize, Serialize};

/// Probabilities for each misbehavior, rolled independently per message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttackProfile {
    /// Invert the vote before sending it back.
    pub vote_flip_prob: f64,
    /// Forge an incoming alert's result before processing.
    pub false_alert_prob: f64,
    /// Drop an incoming propose without voting.
    pub skip_vote_prob: f64,
    /// Hold the vote back before sending.
    pub delay_vote_prob: f64,
    /// Delay applied when a vote is held back, in seconds.
    pub delay_seconds: f64,
    /// Report a healthy process as suspicious in the detector.
    pub false_propose_prob: f64,
}

impl Default for AttackProfile {
    fn default() -> Self {
        Self {
            vote_flip_prob: 0.6,
            false_alert_prob: 0.4,
            skip_vote_prob: 0.2,
            delay_vote_prob: 0.3,
            delay_seconds: 5.0,
            false_propose_prob: 0.35,
        }
    }
}

impl AttackProfile {
    fn roll(p: f64) -> bool {
        p > 0.0 && rand::random::<f64>() < p
    }

    pub fn flip_vote(&self) -> bool {
        Self::roll(self.vote_flip_prob)
    }

    pub fn forge_alert(&self) -> bool {
        Self::roll(self.false_alert_prob)
    }

    pub fn skip_vote(&self) -> bool {
        Self::roll(self.skip_vote_prob)
    }

    pub fn delay_vote(&self) -> bool {
        Self::roll(self.delay_vote_prob)
    }

    pub fn false_propose(&self) -> bool {
        Self::roll(self.false_propose_prob)
    }
}
