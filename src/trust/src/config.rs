//! Trust engine tuning

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// All trust dynamics in one place. The defaults are the fabric-wide
/// operating point; tests shrink the intervals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrustConfig {
    /// Reward applied on a confirmed termination.
    pub reward: f64,

    /// Penalty applied on a false or rejected outcome.
    pub penalty: f64,

    /// Per-tick decay for idle low performers.
    pub decay_rate: f64,

    /// Hard cap on any single raw delta.
    pub max_delta: f64,

    /// EMA smoothing factor blending target into current.
    pub ema_alpha: f64,

    /// Minimum seconds between trust changes for one node.
    pub cooldown_secs: f64,

    /// Base weighted-quorum requirement.
    pub weight_threshold: f64,

    /// Floor of the adaptive threshold.
    pub threshold_floor: f64,

    /// Trust below this value forces quarantine.
    pub quarantine_threshold: f64,

    /// Quarantine duration in seconds.
    pub quarantine_secs: f64,

    /// Strike count that forces quarantine.
    pub max_strikes: u32,

    /// Inactivity window before decay applies, in seconds.
    pub inactivity_secs: f64,

    /// Period of the decay loop.
    pub decay_interval: Duration,

    /// Period of the quarantine watchdog.
    pub watchdog_interval: Duration,
}

impl Default for TrustConfig {
    fn default() -> Self {
        Self {
            reward: 0.06,
            penalty: 0.12,
            decay_rate: 0.03,
            max_delta: 0.08,
            ema_alpha: 0.4,
            cooldown_secs: 10.0,
            weight_threshold: 2.0,
            threshold_floor: 1.5,
            quarantine_threshold: 0.35,
            quarantine_secs: 180.0,
            max_strikes: 3,
            inactivity_secs: 120.0,
            decay_interval: Duration::from_secs(20),
            watchdog_interval: Duration::from_secs(5),
        }
    }
}
