//! Suspicious process detector
//!
//! Polls the scanner and hands candidate incidents to the coordinator,
//! one at a time. A process is a candidate when its short-window CPU
//! exceeds the threshold and its name matches nothing on the whitelist.

use crate::coordinator::Coordinator;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};
use vigil_core::{unix_now, AttackProfile, IncidentPayload, NodeContext, ProcessSample, ProcessScanner};

#[derive(Debug, Clone)]
pub struct DetectorConfig {
    /// Scanner poll period.
    pub check_interval: Duration,
    /// CPU percentage above which a process is a candidate.
    pub cpu_threshold: f64,
    /// Name substrings that exempt a process (package managers and
    /// friends routinely spike CPU).
    pub whitelist: Vec<String>,
    /// Adversarial harness profile, absent on honest nodes.
    pub attack: Option<AttackProfile>,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            check_interval: Duration::from_secs(2),
            cpu_threshold: 40.0,
            whitelist: ["apt", "apt-get", "dpkg", "curl", "pip"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            attack: None,
        }
    }
}

impl DetectorConfig {
    /// Candidate test: hot CPU and no whitelist match.
    pub fn is_candidate(&self, sample: &ProcessSample) -> bool {
        sample.cpu > self.cpu_threshold
            && !self.whitelist.iter().any(|entry| sample.name.contains(entry))
    }
}

pub struct Detector {
    ctx: Arc<NodeContext>,
    scanner: Arc<dyn ProcessScanner>,
    coordinator: Arc<Coordinator>,
    config: DetectorConfig,
}

impl Detector {
    pub fn new(
        ctx: Arc<NodeContext>,
        scanner: Arc<dyn ProcessScanner>,
        coordinator: Arc<Coordinator>,
        config: DetectorConfig,
    ) -> Self {
        Self {
            ctx,
            scanner,
            coordinator,
            config,
        }
    }

    pub async fn run(self: Arc<Self>) {
        let mut ticker = tokio::time::interval(self.config.check_interval);
        loop {
            ticker.tick().await;
            self.scan_once().await;
        }
    }

    /// One scanner pass. Candidates run through the coordinator
    /// sequentially; a long case simply delays the next scan.
    pub async fn scan_once(&self) {
        let samples = self.scanner.sample().await;
        debug!(observed = samples.len(), "scanner pass");

        for sample in samples {
            let mut suspicious = self.config.is_candidate(&sample);
            if !suspicious {
                if let Some(attack) = &self.config.attack {
                    if attack.false_propose() {
                        suspicious = true;
                        info!(process = %sample.name, "attack profile flagged a healthy process");
                    }
                }
            }
            if !suspicious {
                continue;
            }

            info!(
                process = %sample.name,
                pid = sample.pid,
                cpu = sample.cpu,
                "suspicious process detected"
            );
            let payload = IncidentPayload {
                from: self.ctx.name().to_string(),
                process: sample.name.clone(),
                pid: sample.pid,
                cpu: sample.cpu,
                time: unix_now(),
            };
            self.coordinator.run_case(payload).await;
        }
    }
}
