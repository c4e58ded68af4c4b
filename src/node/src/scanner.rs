//! sysinfo-backed process scanner
//!
//! CPU percentages need two refreshes separated by a sampling window, so
//! enumeration runs on the blocking pool with a short sleep in between.

use async_trait::async_trait;
use std::time::Duration;
use sysinfo::{Pid, System};
use tracing::debug;
use vigil_core::{KillOutcome, ProcessSample, ProcessScanner};

pub struct SystemScanner {
    sample_window: Duration,
}

impl SystemScanner {
    pub fn new(sample_window: Duration) -> Self {
        Self { sample_window }
    }
}

impl Default for SystemScanner {
    fn default() -> Self {
        Self::new(Duration::from_millis(300))
    }
}

#[async_trait]
impl ProcessScanner for SystemScanner {
    async fn sample(&self) -> Vec<ProcessSample> {
        let window = self.sample_window;
        tokio::task::spawn_blocking(move || {
            let mut sys = System::new();
            sys.refresh_processes();
            std::thread::sleep(window);
            sys.refresh_processes();

            sys.processes()
                .iter()
                .map(|(pid, process)| ProcessSample {
                    pid: pid.as_u32(),
                    name: process.name().to_string(),
                    cpu: process.cpu_usage() as f64,
                })
                .collect()
        })
        .await
        .unwrap_or_default()
    }

    async fn kill(&self, pid: u32) -> KillOutcome {
        tokio::task::spawn_blocking(move || {
            let mut sys = System::new();
            sys.refresh_processes();
            match sys.process(Pid::from_u32(pid)) {
                Some(process) => {
                    if process.kill() {
                        debug!(pid, "process killed");
                        KillOutcome::Killed
                    } else {
                        KillOutcome::AccessDenied
                    }
                }
                None => KillOutcome::NotFound,
            }
        })
        .await
        .unwrap_or(KillOutcome::AccessDenied)
    }
}
