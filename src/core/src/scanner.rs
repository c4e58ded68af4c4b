//! Host process scanner contract
//!
//! The scanner itself is an external collaborator; nodes consume it only
//! through this trait. The node binary ships a sysinfo-backed
//! implementation, tests plug in scripted ones.

use async_trait::async_trait;

/// One observed process with a short-window CPU sample.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessSample {
    pub pid: u32,
    pub name: String,
    /// CPU percentage over the sampling window.
    pub cpu: f64,
}

/// Result of a termination attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KillOutcome {
    Killed,
    /// Already gone. The coordinator counts this as success.
    NotFound,
    AccessDenied,
}

#[async_trait]
pub trait ProcessScanner: Send + Sync {
    /// Enumerate running processes, sampling CPU over a short window.
    async fn sample(&self) -> Vec<ProcessSample>;

    /// Terminate a process by pid.
    async fn kill(&self, pid: u32) -> KillOutcome;
}
