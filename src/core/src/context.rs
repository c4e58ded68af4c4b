//! Shared node context
//!
//! A single coarse lock protects all mutable node state; the hot paths
//! are small map updates, so readers and writers serialize through the
//! one `RwLock`. Mode flags sit outside the lock as atomics because the
//! endpoint handlers consult them before deciding whether to touch state
//! at all.

use crate::clock::unix_now;
use crate::state::{NodeState, StateSnapshot};
use crate::NodeName;
use parking_lot::{Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

pub struct NodeContext {
    name: NodeName,
    peers: Vec<NodeName>,
    started: Instant,
    state: RwLock<NodeState>,
    recovery_mode: AtomicBool,
    restore_in_progress: AtomicBool,
    trust_frozen: AtomicBool,
    last_recovery: Mutex<f64>,
}

impl NodeContext {
    pub fn new(name: NodeName, peers: Vec<NodeName>) -> Self {
        let mut state = NodeState::default();
        state.ensure_defaults(peers.iter().chain(std::iter::once(&name)));
        Self {
            name,
            peers,
            started: Instant::now(),
            state: RwLock::new(state),
            recovery_mode: AtomicBool::new(false),
            restore_in_progress: AtomicBool::new(false),
            trust_frozen: AtomicBool::new(false),
            last_recovery: Mutex::new(0.0),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn peers(&self) -> &[NodeName] {
        &self.peers
    }

    /// Seconds since this process started, used for the bootstrap grace
    /// window of the self-recovery loop.
    pub fn uptime_secs(&self) -> f64 {
        self.started.elapsed().as_secs_f64()
    }

    pub fn read(&self) -> RwLockReadGuard<'_, NodeState> {
        self.state.read()
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, NodeState> {
        self.state.write()
    }

    /// Re-seed default rows for the configured membership. Used after
    /// loading persisted state so newly configured peers get rows without
    /// clobbering loaded ones.
    pub fn ensure_defaults(&self) {
        let mut state = self.write();
        state.ensure_defaults(self.peers.iter().chain(std::iter::once(&self.name)));
    }

    /// Consistent snapshot taken under the read lock.
    pub fn snapshot(&self) -> StateSnapshot {
        self.read().snapshot(&self.name)
    }

    pub fn is_self_quarantined(&self) -> bool {
        self.read().is_quarantined(&self.name)
    }

    pub fn recovery_mode(&self) -> bool {
        self.recovery_mode.load(Ordering::SeqCst)
    }

    pub fn set_recovery_mode(&self, on: bool) {
        self.recovery_mode.store(on, Ordering::SeqCst);
    }

    pub fn restore_in_progress(&self) -> bool {
        self.restore_in_progress.load(Ordering::SeqCst)
    }

    pub fn set_restore_in_progress(&self, on: bool) {
        self.restore_in_progress.store(on, Ordering::SeqCst);
    }

    pub fn trust_frozen(&self) -> bool {
        self.trust_frozen.load(Ordering::SeqCst)
    }

    pub fn set_trust_frozen(&self, on: bool) {
        self.trust_frozen.store(on, Ordering::SeqCst);
    }

    /// Timestamp of the last recovery attempt, for the attempt cooldown.
    pub fn last_recovery(&self) -> f64 {
        *self.last_recovery.lock()
    }

    pub fn mark_recovery_attempt(&self) {
        *self.last_recovery.lock() = unix_now();
    }
}
