//! Durability orchestration
//!
//! Implements the journal seam for the rest of the node: WAL appends go
//! straight to disk, checkpoint requests set a dirty flag that a short
//! flush loop drains. Bulk restores suppress checkpoint writes until the
//! new state is fully in place.

use crate::checkpoint::{self, CheckpointDoc};
use crate::wal::Wal;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use vigil_core::{
    unix_now, Journal, NodeContext, PendingCase, StateSnapshot, WalEntry, MAX_EVENTS,
};

#[derive(Debug, Clone)]
pub struct DurabilityConfig {
    /// Checkpoint file location.
    pub checkpoint_path: PathBuf,
    /// WAL file location.
    pub wal_path: PathBuf,
    /// How often the flush loop drains the dirty flag.
    pub flush_interval: Duration,
    /// Event-log size that triggers WAL compaction after a case.
    pub compact_min_events: usize,
    /// Voting window length; replayed pending cases past this deadline
    /// are dropped.
    pub vote_timeout_secs: f64,
}

impl Default for DurabilityConfig {
    fn default() -> Self {
        Self {
            checkpoint_path: PathBuf::from("/data/trust.json"),
            wal_path: PathBuf::from("/data/wal.log"),
            flush_interval: Duration::from_secs(1),
            compact_min_events: 20,
            vote_timeout_secs: 6.0,
        }
    }
}

impl DurabilityConfig {
    /// Standard layout under one data directory.
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            checkpoint_path: dir.join("trust.json"),
            wal_path: dir.join("wal.log"),
            ..Default::default()
        }
    }
}

pub struct Durability {
    ctx: Arc<NodeContext>,
    wal: Wal,
    config: DurabilityConfig,
    dirty: AtomicBool,
}

impl Durability {
    pub fn new(ctx: Arc<NodeContext>, config: DurabilityConfig) -> Self {
        let wal = Wal::new(config.wal_path.clone());
        Self {
            ctx,
            wal,
            config,
            dirty: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &DurabilityConfig {
        &self.config
    }

    /// Startup sequence: load the checkpoint, replay the WAL under
    /// recovery mode, prune stale pending cases, seed defaults, then cut
    /// a fresh checkpoint.
    pub fn startup(&self) {
        self.ctx.set_recovery_mode(true);

        let saved_at = match checkpoint::load(&self.config.checkpoint_path) {
            Some(doc) => {
                let saved_at = doc.saved_at;
                let mut state = self.ctx.write();
                doc.apply_to(&mut state);
                info!(version = state.version, "checkpoint loaded");
                saved_at
            }
            None => {
                info!("no checkpoint on disk, starting fresh");
                0.0
            }
        };

        let entries = self.wal.replay();
        let replayed = entries.len();
        {
            let mut state = self.ctx.write();
            for entry in entries {
                match entry {
                    WalEntry::TrustUpdate { node, value, time } => {
                        if time > saved_at {
                            state.trust.insert(node.clone(), value);
                            state.last_trust_update.insert(node, time);
                        }
                    }
                    WalEntry::StrikeUpdate { node, strikes, time } => {
                        if time > saved_at {
                            state.strikes.insert(node, strikes);
                        }
                    }
                    WalEntry::Event { record } => {
                        state.push_event(record);
                    }
                    WalEntry::PendingCase { case_id, payload, start_time } => {
                        state.pending_cases.insert(
                            case_id,
                            PendingCase {
                                payload,
                                start_time,
                                votes: Default::default(),
                            },
                        );
                    }
                }
            }

            // Drop cases whose voting window has already closed and make
            // sure the survivors carry the proposer's own vote.
            let now = unix_now();
            let deadline = self.config.vote_timeout_secs;
            state
                .pending_cases
                .retain(|_, case| case.start_time + deadline >= now);
            let name = self.ctx.name().to_string();
            for case in state.pending_cases.values_mut() {
                case.votes.entry(name.clone()).or_insert(true);
            }
        }
        if replayed > 0 {
            info!(replayed, "wal replay complete");
        }

        self.ctx.ensure_defaults();
        self.checkpoint_now();
        self.ctx.set_recovery_mode(false);
    }

    /// Cut a checkpoint right now, bumping the state version. Suppressed
    /// while a bulk restore is in flight; failures leave the dirty flag
    /// set so the flush loop retries.
    pub fn checkpoint_now(&self) {
        if self.ctx.restore_in_progress() {
            return;
        }
        let doc = {
            let mut state = self.ctx.write();
            state.version += 1;
            CheckpointDoc::from_state(&state)
        };
        if let Err(err) = checkpoint::write_atomic(&self.config.checkpoint_path, &doc) {
            warn!(%err, "checkpoint write failed, will retry");
            self.dirty.store(true, Ordering::SeqCst);
        }
    }

    /// Drain the dirty flag on a short period.
    pub async fn run_flush(self: Arc<Self>) {
        let mut ticker = tokio::time::interval(self.config.flush_interval);
        loop {
            ticker.tick().await;
            if self.dirty.swap(false, Ordering::SeqCst) && !self.ctx.restore_in_progress() {
                self.checkpoint_now();
            }
        }
    }

    /// After a finalized case: once the event log is large enough, the
    /// WAL is rewritten with only the event tail. Trust, strike and
    /// pending entries older than the checkpoint are redundant by then.
    fn compact_wal(&self) {
        let events: Vec<WalEntry> = {
            let state = self.ctx.read();
            if state.events.len() < self.config.compact_min_events {
                return;
            }
            state
                .events
                .iter()
                .rev()
                .take(MAX_EVENTS)
                .cloned()
                .collect::<Vec<_>>()
                .into_iter()
                .rev()
                .map(|record| WalEntry::Event { record })
                .collect()
        };

        match self.wal.rewrite(&events) {
            Ok(()) => info!(kept = events.len(), "wal compacted"),
            Err(err) => warn!(%err, "wal compaction failed"),
        }
    }

    /// Authoritative replace from a snapshot, used by the controller
    /// restore endpoint and the peer-quorum recovery. Checkpoint writes
    /// are suppressed until the new state is fully applied.
    pub fn apply_restore(&self, snap: &StateSnapshot, clear_self_quarantine: bool) {
        self.ctx.set_restore_in_progress(true);
        {
            let mut state = self.ctx.write();
            state.apply_snapshot(snap);
            if clear_self_quarantine {
                let name = self.ctx.name().to_string();
                if let Some(q) = state.quarantine.get_mut(&name) {
                    q.active = false;
                    q.until = 0.0;
                }
            }
        }
        self.ctx.ensure_defaults();
        self.ctx.set_restore_in_progress(false);
        self.checkpoint_now();
        info!(source = %snap.node, version = snap.version, "state restored from snapshot");
    }
}

impl Journal for Durability {
    fn append(&self, entry: WalEntry) {
        if let Err(err) = self.wal.append(&entry) {
            warn!(%err, "wal append failed, entry dropped");
        }
    }

    fn schedule_checkpoint(&self) {
        self.dirty.store(true, Ordering::SeqCst);
    }

    fn compact_after_case(&self) {
        self.compact_wal();
    }
}
