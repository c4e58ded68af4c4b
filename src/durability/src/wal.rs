//! Append-only write-ahead log
//!
//! One JSON record per line. Append failures are surfaced to the caller
//! for logging and the file handle is dropped so the next append reopens
//! it. Replay tolerates torn or garbled lines: a crash mid-append loses
//! at most the final record.

use crate::error::Result;
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use tracing::warn;
use vigil_core::WalEntry;

pub struct Wal {
    path: PathBuf,
    file: Mutex<Option<File>>,
}

impl Wal {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            file: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one record and flush it to the OS.
    pub fn append(&self, entry: &WalEntry) -> Result<()> {
        let mut guard = self.file.lock();
        if guard.is_none() {
            if let Some(parent) = self.path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let opened = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.path)?;
            *guard = Some(opened);
        }

        let mut line = serde_json::to_string(entry)?;
        line.push('\n');

        let written = match guard.as_mut() {
            Some(file) => file.write_all(line.as_bytes()).and_then(|_| file.flush()),
            None => Ok(()),
        };
        if let Err(err) = written {
            // Drop the handle so the next append reopens the file.
            *guard = None;
            return Err(err.into());
        }
        Ok(())
    }

    /// Read every parseable record in order. Garbled lines are skipped
    /// with a warning.
    pub fn replay(&self) -> Vec<WalEntry> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(_) => return Vec::new(),
        };

        let mut entries = Vec::new();
        for (index, line) in BufReader::new(file).lines().enumerate() {
            let line = match line {
                Ok(line) => line,
                Err(err) => {
                    warn!(%err, "wal read stopped early");
                    break;
                }
            };
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<WalEntry>(&line) {
                Ok(entry) => entries.push(entry),
                Err(err) => warn!(line = index + 1, %err, "skipping garbled wal record"),
            }
        }
        entries
    }

    /// Replace the log wholesale (compaction). Atomic via tmp + rename;
    /// the open handle is reset so subsequent appends hit the new file.
    pub fn rewrite(&self, entries: &[WalEntry]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("compact");
        {
            let mut file = File::create(&tmp)?;
            for entry in entries {
                let mut line = serde_json::to_string(entry)?;
                line.push('\n');
                file.write_all(line.as_bytes())?;
            }
            file.sync_all()?;
        }

        let mut guard = self.file.lock();
        std::fs::rename(&tmp, &self.path)?;
        *guard = None;
        Ok(())
    }
}
