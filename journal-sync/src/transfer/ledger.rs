//! Pending-transfer ledger and run lock.
//!
//! The ledger records which notes are in flight before the document is
//! written, so an interrupted run can be finished instead of repeated.

use crate::errors::{SyncError, SyncResult};
use crate::journal::AppendPlan;
use chrono::{DateTime, Utc};
use fs2::FileExt;
use journal_sync_types::Note;
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferPhase {
    /// Batch built, write not confirmed
    Pending,
    /// Write confirmed, source deletion outstanding
    Written,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingNote {
    pub id: String,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingTransfer {
    pub document_id: String,
    pub phase: TransferPhase,
    /// Revision the batch was built against
    pub base_revision: Option<String>,
    /// Document end index before the batch
    pub base_end_index: i64,
    /// Document end index once the batch is applied
    pub planned_end_index: i64,
    /// Every paragraph text the batch appends, in order
    pub appended_texts: Vec<String>,
    pub notes: Vec<PendingNote>,
    pub started_at: DateTime<Utc>,
}

impl PendingTransfer {
    pub fn new(
        document_id: &str,
        base_revision: Option<String>,
        base_end_index: i64,
        notes: &[Note],
        plan: &AppendPlan,
    ) -> Self {
        Self {
            document_id: document_id.to_string(),
            phase: TransferPhase::Pending,
            base_revision,
            base_end_index,
            planned_end_index: plan.end_index,
            appended_texts: plan.paragraph_texts(),
            notes: notes
                .iter()
                .map(|n| PendingNote {
                    id: n.id.clone(),
                    title: n.title.trim().to_string(),
                })
                .collect(),
            started_at: Utc::now(),
        }
    }

    pub fn mark_written(&mut self) {
        self.phase = TransferPhase::Written;
    }

    /// How far the document end moves when the batch lands
    pub fn planned_growth(&self) -> i64 {
        self.planned_end_index - self.base_end_index
    }

    pub fn contains(&self, note_id: &str) -> bool {
        self.notes.iter().any(|n| n.id == note_id)
    }
}

pub struct Ledger {
    path: PathBuf,
}

impl Ledger {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn load(&self) -> SyncResult<Option<PendingTransfer>> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let transfer = serde_json::from_str(&raw).map_err(|e| {
            SyncError::Ledger(format!("unreadable ledger {:?}: {}", self.path, e))
        })?;
        Ok(Some(transfer))
    }

    /// Write via a temp file and rename so a crash never leaves half a ledger
    pub fn save(&self, transfer: &PendingTransfer) -> SyncResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(transfer)?)?;
        fs::rename(&tmp, &self.path)?;
        log::debug!(
            "[LEDGER] Saved {:?} transfer of {} note(s)",
            transfer.phase,
            transfer.notes.len()
        );
        Ok(())
    }

    pub fn clear(&self) -> SyncResult<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Exclusive advisory lock held for the whole run
#[derive(Debug)]
pub struct RunLock {
    file: File,
    path: PathBuf,
}

impl RunLock {
    /// Fails immediately with `AlreadyRunning` if another run holds the lock
    pub fn acquire(path: &Path) -> SyncResult<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(path)?;

        FileExt::try_lock_exclusive(&file)
            .map_err(|_| SyncError::AlreadyRunning(path.to_path_buf()))?;

        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}
