//! Source of labeled notes, read before and deleted after transfer.

pub mod keep_relay;

pub use keep_relay::KeepRelayClient;

use crate::credentials::Credentials;
use crate::errors::SyncResult;
use async_trait::async_trait;
use journal_sync_types::Note;

#[async_trait]
pub trait NotesService: Send + Sync {
    async fn login(&mut self, credentials: &Credentials) -> SyncResult<()>;

    async fn find_by_label(&self, label: &str) -> SyncResult<Vec<Note>>;

    /// Stage a note for deletion; nothing leaves the process until `commit`
    fn delete(&mut self, note: &Note);

    /// Flush staged deletions, returning how many notes were removed
    async fn commit(&mut self) -> SyncResult<usize>;
}

/// Oldest first; ties broken by id so the order is total
pub fn sort_by_creation(notes: &mut [Note]) {
    notes.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
}
