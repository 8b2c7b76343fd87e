//! Document service: reads the journal and applies batched edits.

pub mod client;

pub use client::DocsClient;

use crate::errors::SyncResult;
use async_trait::async_trait;
use journal_sync_types::{BatchUpdateDocumentResponse, Document, Request};

#[async_trait]
pub trait DocumentService: Send + Sync {
    async fn get_document(&self, document_id: &str) -> SyncResult<Document>;

    /// Apply all requests atomically. When `required_revision_id` is set the
    /// write is rejected if the document changed since that revision.
    async fn batch_update(
        &self,
        document_id: &str,
        requests: Vec<Request>,
        required_revision_id: Option<String>,
    ) -> SyncResult<BatchUpdateDocumentResponse>;
}
