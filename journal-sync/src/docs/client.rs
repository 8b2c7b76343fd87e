//! Typed HTTP client for the Google Docs v1 REST API.

use super::DocumentService;
use crate::errors::{SyncError, SyncResult};
use crate::http;
use async_trait::async_trait;
use journal_sync_types::{
    BatchUpdateDocumentRequest, BatchUpdateDocumentResponse, Document, Request, WriteControl,
};

const SERVICE: &str = "docs";

pub struct DocsClient {
    base_url: String,
    access_token: String,
    client: reqwest::Client,
}

impl DocsClient {
    pub fn new(base_url: &str, access_token: &str, client: reqwest::Client) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            access_token: access_token.to_string(),
            client,
        }
    }

    fn document_url(&self, document_id: &str) -> String {
        format!("{}/v1/documents/{}", self.base_url, document_id)
    }

    async fn read_json<T: serde::de::DeserializeOwned>(
        resp: reqwest::Response,
        action: &str,
    ) -> SyncResult<T> {
        let status = resp.status();
        let text = resp.text().await?;
        if !status.is_success() {
            return Err(SyncError::service(
                SERVICE,
                format!("{} HTTP {}: {}", action, status, http::error_message(&text)),
            ));
        }
        serde_json::from_str(&text)
            .map_err(|e| SyncError::service(SERVICE, format!("Parse {} response: {}", action, e)))
    }
}

#[async_trait]
impl DocumentService for DocsClient {
    async fn get_document(&self, document_id: &str) -> SyncResult<Document> {
        let resp = self
            .client
            .get(self.document_url(document_id))
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(|e| SyncError::Http(format!("Get document failed: {}", e)))?;

        let doc: Document = Self::read_json(resp, "get document").await?;
        log::info!(
            "[DOCS] Fetched document {} ({} elements, revision {})",
            document_id,
            doc.body.content.len(),
            doc.revision_id.as_deref().unwrap_or("unknown")
        );
        Ok(doc)
    }

    async fn batch_update(
        &self,
        document_id: &str,
        requests: Vec<Request>,
        required_revision_id: Option<String>,
    ) -> SyncResult<BatchUpdateDocumentResponse> {
        let count = requests.len();
        let body = BatchUpdateDocumentRequest {
            requests,
            write_control: required_revision_id.map(|rev| WriteControl {
                required_revision_id: Some(rev),
            }),
        };

        let resp = self
            .client
            .post(format!("{}:batchUpdate", self.document_url(document_id)))
            .bearer_auth(&self.access_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| SyncError::Http(format!("Batch update failed: {}", e)))?;

        let result: BatchUpdateDocumentResponse = Self::read_json(resp, "batch update").await?;
        log::info!(
            "[DOCS] Applied {} request(s) to {} (now revision {})",
            count,
            document_id,
            result.revision_id().unwrap_or("unknown")
        );
        Ok(result)
    }
}
