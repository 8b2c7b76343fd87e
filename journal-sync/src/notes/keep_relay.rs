//! Typed client for the notes relay, a small RPC bridge in front of the
//! notes account, speaking the `{success, data, error}` envelope.

use super::NotesService;
use crate::credentials::Credentials;
use crate::errors::{SyncError, SyncResult};
use crate::http;
use async_trait::async_trait;
use journal_sync_types::{
    DeleteNotesRequest, DeleteNotesResult, FindNotesRequest, LoginRequest, LoginResult, Note,
    RpcResponse,
};
use serde::de::DeserializeOwned;
use serde::Serialize;

const SERVICE: &str = "notes";

pub struct KeepRelayClient {
    base_url: String,
    client: reqwest::Client,
    session_token: Option<String>,
    staged: Vec<String>,
}

impl KeepRelayClient {
    pub fn new(base_url: &str, client: reqwest::Client) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            session_token: None,
            staged: Vec::new(),
        }
    }

    /// Ids staged for deletion and not yet committed
    pub fn staged(&self) -> &[String] {
        &self.staged
    }

    async fn call<B, T>(&self, path: &str, body: &B) -> SyncResult<T>
    where
        B: Serialize + Sync,
        T: DeserializeOwned + Send,
    {
        let url = format!("{}{}", self.base_url, path);
        let mut req = self.client.post(&url).json(body);
        if let Some(token) = &self.session_token {
            req = req.bearer_auth(token);
        }

        let resp = req
            .send()
            .await
            .map_err(|e| SyncError::Http(format!("Notes relay unavailable: {}", e)))?;

        let status = resp.status();
        let text = resp.text().await?;
        if !status.is_success() {
            return Err(SyncError::service(
                SERVICE,
                format!("{} HTTP {}: {}", path, status, http::error_message(&text)),
            ));
        }

        let parsed: RpcResponse<T> = serde_json::from_str(&text).map_err(|e| {
            SyncError::service(SERVICE, format!("Invalid response from notes relay: {}", e))
        })?;

        match parsed {
            RpcResponse {
                success: true,
                data: Some(data),
                ..
            } => Ok(data),
            RpcResponse { error, .. } => Err(SyncError::service(
                SERVICE,
                error.unwrap_or_else(|| "Unknown error".to_string()),
            )),
        }
    }
}

#[async_trait]
impl NotesService for KeepRelayClient {
    async fn login(&mut self, credentials: &Credentials) -> SyncResult<()> {
        let body = LoginRequest {
            username: credentials.username.clone(),
            password: credentials.password.clone(),
        };
        let result: LoginResult = self.call("/rpc/login", &body).await?;
        self.session_token = Some(result.session_token);
        log::info!("[NOTES] Logged in as {}", credentials.username);
        Ok(())
    }

    async fn find_by_label(&self, label: &str) -> SyncResult<Vec<Note>> {
        let body = FindNotesRequest {
            label: label.to_string(),
        };
        let notes: Vec<Note> = self.call("/rpc/notes/find", &body).await?;
        log::info!("[NOTES] {} note(s) labeled '{}'", notes.len(), label);
        Ok(notes)
    }

    fn delete(&mut self, note: &Note) {
        if !self.staged.contains(&note.id) {
            self.staged.push(note.id.clone());
        }
    }

    async fn commit(&mut self) -> SyncResult<usize> {
        if self.staged.is_empty() {
            return Ok(0);
        }
        let body = DeleteNotesRequest {
            ids: self.staged.clone(),
        };
        let result: DeleteNotesResult = self.call("/rpc/notes/delete", &body).await?;
        log::info!(
            "[NOTES] Committed deletion of {} note(s) ({} staged)",
            result.deleted,
            self.staged.len()
        );
        self.staged.clear();
        Ok(result.deleted)
    }
}
