//! Secrets for the notes account and the document API.
//!
//! Read from a JSON file that is never version controlled. Tokens are issued
//! out of band; this module only loads them.

use crate::errors::{SyncError, SyncResult};
use serde::Deserialize;
use std::fmt;
use std::path::Path;

#[derive(Clone, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub docs_access_token: Option<String>,
}

// Keep secrets out of logs
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field(
                "docs_access_token",
                &self.docs_access_token.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}

impl Credentials {
    pub fn from_file(path: &Path) -> SyncResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            SyncError::Credentials(format!("cannot read credentials file {:?}: {}", path, e))
        })?;
        Self::from_json_str(&raw)
    }

    pub fn from_json_str(raw: &str) -> SyncResult<Self> {
        let creds: Credentials = serde_json::from_str(raw)
            .map_err(|e| SyncError::Credentials(format!("invalid credentials file: {}", e)))?;
        if creds.username.trim().is_empty() {
            return Err(SyncError::Credentials("username is empty".to_string()));
        }
        Ok(creds)
    }

    /// Prefer a token supplied out of band (e.g. from the environment)
    pub fn with_docs_token(mut self, token: Option<String>) -> Self {
        if let Some(token) = token.filter(|t| !t.trim().is_empty()) {
            self.docs_access_token = Some(token);
        }
        self
    }

    pub fn docs_token(&self) -> SyncResult<&str> {
        self.docs_access_token
            .as_deref()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| SyncError::Credentials("no document API access token".to_string()))
    }
}
