//! HTTP client construction shared by the service clients.

use crate::errors::SyncResult;
use std::time::Duration;

const USER_AGENT: &str = concat!("journal-sync/", env!("CARGO_PKG_VERSION"));

/// Build a client with a per-request timeout. No retries are layered on top.
pub fn build_client(timeout: Duration) -> SyncResult<reqwest::Client> {
    let client = reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()?;
    Ok(client)
}

/// Pull a readable message out of an error response body.
///
/// Understands the `{"error": {"message": ...}}` shape used by Google APIs and
/// the `{"success": false, "error": "..."}` RPC envelope; otherwise returns the
/// body as-is.
pub fn error_message(body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        let nested = value
            .get("error")
            .and_then(|e| e.get("message"))
            .and_then(|m| m.as_str());
        if let Some(msg) = nested {
            return msg.to_string();
        }
        if let Some(msg) = value.get("error").and_then(|e| e.as_str()) {
            return msg.to_string();
        }
    }
    body.trim().to_string()
}
