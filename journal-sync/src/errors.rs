use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("CONFIG_INVALID: {0}")]
    Config(String),
    #[error("CREDENTIALS_INVALID: {0}")]
    Credentials(String),
    #[error("HTTP_FAILURE: {0}")]
    Http(String),
    #[error("SERVICE_ERROR: {service}: {message}")]
    Service {
        service: &'static str,
        message: String,
    },
    #[error("EMPTY_DOCUMENT: document {0} has no body content")]
    EmptyDocument(String),
    #[error("MALFORMED_HEADING: last {style} heading {text:?} cannot be read as a date")]
    MalformedHeading { style: String, text: String },
    #[error("ALREADY_RUNNING: another sync holds {}", .0.display())]
    AlreadyRunning(PathBuf),
    #[error("LEDGER_FAILURE: {0}")]
    Ledger(String),
    #[error("IO_FAILURE: {0}")]
    Io(String),
    #[error("JSON_FAILURE: {0}")]
    Json(String),
}

impl SyncError {
    pub fn service(service: &'static str, message: impl Into<String>) -> Self {
        Self::Service {
            service,
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for SyncError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value.to_string())
    }
}

impl From<serde_json::Error> for SyncError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value.to_string())
    }
}

impl From<reqwest::Error> for SyncError {
    fn from(value: reqwest::Error) -> Self {
        Self::Http(value.to_string())
    }
}

impl From<toml::de::Error> for SyncError {
    fn from(value: toml::de::Error) -> Self {
        Self::Config(value.to_string())
    }
}

pub type SyncResult<T> = Result<T, SyncError>;
