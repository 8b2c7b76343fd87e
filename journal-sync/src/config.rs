use crate::errors::{SyncError, SyncResult};
use chrono::FixedOffset;
use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable names - single source of truth
pub mod env_vars {
    pub const CONFIG_PATH: &str = "JOURNAL_SYNC_CONFIG";
    pub const DOCUMENT_ID: &str = "JOURNAL_SYNC_DOCUMENT_ID";
    pub const NOTES_LABEL: &str = "JOURNAL_SYNC_NOTES_LABEL";
    pub const CREDENTIALS_FILE: &str = "JOURNAL_SYNC_CREDENTIALS_FILE";
    /// Bearer token for the document API, overrides the credentials file.
    pub const DOCS_TOKEN: &str = "JOURNAL_SYNC_DOCS_TOKEN";
}

/// Default values
pub mod defaults {
    pub const CONFIG_PATH: &str = "./config.toml";
    pub const CREDENTIALS_FILE: &str = "./credentials.json";
    pub const NOTES_URL: &str = "http://127.0.0.1:9105";
    pub const DOCS_URL: &str = "https://docs.googleapis.com";
    pub const STATE_DIR: &str = "./.journal-sync";
    pub const REQUEST_TIMEOUT_SECS: u64 = 30;
    pub const YEAR_LEVEL: u8 = 1;
    pub const MONTH_LEVEL: u8 = 2;
    pub const DAY_LEVEL: u8 = 3;
    pub const TITLE_LEVEL: u8 = 4;
    pub const TIME_LEVEL: u8 = 5;
}

/// Named style used for note bodies
pub const BODY_STYLE: &str = "NORMAL_TEXT";

const LEDGER_FILE: &str = "pending-transfer.json";
const LOCK_FILE: &str = "run.lock";

/// Heading level numbers for each part of a journal entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct HeadingLevels {
    pub year: u8,
    pub month: u8,
    pub day: u8,
    pub title: u8,
    pub time: u8,
}

impl Default for HeadingLevels {
    fn default() -> Self {
        Self {
            year: defaults::YEAR_LEVEL,
            month: defaults::MONTH_LEVEL,
            day: defaults::DAY_LEVEL,
            title: defaults::TITLE_LEVEL,
            time: defaults::TIME_LEVEL,
        }
    }
}

impl HeadingLevels {
    fn validate(&self) -> SyncResult<()> {
        let levels = [
            ("year", self.year),
            ("month", self.month),
            ("day", self.day),
            ("title", self.title),
            ("time", self.time),
        ];
        for (name, level) in levels {
            if !(1..=6).contains(&level) {
                return Err(SyncError::Config(format!(
                    "headings.{} must be between 1 and 6, got {}",
                    name, level
                )));
            }
        }
        for (i, (a_name, a)) in levels.iter().enumerate() {
            for (b_name, b) in &levels[i + 1..] {
                if a == b {
                    return Err(SyncError::Config(format!(
                        "headings.{} and headings.{} both use level {}",
                        a_name, b_name, a
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Resolved named paragraph styles, e.g. `HEADING_3`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadingStyles {
    pub year: String,
    pub month: String,
    pub day: String,
    pub title: String,
    pub time: String,
    pub body: String,
}

impl From<HeadingLevels> for HeadingStyles {
    fn from(levels: HeadingLevels) -> Self {
        let named = |level: u8| format!("HEADING_{}", level);
        Self {
            year: named(levels.year),
            month: named(levels.month),
            day: named(levels.day),
            title: named(levels.title),
            time: named(levels.time),
            body: BODY_STYLE.to_string(),
        }
    }
}

impl Default for HeadingStyles {
    fn default() -> Self {
        HeadingLevels::default().into()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_credentials_file")]
    pub credentials_file: PathBuf,
    #[serde(default)]
    pub document_id: String,
    #[serde(default)]
    pub notes_label: String,
    /// Fixed offset applied to note creation times, in hours
    #[serde(default)]
    pub tz_offset_hours: f64,
    #[serde(default)]
    pub headings: HeadingLevels,
    #[serde(default = "default_notes_url")]
    pub notes_url: String,
    #[serde(default = "default_docs_url")]
    pub docs_url: String,
    #[serde(default = "default_state_dir")]
    pub state_dir: PathBuf,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_credentials_file() -> PathBuf {
    PathBuf::from(defaults::CREDENTIALS_FILE)
}

fn default_notes_url() -> String {
    defaults::NOTES_URL.to_string()
}

fn default_docs_url() -> String {
    defaults::DOCS_URL.to_string()
}

fn default_state_dir() -> PathBuf {
    PathBuf::from(defaults::STATE_DIR)
}

fn default_request_timeout_secs() -> u64 {
    defaults::REQUEST_TIMEOUT_SECS
}

impl Config {
    /// Load the config file named by `JOURNAL_SYNC_CONFIG` (or `./config.toml`),
    /// apply environment overrides and validate.
    pub fn load() -> SyncResult<Self> {
        let path = env::var(env_vars::CONFIG_PATH)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(defaults::CONFIG_PATH));

        let mut config = Self::from_path(&path)?;
        config.apply_overrides(|key| env::var(key).ok());
        config.validate()?;

        log::info!(
            "Loaded config from {:?} (document: {}, label: {})",
            path,
            config.document_id,
            config.notes_label
        );
        Ok(config)
    }

    pub fn from_path(path: &Path) -> SyncResult<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| SyncError::Config(format!("cannot read {:?}: {}", path, e)))?;
        Self::from_toml_str(&raw)
    }

    pub fn from_toml_str(raw: &str) -> SyncResult<Self> {
        Ok(toml::from_str(raw)?)
    }

    /// Replace file values with any non-empty override found by `lookup`
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(id) = lookup(env_vars::DOCUMENT_ID) {
            self.document_id = id;
        }
        if let Some(label) = lookup(env_vars::NOTES_LABEL) {
            self.notes_label = label;
        }
        if let Some(path) = lookup(env_vars::CREDENTIALS_FILE) {
            self.credentials_file = PathBuf::from(path);
        }
    }

    pub fn validate(&self) -> SyncResult<()> {
        if self.document_id.trim().is_empty() {
            return Err(SyncError::Config("document_id is required".to_string()));
        }
        if self.notes_label.trim().is_empty() {
            return Err(SyncError::Config("notes_label is required".to_string()));
        }
        if self.request_timeout_secs == 0 {
            return Err(SyncError::Config(
                "request_timeout_secs must be positive".to_string(),
            ));
        }
        self.headings.validate()?;
        self.tz_offset()?;
        Ok(())
    }

    /// Fixed offset applied to note creation timestamps
    pub fn tz_offset(&self) -> SyncResult<FixedOffset> {
        let hours = self.tz_offset_hours;
        if !hours.is_finite() || !(-14.0..=14.0).contains(&hours) {
            return Err(SyncError::Config(format!(
                "tz_offset_hours must be between -14 and 14, got {}",
                hours
            )));
        }
        let seconds = (hours * 3600.0).round() as i32;
        FixedOffset::east_opt(seconds)
            .ok_or_else(|| SyncError::Config(format!("invalid tz_offset_hours {}", hours)))
    }

    pub fn heading_styles(&self) -> HeadingStyles {
        self.headings.into()
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn ledger_path(&self) -> PathBuf {
        self.state_dir.join(LEDGER_FILE)
    }

    pub fn lock_path(&self) -> PathBuf {
        self.state_dir.join(LOCK_FILE)
    }
}
