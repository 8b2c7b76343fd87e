//! journal-sync moves labeled notes into a dated journal document.
//!
//! One run fetches every note carrying the configured label, appends them to
//! the document under year/month/day headings in a single batched write, and
//! then deletes them from the notes service.

pub mod config;
pub mod credentials;
pub mod docs;
pub mod errors;
pub mod http;
pub mod journal;
pub mod notes;
pub mod transfer;

pub use config::Config;
pub use errors::{SyncError, SyncResult};
pub use transfer::Transfer;
