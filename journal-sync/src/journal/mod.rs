//! Journal document layout: date headings, entry formatting and the
//! append batch built from them.

pub mod builder;
pub mod format;
pub mod headings;

pub use builder::{build_append, AppendPlan};
pub use headings::{end_index, parse_last_date, LastKnownDate};
