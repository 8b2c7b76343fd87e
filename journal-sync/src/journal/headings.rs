//! Reads the most recent date headings back out of the journal document.

use super::format;
use crate::config::HeadingStyles;
use crate::errors::{SyncError, SyncResult};
use journal_sync_types::Document;

/// The last year/month/day the document already has headings for.
///
/// A `None` component means the document has no heading of that style yet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LastKnownDate {
    pub year: Option<i32>,
    pub month: Option<u32>,
    pub day: Option<u32>,
}

/// Text of the last paragraph carrying the given named style
pub fn last_heading_text(document: &Document, style: &str) -> Option<String> {
    document
        .paragraphs()
        .rev()
        .find(|p| p.named_style() == Some(style))
        .map(|p| p.text())
}

/// Texts of the last `count` paragraphs of any style, in document order
pub fn trailing_texts(document: &Document, count: usize) -> Vec<String> {
    let mut texts: Vec<String> = document
        .paragraphs()
        .rev()
        .take(count)
        .map(|p| p.text())
        .collect();
    texts.reverse();
    texts
}

pub fn parse_last_date(document: &Document, styles: &HeadingStyles) -> SyncResult<LastKnownDate> {
    let year = last_heading_text(document, &styles.year)
        .map(|text| {
            text.parse::<i32>()
                .map_err(|_| malformed(&styles.year, &text))
        })
        .transpose()?;

    let month = last_heading_text(document, &styles.month)
        .map(|text| format::month_number(&text).ok_or_else(|| malformed(&styles.month, &text)))
        .transpose()?;

    let day = last_heading_text(document, &styles.day)
        .map(|text| {
            let digits: String = text.chars().filter(|c| c.is_ascii_digit()).collect();
            digits
                .parse::<u32>()
                .ok()
                .filter(|d| (1..=31).contains(d))
                .ok_or_else(|| malformed(&styles.day, &text))
        })
        .transpose()?;

    Ok(LastKnownDate { year, month, day })
}

/// End offset of the last structural element; new text goes just before it
pub fn end_index(document: &Document) -> SyncResult<i64> {
    document
        .body
        .content
        .last()
        .map(|e| e.end_index)
        .filter(|end| *end >= 1)
        .ok_or_else(|| SyncError::EmptyDocument(document.document_id.clone()))
}

fn malformed(style: &str, text: &str) -> SyncError {
    SyncError::MalformedHeading {
        style: style.to_string(),
        text: text.to_string(),
    }
}
