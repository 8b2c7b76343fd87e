//! Builds the batch of insertions that appends notes to the journal.
//!
//! Every piece of text becomes its own paragraph: an `insertText` of
//! `"\n" + text` just before the current end, then an `updateParagraphStyle`
//! over the new paragraph. Offsets are UTF-16 code units.

use super::format;
use super::headings::LastKnownDate;
use crate::config::HeadingStyles;
use chrono::{DateTime, Datelike, FixedOffset};
use journal_sync_types::{
    InsertTextRequest, Location, Note, ParagraphStyle, Range, Request,
    UpdateParagraphStyleRequest,
};

const STYLE_FIELDS: &str = "namedStyleType";

/// Everything needed to write one batch
#[derive(Debug, Clone, PartialEq)]
pub struct AppendPlan {
    pub requests: Vec<Request>,
    /// Document end offset once the batch is applied
    pub end_index: i64,
    pub headings_added: usize,
    pub notes_added: usize,
}

impl AppendPlan {
    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    /// Texts of the paragraphs this batch leaves at the end of the document,
    /// in order, as `Paragraph::text` reads them back
    pub fn paragraph_texts(&self) -> Vec<String> {
        self.requests
            .iter()
            .filter_map(|r| match r {
                Request::InsertText(insert) => Some(insert.text.as_str()),
                _ => None,
            })
            .flat_map(|text| text.strip_prefix('\n').unwrap_or(text).split('\n'))
            .map(|line| line.trim().to_string())
            .collect()
    }
}

pub struct AppendBuilder<'a> {
    styles: &'a HeadingStyles,
    offset: FixedOffset,
    last: LastKnownDate,
    cursor: i64,
    requests: Vec<Request>,
    headings_added: usize,
    notes_added: usize,
}

impl<'a> AppendBuilder<'a> {
    pub fn new(
        last: LastKnownDate,
        end_index: i64,
        styles: &'a HeadingStyles,
        offset: FixedOffset,
    ) -> Self {
        Self {
            styles,
            offset,
            last,
            cursor: end_index,
            requests: Vec::new(),
            headings_added: 0,
            notes_added: 0,
        }
    }

    /// Append one note, preceded by whatever date headings changed.
    /// Notes must be pushed in creation order.
    pub fn push_note(&mut self, note: &Note) {
        let created: DateTime<FixedOffset> = note.created_at.with_timezone(&self.offset);
        let date = created.date_naive();

        // Components cascade rather than being compared one by one: each
        // distinct (year, month, day) gets exactly one heading group, so
        // 2025-03-02 after 2024-03-02 still repeats "March" and "Sunday 2nd".
        let new_year = self.last.year != Some(date.year());
        let new_month = new_year || self.last.month != Some(date.month());
        let new_day = new_month || self.last.day != Some(date.day());

        if new_year {
            self.add_text(&date.year().to_string(), HeadingKind::Year);
            self.last.year = Some(date.year());
        }
        if new_month {
            let name = format::month_name(date.month()).unwrap_or_default();
            self.add_text(name, HeadingKind::Month);
            self.last.month = Some(date.month());
        }
        if new_day {
            self.add_text(&format::day_heading(date), HeadingKind::Day);
            self.last.day = Some(date.day());
        }

        self.add_text(&note.title, HeadingKind::Title);
        self.add_text(&format::clock_time(&created), HeadingKind::Time);
        self.add_text(&note.body, HeadingKind::Body);
        self.notes_added += 1;
    }

    pub fn finish(self) -> AppendPlan {
        AppendPlan {
            requests: self.requests,
            end_index: self.cursor,
            headings_added: self.headings_added,
            notes_added: self.notes_added,
        }
    }

    fn add_text(&mut self, text: &str, kind: HeadingKind) {
        let style = match kind {
            HeadingKind::Year => &self.styles.year,
            HeadingKind::Month => &self.styles.month,
            HeadingKind::Day => &self.styles.day,
            HeadingKind::Title => &self.styles.title,
            HeadingKind::Time => &self.styles.time,
            HeadingKind::Body => &self.styles.body,
        };
        // The inserted "\n" closes the previous paragraph; the document keeps
        // its own trailing newline after the new text.
        let new_end = self.cursor + utf16_len(text) + 1;

        self.requests.push(Request::InsertText(InsertTextRequest {
            location: Location {
                index: self.cursor - 1,
            },
            text: format!("\n{}", text),
        }));
        self.requests
            .push(Request::UpdateParagraphStyle(UpdateParagraphStyleRequest {
                range: Range {
                    start_index: self.cursor,
                    end_index: new_end,
                },
                paragraph_style: ParagraphStyle {
                    named_style_type: Some(style.clone()),
                },
                fields: STYLE_FIELDS.to_string(),
            }));

        if kind.is_date() {
            self.headings_added += 1;
        }
        self.cursor = new_end;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HeadingKind {
    Year,
    Month,
    Day,
    Title,
    Time,
    Body,
}

impl HeadingKind {
    fn is_date(self) -> bool {
        matches!(self, Self::Year | Self::Month | Self::Day)
    }
}

/// Length as the document service counts it
pub fn utf16_len(text: &str) -> i64 {
    text.encode_utf16().count() as i64
}

/// Plan the append of `notes` (already sorted by creation time)
pub fn build_append(
    notes: &[Note],
    last: LastKnownDate,
    end_index: i64,
    styles: &HeadingStyles,
    offset: FixedOffset,
) -> AppendPlan {
    let mut builder = AppendBuilder::new(last, end_index, styles, offset);
    for note in notes {
        builder.push_note(note);
    }
    builder.finish()
}
