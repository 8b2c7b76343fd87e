//! Note transfer: fetch labeled notes, append them to the journal, then
//! delete them from the source.
//!
//! The two halves are tied together by the pending-transfer ledger: notes are
//! recorded before the document write, deleted only once the write is
//! confirmed, and the record is cleared after the source commit.

pub mod ledger;

pub use ledger::{Ledger, PendingTransfer, RunLock, TransferPhase};

use crate::config::Config;
use crate::credentials::Credentials;
use crate::docs::DocumentService;
use crate::errors::SyncResult;
use crate::journal::{self, headings};
use crate::notes::{self, NotesService};
use journal_sync_types::{Document, Note, SyncSummary};

pub struct Transfer<'a> {
    config: &'a Config,
    credentials: &'a Credentials,
    notes: &'a mut dyn NotesService,
    docs: &'a dyn DocumentService,
    ledger: Ledger,
}

impl<'a> Transfer<'a> {
    pub fn new(
        config: &'a Config,
        credentials: &'a Credentials,
        notes: &'a mut dyn NotesService,
        docs: &'a dyn DocumentService,
    ) -> Self {
        Self {
            config,
            credentials,
            notes,
            docs,
            ledger: Ledger::new(config.ledger_path()),
        }
    }

    pub async fn run(&mut self) -> SyncResult<SyncSummary> {
        let _lock = RunLock::acquire(&self.config.lock_path())?;
        let styles = self.config.heading_styles();
        let offset = self.config.tz_offset()?;
        let mut summary = SyncSummary::default();

        self.notes.login(self.credentials).await?;
        let mut found = self.notes.find_by_label(&self.config.notes_label).await?;
        notes::sort_by_creation(&mut found);

        if let Some(pending) = self.ledger.load()? {
            let finished = self.recover(pending, &found).await?;
            summary.notes_recovered = finished.len();
            found.retain(|n| !finished.contains(&n.id));
        }

        summary.notes_found = found.len();
        if found.is_empty() {
            log::info!(
                "[TRANSFER] No notes labeled '{}' to transfer",
                self.config.notes_label
            );
            return Ok(summary);
        }

        let config = self.config;
        let document_id = config.document_id.as_str();
        let document = self.docs.get_document(document_id).await?;
        let last = journal::parse_last_date(&document, &styles)?;
        let end = journal::end_index(&document)?;
        let plan = journal::build_append(&found, last, end, &styles, offset);

        log::info!(
            "[TRANSFER] Appending {} note(s) with {} date heading(s) after {:?}",
            plan.notes_added,
            plan.headings_added,
            last
        );

        let mut pending =
            PendingTransfer::new(document_id, document.revision_id.clone(), end, &found, &plan);
        self.ledger.save(&pending)?;

        summary.requests_sent = plan.requests.len();
        let response = self
            .docs
            .batch_update(document_id, plan.requests, document.revision_id.clone())
            .await?;

        log::debug!("[TRANSFER] Batch applied at {:?}", response.revision_id());
        pending.mark_written();
        self.ledger.save(&pending)?;
        summary.notes_appended = plan.notes_added;
        summary.headings_added = plan.headings_added;

        summary.notes_deleted = self.delete_from_source(&found).await?;
        self.ledger.clear()?;

        log::info!(
            "[TRANSFER] Done: {} appended, {} deleted, {} recovered",
            summary.notes_appended,
            summary.notes_deleted,
            summary.notes_recovered
        );
        Ok(summary)
    }

    /// Finish or discard a transfer left behind by an interrupted run.
    /// Returns the ids of notes that were completed and removed from the source.
    async fn recover(
        &mut self,
        mut pending: PendingTransfer,
        found: &[Note],
    ) -> SyncResult<Vec<String>> {
        log::warn!(
            "[TRANSFER] Found {:?} transfer of {} note(s) from {}",
            pending.phase,
            pending.notes.len(),
            pending.started_at
        );

        if pending.phase == TransferPhase::Pending {
            let document = self.docs.get_document(&pending.document_id).await?;
            if !write_landed(&document, &pending) {
                log::warn!("[TRANSFER] Previous write never landed, transferring again");
                self.ledger.clear()?;
                return Ok(Vec::new());
            }
            pending.mark_written();
            self.ledger.save(&pending)?;
        }

        let remaining: Vec<Note> = found
            .iter()
            .filter(|n| pending.contains(&n.id))
            .cloned()
            .collect();
        self.delete_from_source(&remaining).await?;
        self.ledger.clear()?;

        log::info!(
            "[TRANSFER] Finished previous transfer, removed {} leftover note(s)",
            remaining.len()
        );
        Ok(remaining.into_iter().map(|n| n.id).collect())
    }

    async fn delete_from_source(&mut self, notes: &[Note]) -> SyncResult<usize> {
        if notes.is_empty() {
            return Ok(0);
        }
        for note in notes {
            self.notes.delete(note);
        }
        self.notes.commit().await
    }
}

/// Whether the batch recorded in `pending` is the tail of the document.
///
/// The end index must have moved by exactly the planned amount and the last
/// paragraphs must be exactly the planned texts. Titles alone are not enough
/// since they repeat; any mismatch means the notes are sent again.
fn write_landed(document: &Document, pending: &PendingTransfer) -> bool {
    if pending.base_revision.is_some() && document.revision_id == pending.base_revision {
        return false;
    }
    let Ok(end) = headings::end_index(document) else {
        return false;
    };
    if end - pending.base_end_index != pending.planned_growth() {
        return false;
    }
    let expected = &pending.appended_texts;
    !expected.is_empty() && headings::trailing_texts(document, expected.len()) == *expected
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::SyncError;
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use journal_sync_types::{
        BatchUpdateDocumentResponse, Paragraph, ParagraphElement, Request, StructuralElement,
        TextRun, WriteControl,
    };
    use std::sync::Mutex;
    use tempfile::{tempdir, TempDir};

    // ── Fakes ───────────────────────────────────────

    #[derive(Default)]
    struct FakeNotes {
        notes: Vec<Note>,
        staged: Vec<String>,
        deleted: Vec<String>,
        fail_commit: bool,
        logins: usize,
    }

    #[async_trait]
    impl NotesService for FakeNotes {
        async fn login(&mut self, _credentials: &Credentials) -> SyncResult<()> {
            self.logins += 1;
            Ok(())
        }

        async fn find_by_label(&self, label: &str) -> SyncResult<Vec<Note>> {
            Ok(self
                .notes
                .iter()
                .filter(|n| n.labels.iter().any(|l| l == label))
                .cloned()
                .collect())
        }

        fn delete(&mut self, note: &Note) {
            self.staged.push(note.id.clone());
        }

        async fn commit(&mut self) -> SyncResult<usize> {
            if self.fail_commit {
                return Err(SyncError::service("notes", "sync failed"));
            }
            let staged = std::mem::take(&mut self.staged);
            self.notes.retain(|n| !staged.contains(&n.id));
            let count = staged.len();
            self.deleted.extend(staged);
            Ok(count)
        }
    }

    /// Applies insert/style pairs as new trailing paragraphs
    struct FakeDocs {
        doc: Mutex<Document>,
        revision: Mutex<u32>,
        fail_batch: bool,
        batches: Mutex<usize>,
        reads: Mutex<usize>,
    }

    impl FakeDocs {
        fn new(paragraphs: &[(&str, &str)]) -> Self {
            Self {
                doc: Mutex::new(headings::tests::doc_with(paragraphs)),
                revision: Mutex::new(1),
                fail_batch: false,
                batches: Mutex::new(0),
                reads: Mutex::new(0),
            }
        }

        fn failing(paragraphs: &[(&str, &str)]) -> Self {
            Self {
                fail_batch: true,
                ..Self::new(paragraphs)
            }
        }

        fn paragraphs(&self) -> Vec<(String, String)> {
            self.doc
                .lock()
                .unwrap()
                .paragraphs()
                .map(|p| (p.named_style().unwrap_or("").to_string(), p.text()))
                .collect()
        }

        fn texts_with_style(&self, style: &str) -> Vec<String> {
            self.paragraphs()
                .into_iter()
                .filter(|(s, _)| s == style)
                .map(|(_, t)| t)
                .collect()
        }

        fn apply(&self, requests: &[Request]) -> String {
            let mut doc = self.doc.lock().unwrap();
            for pair in requests.chunks(2) {
                if let [Request::InsertText(ins), Request::UpdateParagraphStyle(upd)] = pair {
                    doc.body.content.push(StructuralElement {
                        start_index: upd.range.start_index,
                        end_index: upd.range.end_index,
                        paragraph: Some(Paragraph {
                            elements: vec![ParagraphElement {
                                text_run: Some(TextRun {
                                    content: format!("{}\n", ins.text.trim_start_matches('\n')),
                                }),
                            }],
                            paragraph_style: upd.paragraph_style.clone(),
                        }),
                    });
                }
            }
            let mut revision = self.revision.lock().unwrap();
            *revision += 1;
            let rev = format!("rev-{}", revision);
            doc.revision_id = Some(rev.clone());
            rev
        }
    }

    #[async_trait]
    impl DocumentService for FakeDocs {
        async fn get_document(&self, _document_id: &str) -> SyncResult<Document> {
            *self.reads.lock().unwrap() += 1;
            Ok(self.doc.lock().unwrap().clone())
        }

        async fn batch_update(
            &self,
            document_id: &str,
            requests: Vec<Request>,
            required_revision_id: Option<String>,
        ) -> SyncResult<BatchUpdateDocumentResponse> {
            if self.fail_batch {
                return Err(SyncError::service("docs", "backend error"));
            }
            if required_revision_id != self.doc.lock().unwrap().revision_id {
                return Err(SyncError::service("docs", "revision mismatch"));
            }
            *self.batches.lock().unwrap() += 1;
            let rev = self.apply(&requests);
            Ok(BatchUpdateDocumentResponse {
                document_id: document_id.to_string(),
                write_control: Some(WriteControl {
                    required_revision_id: Some(rev),
                }),
            })
        }
    }

    // ── Helpers ─────────────────────────────────────

    const SEEDED: &[(&str, &str)] = &[
        ("HEADING_1", "2024"),
        ("HEADING_2", "March"),
        ("HEADING_3", "Friday 1st"),
        ("HEADING_4", "Seed entry"),
        ("HEADING_5", "8:00am"),
        ("NORMAL_TEXT", "first words"),
    ];

    fn config(dir: &TempDir) -> Config {
        let raw = format!(
            r#"
document_id = "doc-1"
notes_label = "journal"
state_dir = "{}"
"#,
            dir.path().display()
        );
        let config = Config::from_toml_str(&raw).unwrap();
        config.validate().unwrap();
        config
    }

    fn creds() -> Credentials {
        Credentials::from_json_str(r#"{"username": "me", "password": "pw"}"#).unwrap()
    }

    fn note(id: &str, title: &str, mo: u32, d: u32, h: u32) -> Note {
        Note {
            id: id.to_string(),
            title: title.to_string(),
            body: format!("body of {}", title),
            created_at: Utc.with_ymd_and_hms(2024, mo, d, h, 0, 0).unwrap(),
            labels: vec!["journal".to_string()],
        }
    }

    fn plan_for(config: &Config, base: &Document, notes: &[Note]) -> (i64, journal::AppendPlan) {
        let styles = config.heading_styles();
        let end = journal::end_index(base).unwrap();
        let plan = journal::build_append(
            notes,
            journal::parse_last_date(base, &styles).unwrap(),
            end,
            &styles,
            config.tz_offset().unwrap(),
        );
        (end, plan)
    }

    fn labeled(notes: Vec<Note>) -> FakeNotes {
        FakeNotes {
            notes,
            ..FakeNotes::default()
        }
    }

    // ── Tests ───────────────────────────────────────

    #[tokio::test]
    async fn test_full_run_appends_then_deletes() {
        let dir = tempdir().unwrap();
        let config = config(&dir);
        let creds = creds();
        let mut source = labeled(vec![
            note("n2", "Evening", 3, 2, 20),
            note("n1", "Morning", 3, 1, 9),
            Note {
                labels: vec!["other".to_string()],
                ..note("x", "Unlabeled", 3, 1, 10)
            },
        ]);
        let docs = FakeDocs::new(SEEDED);

        let summary = Transfer::new(&config, &creds, &mut source, &docs)
            .run()
            .await
            .unwrap();

        assert_eq!(summary.notes_found, 2);
        assert_eq!(summary.notes_appended, 2);
        assert_eq!(summary.notes_deleted, 2);
        assert_eq!(summary.headings_added, 1);
        assert_eq!(summary.requests_sent, 2 * (3 + 3 + 1));
        assert_eq!(
            docs.texts_with_style("HEADING_4"),
            vec!["Seed entry", "Morning", "Evening"]
        );
        assert_eq!(
            docs.texts_with_style("HEADING_3"),
            vec!["Friday 1st", "Saturday 2nd"]
        );
        assert_eq!(source.deleted, vec!["n1".to_string(), "n2".to_string()]);
        assert_eq!(source.notes.len(), 1);
        assert_eq!(source.logins, 1);
        assert!(Ledger::new(config.ledger_path()).load().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_no_notes_means_no_writes() {
        let dir = tempdir().unwrap();
        let config = config(&dir);
        let creds = creds();
        let mut source = labeled(vec![]);
        let docs = FakeDocs::new(SEEDED);

        let summary = Transfer::new(&config, &creds, &mut source, &docs)
            .run()
            .await
            .unwrap();

        assert_eq!(summary, SyncSummary::default());
        assert_eq!(*docs.reads.lock().unwrap(), 0);
        assert_eq!(*docs.batches.lock().unwrap(), 0);
        assert!(source.deleted.is_empty());
    }

    #[tokio::test]
    async fn test_failed_write_deletes_nothing_and_retries_once() {
        let dir = tempdir().unwrap();
        let config = config(&dir);
        let creds = creds();
        let mut source = labeled(vec![note("n1", "Idea", 3, 1, 12)]);

        let broken = FakeDocs::failing(SEEDED);
        let err = Transfer::new(&config, &creds, &mut source, &broken)
            .run()
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::Service { service: "docs", .. }));
        assert!(source.deleted.is_empty());
        let pending = Ledger::new(config.ledger_path()).load().unwrap().unwrap();
        assert_eq!(pending.phase, TransferPhase::Pending);

        // Same document revision: the ledger is discarded and the note sent again
        let docs = FakeDocs::new(SEEDED);
        let summary = Transfer::new(&config, &creds, &mut source, &docs)
            .run()
            .await
            .unwrap();
        assert_eq!(summary.notes_recovered, 0);
        assert_eq!(summary.notes_appended, 1);
        assert_eq!(docs.texts_with_style("HEADING_4"), vec!["Seed entry", "Idea"]);
        assert_eq!(source.deleted, vec!["n1".to_string()]);
    }

    #[tokio::test]
    async fn test_failed_delete_is_finished_without_duplicating() {
        let dir = tempdir().unwrap();
        let config = config(&dir);
        let creds = creds();
        let docs = FakeDocs::new(SEEDED);
        let mut source = FakeNotes {
            fail_commit: true,
            ..labeled(vec![note("n1", "Idea", 3, 1, 12)])
        };

        let err = Transfer::new(&config, &creds, &mut source, &docs)
            .run()
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::Service { service: "notes", .. }));
        let pending = Ledger::new(config.ledger_path()).load().unwrap().unwrap();
        assert_eq!(pending.phase, TransferPhase::Written);

        source.fail_commit = false;
        source.staged.clear();
        let summary = Transfer::new(&config, &creds, &mut source, &docs)
            .run()
            .await
            .unwrap();

        assert_eq!(summary.notes_recovered, 1);
        assert_eq!(summary.notes_appended, 0);
        assert_eq!(*docs.batches.lock().unwrap(), 1);
        assert_eq!(docs.texts_with_style("HEADING_4"), vec!["Seed entry", "Idea"]);
        assert_eq!(source.deleted, vec!["n1".to_string()]);
        assert!(Ledger::new(config.ledger_path()).load().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_pending_ledger_with_landed_write_is_promoted() {
        let dir = tempdir().unwrap();
        let config = config(&dir);
        let creds = creds();
        let notes = vec![note("n1", "Idea", 3, 1, 12), note("n2", "Second", 3, 1, 13)];
        let docs = FakeDocs::new(SEEDED);

        // Simulate a crash right after the write was applied but before the
        // confirmation reached the ledger.
        let base = docs.doc.lock().unwrap().clone();
        let (end, plan) = plan_for(&config, &base, &notes);
        let pending = PendingTransfer::new("doc-1", base.revision_id.clone(), end, &notes, &plan);
        Ledger::new(config.ledger_path()).save(&pending).unwrap();
        docs.apply(&plan.requests);

        let mut source = labeled(notes);
        let summary = Transfer::new(&config, &creds, &mut source, &docs)
            .run()
            .await
            .unwrap();

        assert_eq!(summary.notes_recovered, 2);
        assert_eq!(summary.notes_appended, 0);
        assert_eq!(
            docs.texts_with_style("HEADING_4"),
            vec!["Seed entry", "Idea", "Second"]
        );
        assert_eq!(source.deleted.len(), 2);
    }

    #[tokio::test]
    async fn test_empty_document_is_seeded_with_headings() {
        let dir = tempdir().unwrap();
        let config = config(&dir);
        let creds = creds();
        let mut source = labeled(vec![note("n1", "First ever", 2, 29, 23)]);
        let docs = FakeDocs::new(&[("NORMAL_TEXT", "")]);

        let summary = Transfer::new(&config, &creds, &mut source, &docs)
            .run()
            .await
            .unwrap();

        assert_eq!(summary.headings_added, 3);
        let paragraphs = docs.paragraphs();
        let texts: Vec<&str> = paragraphs.iter().map(|(_, t)| t.as_str()).collect();
        assert_eq!(
            texts,
            vec!["", "2024", "February", "Thursday 29th", "First ever", "11:00pm", "body of First ever"]
        );
    }

    #[tokio::test]
    async fn test_malformed_heading_stops_before_any_write() {
        let dir = tempdir().unwrap();
        let config = config(&dir);
        let creds = creds();
        let mut source = labeled(vec![note("n1", "Idea", 3, 1, 12)]);
        let docs = FakeDocs::new(&[("HEADING_1", "2024"), ("HEADING_2", "Marchember")]);

        let err = Transfer::new(&config, &creds, &mut source, &docs)
            .run()
            .await
            .unwrap_err();

        assert!(matches!(err, SyncError::MalformedHeading { .. }));
        assert_eq!(*docs.batches.lock().unwrap(), 0);
        assert!(source.deleted.is_empty());
        assert!(Ledger::new(config.ledger_path()).load().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_overlapping_run_is_refused() {
        let dir = tempdir().unwrap();
        let config = config(&dir);
        let creds = creds();
        let mut source = labeled(vec![note("n1", "Idea", 3, 1, 12)]);
        let docs = FakeDocs::new(SEEDED);

        let _held = RunLock::acquire(&config.lock_path()).unwrap();
        let err = Transfer::new(&config, &creds, &mut source, &docs)
            .run()
            .await
            .unwrap_err();

        assert!(matches!(err, SyncError::AlreadyRunning(_)));
        assert_eq!(source.logins, 0);
        assert_eq!(*docs.reads.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_consecutive_runs_keep_one_group_per_day() {
        let dir = tempdir().unwrap();
        let config = config(&dir);
        let creds = creds();
        let docs = FakeDocs::new(SEEDED);

        let mut source = labeled(vec![note("a", "a", 3, 1, 10), note("b", "b", 3, 2, 10)]);
        Transfer::new(&config, &creds, &mut source, &docs)
            .run()
            .await
            .unwrap();

        let mut source = labeled(vec![note("c", "c", 3, 2, 18), note("d", "d", 4, 1, 7)]);
        Transfer::new(&config, &creds, &mut source, &docs)
            .run()
            .await
            .unwrap();

        assert_eq!(docs.texts_with_style("HEADING_1"), vec!["2024"]);
        assert_eq!(docs.texts_with_style("HEADING_2"), vec!["March", "April"]);
        assert_eq!(
            docs.texts_with_style("HEADING_3"),
            vec!["Friday 1st", "Saturday 2nd", "Monday 1st"]
        );
        assert_eq!(
            docs.texts_with_style("HEADING_4"),
            vec!["Seed entry", "a", "b", "c", "d"]
        );
    }

    #[tokio::test]
    async fn test_unlanded_write_with_repeated_title_is_sent_again() {
        let dir = tempdir().unwrap();
        let config = config(&dir);
        let creds = creds();
        let seeded = &[
            ("HEADING_1", "2024"),
            ("HEADING_2", "March"),
            ("HEADING_3", "Friday 1st"),
            ("HEADING_4", "Daily log"),
            ("HEADING_5", "8:00am"),
            ("NORMAL_TEXT", "coffee"),
        ];
        let mut source = labeled(vec![note("n1", "Daily log", 3, 1, 12)]);

        let broken = FakeDocs::failing(seeded);
        Transfer::new(&config, &creds, &mut source, &broken)
            .run()
            .await
            .unwrap_err();
        assert!(source.deleted.is_empty());

        // Someone edits the document before the rerun
        let docs = FakeDocs::new(seeded);
        docs.doc.lock().unwrap().revision_id = Some("rev-7".to_string());

        let summary = Transfer::new(&config, &creds, &mut source, &docs)
            .run()
            .await
            .unwrap();

        assert_eq!(summary.notes_recovered, 0);
        assert_eq!(summary.notes_appended, 1);
        assert_eq!(*docs.batches.lock().unwrap(), 1);
        assert_eq!(
            docs.texts_with_style("HEADING_4"),
            vec!["Daily log", "Daily log"]
        );
        assert_eq!(
            docs.texts_with_style("NORMAL_TEXT"),
            vec!["coffee", "body of Daily log"]
        );
        assert_eq!(source.deleted, vec!["n1".to_string()]);
    }

    #[test]
    fn test_write_landed_needs_planned_growth_and_tail() {
        let dir = tempdir().unwrap();
        let config = config(&dir);
        let notes = vec![note("n1", "", 3, 1, 12), note("n2", "", 3, 1, 13)];
        let docs = FakeDocs::new(SEEDED);
        let base = docs.doc.lock().unwrap().clone();
        let (end, plan) = plan_for(&config, &base, &notes);
        let pending = PendingTransfer::new("doc-1", base.revision_id.clone(), end, &notes, &plan);

        assert!(!write_landed(&base, &pending));

        // Revision moved but nothing was appended
        let mut edited = base.clone();
        edited.revision_id = Some("rev-9".to_string());
        assert!(!write_landed(&edited, &pending));

        // Only the first entry made it
        let partial = FakeDocs::new(SEEDED);
        partial.apply(&plan.requests[..6]);
        assert!(!write_landed(&partial.doc.lock().unwrap(), &pending));

        docs.apply(&plan.requests);
        let written = docs.doc.lock().unwrap().clone();
        assert!(write_landed(&written, &pending));

        // Same growth, but the tail is someone else's text
        let mut replaced = written.clone();
        if let Some(paragraph) = replaced
            .body
            .content
            .last_mut()
            .and_then(|e| e.paragraph.as_mut())
        {
            paragraph.elements[0].text_run = Some(TextRun {
                content: "body of ??\n".to_string(),
            });
        }
        assert!(!write_landed(&replaced, &pending));
    }
}
