//! Single-slot store for a reviewed run awaiting apply.
//!
//! The slot is one JSON file. It is either absent or holds exactly one run;
//! saving over an existing run is refused. A file that cannot be read or
//! parsed counts as absent so it never blocks a new run.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::model::{Category, ClassificationResult, MessageRef, ResultSource};
use crate::storage::write_new;
use crate::{Error, Result};

/// One stored decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingEntry {
    /// Account nickname the message belongs to.
    pub account: String,
    /// The reviewed result.
    pub result: ClassificationResult,
    /// Subject, kept for display.
    pub subject: String,
    /// Sender, kept for display.
    pub sender: String,
}

/// A saved run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingRun {
    /// When the run was saved.
    pub created_at: DateTime<Utc>,
    /// Entries in review order.
    pub entries: Vec<PendingEntry>,
}

impl PendingRun {
    /// Pairs `results` with their messages by id. Results without a message are dropped.
    #[must_use]
    pub fn from_results(
        account: &str,
        messages: &[MessageRef],
        results: &[ClassificationResult],
    ) -> Self {
        let by_id: HashMap<&str, &MessageRef> =
            messages.iter().map(|m| (m.id.as_str(), m)).collect();

        let entries = results
            .iter()
            .filter_map(|result| {
                by_id.get(result.message_id()).map(|message| PendingEntry {
                    account: account.to_string(),
                    result: result.clone(),
                    subject: message.subject.clone(),
                    sender: message.sender.clone(),
                })
            })
            .collect();

        Self {
            created_at: Utc::now(),
            entries,
        }
    }

    /// Number of entries not marked skip.
    #[must_use]
    pub fn actionable(&self) -> usize {
        self.entries.iter().filter(|e| !e.result.skip()).count()
    }
}

/// Whether the slot holds a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingState {
    /// Nothing stored (or the file is unreadable).
    Absent,
    /// A run is stored.
    Present(PendingRun),
}

enum Slot {
    Missing,
    Unreadable,
    Stored(PendingRun),
}

#[derive(Debug, Serialize, Deserialize)]
struct PendingFile {
    #[serde(default)]
    created_at: String,
    #[serde(default)]
    results: Vec<PendingRecord>,
}

#[derive(Debug, Serialize, Deserialize)]
struct PendingRecord {
    #[serde(default)]
    account: String,
    #[serde(default)]
    email_id: String,
    #[serde(default = "default_category")]
    category: String,
    #[serde(default)]
    skip: bool,
    #[serde(default)]
    subject: String,
    #[serde(default)]
    sender: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    reason: Option<String>,
    /// Absent in files written before sources were recorded; read as model output.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    source: Option<ResultSource>,
}

fn default_category() -> String {
    Category::Fyi.as_str().to_string()
}

impl From<&PendingRun> for PendingFile {
    fn from(run: &PendingRun) -> Self {
        Self {
            created_at: run.created_at.to_rfc3339(),
            results: run
                .entries
                .iter()
                .map(|e| PendingRecord {
                    account: e.account.clone(),
                    email_id: e.result.message_id().to_string(),
                    category: e.result.category().as_str().to_string(),
                    skip: e.result.skip(),
                    subject: e.subject.clone(),
                    sender: e.sender.clone(),
                    reason: Some(e.result.reason().to_string()).filter(|r| !r.is_empty()),
                    source: Some(e.result.source()),
                })
                .collect(),
        }
    }
}

impl From<PendingFile> for PendingRun {
    fn from(file: PendingFile) -> Self {
        let entries = file
            .results
            .into_iter()
            .map(|record| {
                let (category, source) = match Category::try_parse(&record.category) {
                    Some(category) => (category, record.source.unwrap_or_default()),
                    None => {
                        warn!(
                            "Unknown category '{}' for {} in pending file, using FYI",
                            record.category, record.email_id
                        );
                        (Category::Fyi, ResultSource::Fallback)
                    }
                };
                PendingEntry {
                    result: ClassificationResult::restored(
                        record.email_id,
                        category,
                        record.reason.unwrap_or_default(),
                        record.skip,
                        source,
                    ),
                    account: record.account,
                    subject: record.subject,
                    sender: record.sender,
                }
            })
            .collect();

        Self {
            created_at: parse_created_at(&file.created_at).unwrap_or_else(Utc::now),
            entries,
        }
    }
}

/// Accepts RFC 3339 and naive local ISO timestamps.
fn parse_created_at(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    let naive = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f").ok()?;
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
}

/// File-backed pending slot.
#[derive(Debug, Clone)]
pub struct PendingStore {
    path: PathBuf,
}

impl PendingStore {
    /// Creates a store over `path`. Nothing is read until asked.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Backing file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the slot. Unreadable or corrupt files are reported as absent.
    #[must_use]
    pub fn state(&self) -> PendingState {
        match self.read_slot() {
            Slot::Stored(run) => PendingState::Present(run),
            Slot::Missing | Slot::Unreadable => PendingState::Absent,
        }
    }

    fn read_slot(&self) -> Slot {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Slot::Missing,
            Err(e) => {
                warn!("Ignoring unreadable pending file {}: {e}", self.path.display());
                return Slot::Unreadable;
            }
        };

        match serde_json::from_str::<PendingFile>(&contents) {
            Ok(file) => Slot::Stored(file.into()),
            Err(e) => {
                warn!("Ignoring corrupt pending file {}: {e}", self.path.display());
                Slot::Unreadable
            }
        }
    }

    /// Returns the stored run, if any.
    #[must_use]
    pub fn load(&self) -> Option<PendingRun> {
        match self.state() {
            PendingState::Present(run) => Some(run),
            PendingState::Absent => None,
        }
    }

    /// Whether a run is stored.
    #[must_use]
    pub fn is_present(&self) -> bool {
        matches!(self.state(), PendingState::Present(_))
    }

    /// Fails with [`Error::PendingExists`] when a run is stored.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PendingExists`] if the slot is occupied.
    pub fn ensure_absent(&self) -> Result<()> {
        if self.is_present() {
            return Err(Error::PendingExists);
        }
        Ok(())
    }

    /// Saves one account's results.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PendingExists`] without touching the stored run if the
    /// slot is occupied, or an I/O error if the write fails.
    pub fn save(
        &self,
        account: &str,
        messages: &[MessageRef],
        results: &[ClassificationResult],
    ) -> Result<()> {
        self.save_run(&PendingRun::from_results(account, messages, results))
    }

    /// Saves a prepared run (possibly spanning several accounts).
    ///
    /// The final write refuses to replace a file, so a run saved concurrently
    /// by another process is never overwritten.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PendingExists`] if the slot is occupied, or an I/O error.
    pub fn save_run(&self, run: &PendingRun) -> Result<()> {
        match self.read_slot() {
            Slot::Stored(_) => return Err(Error::PendingExists),
            Slot::Unreadable => {
                self.discard()?;
            }
            Slot::Missing => {}
        }

        let json = serde_json::to_string_pretty(&PendingFile::from(run))?;
        write_new(&self.path, json.as_bytes()).map_err(|e| {
            if e.kind() == std::io::ErrorKind::AlreadyExists {
                Error::PendingExists
            } else {
                e.into()
            }
        })?;
        info!(
            "Saved {} pending results to {}",
            run.entries.len(),
            self.path.display()
        );
        Ok(())
    }

    /// Empties the slot. Returns whether a file was removed.
    ///
    /// # Errors
    ///
    /// Returns an I/O error other than "not found".
    pub fn discard(&self) -> Result<bool> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                debug!("Discarded pending file {}", self.path.display());
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::testing::message;

    fn store() -> (tempfile::TempDir, PendingStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = PendingStore::new(dir.path().join("pending.json"));
        (dir, store)
    }

    fn sample() -> (Vec<MessageRef>, Vec<ClassificationResult>) {
        let messages = vec![message("a"), message("b"), message("c")];
        let mut skipped = ClassificationResult::classified("b", Category::Archive, "promo");
        skipped.set_skip();
        let results = vec![
            ClassificationResult::classified("a", Category::NeedsReply, "question"),
            skipped,
            ClassificationResult::fallback("c", "Classification failed: timeout"),
        ];
        (messages, results)
    }

    #[test]
    fn test_save_then_load_preserves_decisions() {
        let (_dir, store) = store();
        let (messages, results) = sample();

        store.save("work", &messages, &results).unwrap();
        let run = store.load().unwrap();

        let tuples: Vec<_> = run
            .entries
            .iter()
            .map(|e| (e.result.message_id(), e.result.category(), e.result.skip()))
            .collect();
        assert_eq!(
            tuples,
            vec![
                ("a", Category::NeedsReply, false),
                ("b", Category::Archive, true),
                ("c", Category::Fyi, false),
            ]
        );
        assert_eq!(run.entries[0].account, "work");
        assert_eq!(run.entries[0].subject, "Subject a");
        assert_eq!(run.entries[0].sender, "sender-a@example.com");
        assert_eq!(run.entries[0].result.reason(), "question");
        assert_eq!(run.actionable(), 2);
    }

    #[test]
    fn test_save_rejects_when_present() {
        let (_dir, store) = store();
        let (messages, results) = sample();
        store.save("work", &messages, &results).unwrap();
        let before = std::fs::read_to_string(store.path()).unwrap();

        let err = store.save("home", &messages[..1], &results[..1]).unwrap_err();

        assert!(matches!(err, Error::PendingExists));
        assert_eq!(std::fs::read_to_string(store.path()).unwrap(), before);
    }

    #[test]
    fn test_concurrent_saves_keep_one_run() {
        let (_dir, store) = store();
        let (messages, results) = sample();

        let outcomes: Vec<_> = std::thread::scope(|scope| {
            let handles: Vec<_> = ["work", "home", "school", "club"]
                .into_iter()
                .map(|account| {
                    let (store, messages, results) = (&store, &messages, &results);
                    scope.spawn(move || {
                        store
                            .save(account, messages, results)
                            .map_err(|e| matches!(e, Error::PendingExists))
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(outcomes.iter().all(|r| *r != Err(false)));
        let run = store.load().unwrap();
        assert!(run.entries.iter().all(|e| e.account == run.entries[0].account));
    }

    #[test]
    fn test_discard_is_idempotent() {
        let (_dir, store) = store();
        let (messages, results) = sample();
        store.save("work", &messages, &results).unwrap();

        assert!(store.discard().unwrap());
        assert!(!store.discard().unwrap());
        assert_eq!(store.state(), PendingState::Absent);
        store.ensure_absent().unwrap();
    }

    #[test]
    fn test_unknown_category_loads_as_fyi() {
        let (_dir, store) = store();
        std::fs::write(
            store.path(),
            r#"{"created_at": "2025-10-14T09:30:00.123456",
                "results": [{"account": "work", "email_id": "x1", "category": "URGENT",
                             "skip": false, "subject": "s", "sender": "f"}]}"#,
        )
        .unwrap();

        let run = store.load().unwrap();
        assert_eq!(run.entries[0].result.category(), Category::Fyi);
        assert_eq!(run.entries[0].result.reason(), "");
    }

    #[test]
    fn test_wrong_case_category_loads_as_fyi() {
        let (_dir, store) = store();
        std::fs::write(
            store.path(),
            r#"{"created_at": "2025-10-14T09:30:00+00:00",
                "results": [{"account": "work", "email_id": "x1", "category": "ignore",
                             "skip": false, "subject": "s", "sender": "f", "source": "model"},
                            {"account": "work", "email_id": "x2", "category": "Archive",
                             "skip": false, "subject": "s", "sender": "f"}]}"#,
        )
        .unwrap();

        let run = store.load().unwrap();
        for entry in &run.entries {
            assert_eq!(entry.result.category(), Category::Fyi);
            assert_eq!(entry.result.source(), ResultSource::Fallback);
        }
    }

    #[test]
    fn test_sources_survive_save_and_load() {
        let (_dir, store) = store();
        let messages = vec![message("a"), message("b"), message("c")];
        let mut manual = ClassificationResult::classified("c", Category::Fyi, "");
        manual.set_category(Category::Ignore);
        let results = vec![
            ClassificationResult::classified("a", Category::Archive, "promo"),
            ClassificationResult::fallback("b", "Classification failed: timeout"),
            manual,
        ];

        store.save("work", &messages, &results).unwrap();
        let sources: Vec<_> = store
            .load()
            .unwrap()
            .entries
            .iter()
            .map(|e| (e.result.category(), e.result.source()))
            .collect();

        assert_eq!(
            sources,
            vec![
                (Category::Archive, ResultSource::Model),
                (Category::Fyi, ResultSource::Fallback),
                (Category::Ignore, ResultSource::Manual),
            ]
        );
    }

    #[test]
    fn test_records_without_source_read_as_model() {
        let (_dir, store) = store();
        std::fs::write(
            store.path(),
            r#"{"created_at": "2025-10-14T09:30:00",
                "results": [{"account": "work", "email_id": "x1", "category": "ARCHIVE",
                             "skip": false, "subject": "s", "sender": "f"}]}"#,
        )
        .unwrap();

        let result = &store.load().unwrap().entries[0].result;
        assert_eq!(result.category(), Category::Archive);
        assert_eq!(result.source(), ResultSource::Model);
    }

    #[test]
    fn test_corrupt_file_is_absent() {
        let (_dir, store) = store();
        std::fs::write(store.path(), "{\"results\": [").unwrap();

        assert_eq!(store.state(), PendingState::Absent);
        let (messages, results) = sample();
        store.save("work", &messages, &results).unwrap();
        assert!(store.is_present());
    }

    #[test]
    fn test_file_stores_category_values() {
        let (_dir, store) = store();
        let (messages, results) = sample();
        store.save("work", &messages, &results).unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(store.path()).unwrap()).unwrap();
        assert_eq!(raw["results"][0]["category"], "NEEDS_REPLY");
        assert_eq!(raw["results"][0]["email_id"], "a");
        assert_eq!(raw["results"][1]["skip"], true);
        assert!(raw["created_at"].as_str().is_some());
    }

    #[test]
    fn test_parse_created_at_formats() {
        assert!(parse_created_at("2025-10-14T09:30:00+02:00").is_some());
        assert!(parse_created_at("2025-10-14T09:30:00.5").is_some());
        assert!(parse_created_at("yesterday").is_none());
    }

    #[test]
    fn test_results_without_message_are_dropped() {
        let messages = vec![message("a")];
        let results = vec![
            ClassificationResult::classified("a", Category::Fyi, ""),
            ClassificationResult::classified("ghost", Category::Fyi, ""),
        ];
        let run = PendingRun::from_results("work", &messages, &results);
        assert_eq!(run.entries.len(), 1);
    }
}
