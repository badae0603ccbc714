//! Write-ahead journal for session mutations.
//!
//! Every session change (create, partial merge, delete) is appended to a
//! JSONL file under an exclusive lock. Replaying the journal in order on top
//! of the last snapshot yields the current records; later writes win.

use crate::{DrinkingSession, Result, SessionPatch};
use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// One journaled mutation
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum JournalEntry {
    Create {
        recorded_at: DateTime<Utc>,
        session: DrinkingSession,
    },
    Merge {
        recorded_at: DateTime<Utc>,
        id: Uuid,
        patch: SessionPatch,
    },
    Delete {
        recorded_at: DateTime<Utc>,
        id: Uuid,
    },
}

impl JournalEntry {
    /// Session the entry applies to
    pub fn session_id(&self) -> Uuid {
        match self {
            JournalEntry::Create { session, .. } => session.id,
            JournalEntry::Merge { id, .. } | JournalEntry::Delete { id, .. } => *id,
        }
    }
}

/// Journal sink trait for persisting mutations
pub trait JournalSink {
    fn append(&mut self, entry: &JournalEntry) -> Result<()>;
}

/// JSONL-based journal with file locking
pub struct JsonlJournal {
    path: PathBuf,
}

impl JsonlJournal {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn ensure_parent_dir(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(())
    }
}

impl JournalSink for JsonlJournal {
    fn append(&mut self, entry: &JournalEntry) -> Result<()> {
        self.ensure_parent_dir()?;

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        file.lock_exclusive()?;

        // One write per line keeps concurrent appenders from interleaving
        let mut line = serde_json::to_string(entry)?;
        line.push('\n');
        let written = (&file).write_all(line.as_bytes()).and_then(|_| (&file).flush());

        file.unlock()?;
        written?;

        tracing::debug!("Journaled {} for session {}", op_name(entry), entry.session_id());
        Ok(())
    }
}

fn op_name(entry: &JournalEntry) -> &'static str {
    match entry {
        JournalEntry::Create { .. } => "create",
        JournalEntry::Merge { .. } => "merge",
        JournalEntry::Delete { .. } => "delete",
    }
}

/// Read all entries from a journal file, in append order
///
/// Lines that fail to parse are logged and skipped.
pub fn read_entries(path: &Path) -> Result<Vec<JournalEntry>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let file = File::open(path)?;
    file.lock_shared()?;

    let entries = parse_entries(BufReader::new(&file));

    file.unlock()?;
    tracing::debug!("Read {} journal entries from {:?}", entries.len(), path);
    Ok(entries)
}

/// Parse journal lines from an already-locked reader
pub(crate) fn parse_entries(reader: impl BufRead) -> Vec<JournalEntry> {
    let mut entries = Vec::new();

    for (line_num, line_result) in reader.lines().enumerate() {
        let line = match line_result {
            Ok(line) => line,
            Err(e) => {
                tracing::warn!("Unreadable journal line {}: {}", line_num + 1, e);
                continue;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        match serde_json::from_str::<JournalEntry>(&line) {
            Ok(entry) => entries.push(entry),
            Err(e) => {
                tracing::warn!("Failed to parse journal entry at line {}: {}", line_num + 1, e);
            }
        }
    }

    entries
}
