//! CSV snapshot of sessions and journal compaction.
//!
//! Compaction materializes the snapshot plus journal, rewrites the snapshot
//! atomically, and archives the journal so the next replay starts clean.

use crate::{DrinkCounts, DrinkKind, DrinkingSession, Error, Result};
use chrono::{DateTime, Utc};
use fs2::FileExt;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tempfile::NamedTempFile;
use uuid::Uuid;

/// One session as a flat CSV row; one count column per drink kind
#[derive(Debug, serde::Serialize, serde::Deserialize)]
struct SnapshotRow {
    id: String,
    event_name: String,
    created_at: String,
    start_time: Option<String>,
    end_time: Option<String>,
    soju: u32,
    beer: u32,
    somac: u32,
    whiskey: u32,
    wine: u32,
    makgeolli: u32,
    highball: u32,
    peak_percentage: Option<f64>,
}

impl From<&DrinkingSession> for SnapshotRow {
    fn from(session: &DrinkingSession) -> Self {
        let c = &session.counts;
        SnapshotRow {
            id: session.id.to_string(),
            event_name: session.event_name.clone(),
            created_at: session.created_at.to_rfc3339(),
            start_time: session.start_time.map(|t| t.to_rfc3339()),
            end_time: session.end_time.map(|t| t.to_rfc3339()),
            soju: c.get(DrinkKind::Soju),
            beer: c.get(DrinkKind::Beer),
            somac: c.get(DrinkKind::Somac),
            whiskey: c.get(DrinkKind::Whiskey),
            wine: c.get(DrinkKind::Wine),
            makgeolli: c.get(DrinkKind::Makgeolli),
            highball: c.get(DrinkKind::Highball),
            peak_percentage: session.peak_percentage,
        }
    }
}

fn parse_time(field: &str, value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::Store(format!("Invalid {} '{}': {}", field, value, e)))
}

impl TryFrom<SnapshotRow> for DrinkingSession {
    type Error = Error;

    fn try_from(row: SnapshotRow) -> Result<Self> {
        let id = Uuid::parse_str(&row.id)
            .map_err(|e| Error::Store(format!("Invalid UUID: {}", e)))?;

        let mut counts = DrinkCounts::default();
        for (kind, count) in [
            (DrinkKind::Soju, row.soju),
            (DrinkKind::Beer, row.beer),
            (DrinkKind::Somac, row.somac),
            (DrinkKind::Whiskey, row.whiskey),
            (DrinkKind::Wine, row.wine),
            (DrinkKind::Makgeolli, row.makgeolli),
            (DrinkKind::Highball, row.highball),
        ] {
            counts.set(kind, count);
        }

        Ok(DrinkingSession {
            id,
            event_name: row.event_name,
            created_at: parse_time("created_at", &row.created_at)?,
            start_time: row
                .start_time
                .as_deref()
                .map(|t| parse_time("start_time", t))
                .transpose()?,
            end_time: row
                .end_time
                .as_deref()
                .map(|t| parse_time("end_time", t))
                .transpose()?,
            counts,
            peak_percentage: row.peak_percentage,
        })
    }
}

/// Read all sessions from a snapshot file
///
/// Rows that fail to parse are logged and skipped.
pub fn read_snapshot(path: &Path) -> Result<Vec<DrinkingSession>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let file = File::open(path)?;
    file.lock_shared()?;

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(BufReader::new(&file));

    let mut sessions = Vec::new();
    for result in reader.deserialize::<SnapshotRow>() {
        match result {
            Ok(row) => match DrinkingSession::try_from(row) {
                Ok(session) => sessions.push(session),
                Err(e) => tracing::warn!("Failed to parse snapshot row: {}", e),
            },
            Err(e) => tracing::warn!("Failed to deserialize snapshot row: {}", e),
        }
    }

    file.unlock()?;
    Ok(sessions)
}

/// Atomically replace the snapshot with `sessions`
pub fn write_snapshot(path: &Path, sessions: &[DrinkingSession]) -> Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| Error::Store(format!("snapshot path {:?} has no parent", path)))?;
    std::fs::create_dir_all(parent)?;

    let temp = NamedTempFile::new_in(parent)?;
    {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(true)
            .from_writer(temp.as_file());
        for session in sessions {
            writer.serialize(SnapshotRow::from(session))?;
        }
        writer.flush()?;
    }
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| Error::Io(e.error))?;
    Ok(())
}

/// Fold the journal into the snapshot and archive the journal
///
/// This function:
/// 1. Takes an exclusive lock on the journal so no append slips in
/// 2. Replays snapshot + journal
/// 3. Rewrites the snapshot (temp file, fsync, rename)
/// 4. Renames the journal to `.wal.processed`
///
/// Returns the number of journal entries folded in.
pub fn compact(journal_path: &Path, snapshot_path: &Path) -> Result<usize> {
    if !journal_path.exists() {
        tracing::info!("No journal to compact");
        return Ok(0);
    }

    let journal = File::open(journal_path)?;
    journal.lock_exclusive()?;

    let entries = crate::wal::parse_entries(BufReader::new(&journal));
    if entries.is_empty() {
        journal.unlock()?;
        tracing::info!("Journal is empty, nothing to compact");
        return Ok(0);
    }

    let result = (|| -> Result<usize> {
        let base = read_snapshot(snapshot_path)?;
        let sessions = crate::history::replay(base, &entries);
        write_snapshot(snapshot_path, &sessions)?;
        tracing::info!("Wrote {} sessions to snapshot", sessions.len());

        let processed_path = journal_path.with_extension("wal.processed");
        std::fs::rename(journal_path, &processed_path)?;
        tracing::info!("Archived journal to {:?}", processed_path);
        Ok(entries.len())
    })();

    journal.unlock()?;
    result
}

/// Remove archived journals in `dir`
pub fn cleanup_processed_journals(dir: &Path) -> Result<usize> {
    if !dir.exists() {
        return Ok(0);
    }

    let mut count = 0;
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().is_some_and(|ext| ext == "processed") {
            std::fs::remove_file(&path)?;
            tracing::debug!("Removed processed journal: {:?}", path);
            count += 1;
        }
    }

    if count > 0 {
        tracing::info!("Cleaned up {} processed journals", count);
    }

    Ok(count)
}
