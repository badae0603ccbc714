//! Session materialization: snapshot plus journal replay.
//!
//! The current set of sessions is the CSV snapshot with every journal entry
//! applied on top, in append order.

use crate::wal::JournalEntry;
use crate::{DrinkingSession, Result};
use std::collections::HashMap;
use std::path::Path;
use uuid::Uuid;

/// Apply journal entries on top of a base set of sessions
///
/// Returns sessions sorted by `created_at`, newest first. Merges or deletes
/// for unknown ids are logged and ignored.
pub fn replay(base: Vec<DrinkingSession>, entries: &[JournalEntry]) -> Vec<DrinkingSession> {
    let mut sessions: HashMap<Uuid, DrinkingSession> =
        base.into_iter().map(|s| (s.id, s)).collect();

    for entry in entries {
        match entry {
            JournalEntry::Create { session, .. } => {
                sessions.insert(session.id, session.clone());
            }
            JournalEntry::Merge { id, patch, .. } => match sessions.get_mut(id) {
                Some(session) => patch.apply(session),
                None => tracing::warn!("Journal merge for unknown session {}", id),
            },
            JournalEntry::Delete { id, .. } => {
                if sessions.remove(id).is_none() {
                    tracing::debug!("Journal delete for unknown session {}", id);
                }
            }
        }
    }

    let mut sessions: Vec<_> = sessions.into_values().collect();
    sort_newest_first(&mut sessions);
    sessions
}

/// Order by `created_at` descending; ties broken by id for a stable listing
pub fn sort_newest_first(sessions: &mut [DrinkingSession]) {
    sessions.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| a.id.cmp(&b.id))
    });
}

/// Load every session for one user from the snapshot and the journal
pub fn load_sessions(snapshot_path: &Path, journal_path: &Path) -> Result<Vec<DrinkingSession>> {
    let base = crate::csv_rollup::read_snapshot(snapshot_path)?;
    let base_count = base.len();
    let entries = crate::wal::read_entries(journal_path)?;
    let sessions = replay(base, &entries);

    tracing::debug!(
        "Materialized {} sessions ({} from snapshot, {} journal entries)",
        sessions.len(),
        base_count,
        entries.len()
    );

    Ok(sessions)
}
