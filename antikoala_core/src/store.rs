//! Profile and session stores.
//!
//! The traits are what the rest of the system talks to. `FileStore` keeps one
//! directory per user:
//!
//! ```text
//! <data_dir>/users/<user_id>/
//!     profile.json
//!     sessions.wal      (journal, replayed on every read)
//!     sessions.csv      (compacted snapshot)
//! ```

use crate::clock::Clock;
use crate::profile::ProfileDocument;
use crate::wal::{JournalEntry, JournalSink, JsonlJournal};
use crate::{DrinkingSession, Error, ProfilePatch, Result, SessionPatch, UserProfile};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use uuid::Uuid;

pub trait ProfileStore {
    fn load_profile(&self) -> Result<Option<UserProfile>>;
    fn save_profile(&self, profile: &UserProfile) -> Result<()>;
    fn merge_profile(&self, patch: ProfilePatch) -> Result<UserProfile>;
}

pub trait SessionStore {
    fn get_session(&self, id: Uuid) -> Result<Option<DrinkingSession>>;

    /// All sessions, newest `created_at` first
    fn list_sessions(&self) -> Result<Vec<DrinkingSession>>;

    fn create_session(&self, session: &DrinkingSession) -> Result<()>;

    /// Apply only the fields present in `patch`
    fn merge_session(&self, id: Uuid, patch: &SessionPatch) -> Result<()>;

    fn delete_session(&self, id: Uuid) -> Result<()>;
}

/// Find a session by full id or a unique prefix of its hex form
pub fn resolve_session<'a>(
    sessions: &'a [DrinkingSession],
    query: &str,
) -> Result<&'a DrinkingSession> {
    let query = query.trim().to_ascii_lowercase();
    if let Ok(id) = Uuid::parse_str(&query) {
        return sessions
            .iter()
            .find(|s| s.id == id)
            .ok_or_else(|| Error::NotFound(format!("session {}", query)));
    }

    let needle = query.replace('-', "");
    if needle.is_empty() {
        return Err(Error::Validation("session id must not be empty".into()));
    }

    let mut matches = sessions
        .iter()
        .filter(|s| s.id.simple().to_string().starts_with(&needle));
    match (matches.next(), matches.next()) {
        (Some(session), None) => Ok(session),
        (None, _) => Err(Error::NotFound(format!("session {}", query))),
        (Some(_), Some(_)) => Err(Error::Validation(format!(
            "session id prefix '{}' is ambiguous",
            query
        ))),
    }
}

/// File-backed store for one user
pub struct FileStore {
    user_dir: PathBuf,
    profile: ProfileDocument,
    clock: Arc<dyn Clock>,
}

impl FileStore {
    pub fn open(data_dir: &Path, user_id: &str, clock: Arc<dyn Clock>) -> Self {
        let user_dir = data_dir.join("users").join(user_id);
        let profile = ProfileDocument::new(user_dir.join("profile.json"));
        Self {
            user_dir,
            profile,
            clock,
        }
    }

    pub fn user_dir(&self) -> &Path {
        &self.user_dir
    }

    pub fn journal_path(&self) -> PathBuf {
        self.user_dir.join("sessions.wal")
    }

    pub fn snapshot_path(&self) -> PathBuf {
        self.user_dir.join("sessions.csv")
    }

    /// Fold the journal into the CSV snapshot
    pub fn compact(&self) -> Result<usize> {
        crate::csv_rollup::compact(&self.journal_path(), &self.snapshot_path())
    }

    /// Remove journals archived by earlier compactions
    pub fn cleanup_processed(&self) -> Result<usize> {
        crate::csv_rollup::cleanup_processed_journals(&self.user_dir)
    }

    fn append(&self, entry: JournalEntry) -> Result<()> {
        JsonlJournal::new(self.journal_path()).append(&entry)
    }

    fn require(&self, id: Uuid) -> Result<()> {
        match self.get_session(id)? {
            Some(_) => Ok(()),
            None => Err(Error::NotFound(format!("session {}", id))),
        }
    }
}

impl ProfileStore for FileStore {
    fn load_profile(&self) -> Result<Option<UserProfile>> {
        self.profile.load()
    }

    fn save_profile(&self, profile: &UserProfile) -> Result<()> {
        self.profile.save(profile)
    }

    fn merge_profile(&self, patch: ProfilePatch) -> Result<UserProfile> {
        self.profile.merge(patch)
    }
}

impl SessionStore for FileStore {
    fn get_session(&self, id: Uuid) -> Result<Option<DrinkingSession>> {
        Ok(self.list_sessions()?.into_iter().find(|s| s.id == id))
    }

    fn list_sessions(&self) -> Result<Vec<DrinkingSession>> {
        crate::history::load_sessions(&self.snapshot_path(), &self.journal_path())
    }

    fn create_session(&self, session: &DrinkingSession) -> Result<()> {
        self.append(JournalEntry::Create {
            recorded_at: self.clock.now(),
            session: session.clone(),
        })?;
        tracing::info!("Created session {} ({})", session.short_id(), session.event_name);
        Ok(())
    }

    fn merge_session(&self, id: Uuid, patch: &SessionPatch) -> Result<()> {
        if patch.is_empty() {
            return Ok(());
        }
        self.require(id)?;
        self.append(JournalEntry::Merge {
            recorded_at: self.clock.now(),
            id,
            patch: patch.clone(),
        })
    }

    fn delete_session(&self, id: Uuid) -> Result<()> {
        self.require(id)?;
        self.append(JournalEntry::Delete {
            recorded_at: self.clock.now(),
            id,
        })?;
        tracing::info!("Deleted session {}", id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::{DrinkKind, Gender};
    use chrono::{TimeZone, Utc};

    fn store_in(dir: &Path) -> FileStore {
        let clock = Arc::new(FixedClock::new(
            Utc.with_ymd_and_hms(2025, 5, 2, 12, 0, 0).unwrap(),
        ));
        FileStore::open(dir, "tester", clock)
    }

    fn session(name: &str, day: u32) -> DrinkingSession {
        DrinkingSession::new(name, Utc.with_ymd_and_hms(2025, 5, day, 0, 0, 0).unwrap())
    }

    #[test]
    fn test_layout_is_per_user() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = store_in(temp_dir.path());
        assert_eq!(store.user_dir(), temp_dir.path().join("users").join("tester"));

        store
            .save_profile(&UserProfile {
                name: "a".into(),
                gender: Gender::Male,
                weight_kg: 70.0,
                capacity: 1.0,
            })
            .unwrap();
        assert!(store.user_dir().join("profile.json").exists());
    }

    #[test]
    fn test_create_merge_delete() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = store_in(temp_dir.path());

        let s = session("회식", 1);
        store.create_session(&s).unwrap();

        let patch = SessionPatch {
            counts: Some(s.counts.adjusted(DrinkKind::Beer, 3)),
            ..Default::default()
        };
        store.merge_session(s.id, &patch).unwrap();
        let loaded = store.get_session(s.id).unwrap().unwrap();
        assert_eq!(loaded.counts.get(DrinkKind::Beer), 3);
        assert_eq!(loaded.event_name, "회식");

        store.delete_session(s.id).unwrap();
        assert_eq!(store.get_session(s.id).unwrap(), None);
        assert!(matches!(
            store.merge_session(s.id, &patch),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_list_survives_compaction() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = store_in(temp_dir.path());

        store.create_session(&session("old", 1)).unwrap();
        store.create_session(&session("new", 3)).unwrap();
        assert_eq!(store.compact().unwrap(), 2);

        store.create_session(&session("mid", 2)).unwrap();
        let names: Vec<_> = store
            .list_sessions()
            .unwrap()
            .into_iter()
            .map(|s| s.event_name)
            .collect();
        assert_eq!(names, vec!["new", "mid", "old"]);

        assert_eq!(store.cleanup_processed().unwrap(), 1);
    }

    #[test]
    fn test_resolve_session_by_prefix() {
        let sessions = vec![session("a", 1), session("b", 2)];
        let full = sessions[0].id.to_string();

        assert_eq!(resolve_session(&sessions, &full).unwrap().event_name, "a");
        assert_eq!(
            resolve_session(&sessions, &sessions[1].short_id())
                .unwrap()
                .event_name,
            "b"
        );
        assert!(matches!(
            resolve_session(&sessions, "zzzz"),
            Err(Error::NotFound(_))
        ));
        assert!(matches!(
            resolve_session(&sessions, ""),
            Err(Error::Validation(_))
        ));
    }
}
