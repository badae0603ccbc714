//! Application context: configuration, store and clock wired together.
//!
//! Front ends build one `AppContext` at startup and route every user action
//! through it. Each action reloads the store, so another process's writes are
//! always visible.

use crate::clock::Clock;
use crate::engine::{estimate, EngineInput, Estimate, EstimationMode};
use crate::session;
use crate::stats::{self, Period, PeriodSummary};
use crate::store::{resolve_session, FileStore, ProfileStore, SessionStore};
use crate::{
    Config, DrinkKind, DrinkingSession, Error, ProfilePatch, Result, SessionPatch, UserProfile,
};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, Utc};
use std::collections::BTreeSet;
use std::sync::Arc;
use uuid::Uuid;

pub struct AppContext {
    pub config: Config,
    pub user_id: String,
    pub store: FileStore,
    pub clock: Arc<dyn Clock>,
    offset: FixedOffset,
}

impl AppContext {
    pub fn new(config: Config, clock: Arc<dyn Clock>) -> Result<Self> {
        config.validate()?;
        let offset = config.display.offset()?;
        let user_id = config.user.id.trim().to_string();
        let store = FileStore::open(&config.data.data_dir, &user_id, Arc::clone(&clock));
        tracing::debug!("Using store at {:?}", store.user_dir());
        Ok(Self {
            config,
            user_id,
            store,
            clock,
            offset,
        })
    }

    pub fn mode(&self) -> EstimationMode {
        self.config.estimation.mode
    }

    pub fn offset(&self) -> &FixedOffset {
        &self.offset
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Today's date in the display timezone
    pub fn today(&self) -> NaiveDate {
        self.now().with_timezone(&self.offset).date_naive()
    }

    // ------------------------------------------------------------------
    // Profile
    // ------------------------------------------------------------------

    pub fn profile(&self) -> Result<Option<UserProfile>> {
        self.store.load_profile()
    }

    pub fn require_profile(&self) -> Result<UserProfile> {
        self.profile()?.ok_or(Error::ProfileMissing)
    }

    pub fn update_profile(&self, patch: ProfilePatch) -> Result<UserProfile> {
        if patch.is_empty() {
            return self.require_profile();
        }
        self.store.merge_profile(patch)
    }

    // ------------------------------------------------------------------
    // Sessions
    // ------------------------------------------------------------------

    pub fn sessions(&self) -> Result<Vec<DrinkingSession>> {
        self.store.list_sessions()
    }

    /// Look a session up by id or unique id prefix
    pub fn find(&self, query: &str) -> Result<DrinkingSession> {
        let sessions = self.sessions()?;
        resolve_session(&sessions, query).cloned()
    }

    /// Fresh session and profile for one refresh of a live display
    pub fn refresh(&self, session_id: Uuid) -> Result<(DrinkingSession, UserProfile)> {
        let profile = self.require_profile()?;
        let session = self.find(&session_id.to_string())?;
        Ok((session, profile))
    }

    pub fn create_session(&self, event_name: &str, date: Option<NaiveDate>) -> Result<DrinkingSession> {
        let date = date.unwrap_or_else(|| self.today());
        let session = session::new_session(event_name, date, &self.offset)?;
        self.store.create_session(&session)?;
        Ok(session)
    }

    fn commit(&self, mut session: DrinkingSession, patch: SessionPatch) -> Result<DrinkingSession> {
        self.store.merge_session(session.id, &patch)?;
        patch.apply(&mut session);
        Ok(session)
    }

    /// Change one drink count; peak mode also refreshes the stored snapshot
    pub fn adjust_count(&self, query: &str, kind: DrinkKind, delta: i32) -> Result<DrinkingSession> {
        let session = self.find(query)?;
        let mut patch = session::adjust_count(&session, kind, delta);

        if self.mode() == EstimationMode::Peak {
            if let (Some(profile), Some(counts)) = (self.profile()?, patch.counts.as_ref()) {
                patch.peak_percentage = Some(Some(session::peak_snapshot(counts, &profile)));
            }
        }
        self.commit(session, patch)
    }

    /// Stamp the start now, or correct it to `at` on the session's date
    pub fn start(&self, query: &str, at: Option<NaiveTime>) -> Result<DrinkingSession> {
        let session = self.find(query)?;
        let patch = match at {
            Some(time) => session::edit_start(&session, time, &self.offset)?,
            None => session::press_start(&session, self.now())?,
        };
        self.commit(session, patch)
    }

    /// Stamp the end now, or correct it to `at` on the session's date
    pub fn end(&self, query: &str, at: Option<NaiveTime>) -> Result<DrinkingSession> {
        let session = self.find(query)?;
        let patch = match at {
            Some(time) => session::edit_end(&session, time, &self.offset)?,
            None => {
                let profile = self.profile()?;
                session::press_end(&session, self.now(), profile.as_ref())?
            }
        };
        self.commit(session, patch)
    }

    pub fn reopen(&self, query: &str) -> Result<DrinkingSession> {
        let session = self.find(query)?;
        let patch = session::reopen(&session)?;
        self.commit(session, patch)
    }

    pub fn rename(&self, query: &str, new_name: &str) -> Result<DrinkingSession> {
        let session = self.find(query)?;
        let patch = session::rename(new_name)?;
        self.commit(session, patch)
    }

    pub fn delete(&self, query: &str) -> Result<DrinkingSession> {
        let session = self.find(query)?;
        self.store.delete_session(session.id)?;
        Ok(session)
    }

    // ------------------------------------------------------------------
    // Estimates and reports
    // ------------------------------------------------------------------

    /// Run the engine for `session` at the current time
    pub fn estimate(&self, session: &DrinkingSession, profile: &UserProfile) -> Estimate {
        estimate(&EngineInput::from_session(
            session,
            profile,
            self.now(),
            self.mode(),
        ))
    }

    pub fn summary(&self, period: Period, anchor: NaiveDate) -> Result<PeriodSummary> {
        Ok(stats::summarize(&self.sessions()?, period, anchor, &self.offset))
    }

    pub fn calendar(&self, month: Option<(i32, u32)>) -> Result<BTreeSet<NaiveDate>> {
        Ok(stats::drinking_days(&self.sessions()?, &self.offset, month))
    }

    /// Fold the journal into the snapshot, optionally removing old archives
    pub fn rollup(&self, cleanup: bool) -> Result<(usize, usize)> {
        let folded = self.store.compact()?;
        let removed = if cleanup {
            self.store.cleanup_processed()?
        } else {
            0
        };
        Ok((folded, removed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::Gender;
    use chrono::{Duration, TimeZone};

    struct Fixture {
        _dir: tempfile::TempDir,
        clock: Arc<FixedClock>,
        ctx: AppContext,
    }

    fn fixture(mode: EstimationMode) -> Fixture {
        crate::logging::init_test();
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.data.data_dir = dir.path().to_path_buf();
        config.estimation.mode = mode;

        // 2025-03-14 19:00 KST
        let clock = Arc::new(FixedClock::new(
            Utc.with_ymd_and_hms(2025, 3, 14, 10, 0, 0).unwrap(),
        ));
        let ctx = AppContext::new(config, clock.clone()).unwrap();
        Fixture {
            _dir: dir,
            clock,
            ctx,
        }
    }

    fn set_profile(ctx: &AppContext) {
        ctx.update_profile(ProfilePatch {
            name: Some("민수".into()),
            gender: Some(Gender::Male),
            weight_kg: Some(70.0),
            capacity: Some(2.0),
        })
        .unwrap();
    }

    #[test]
    fn test_profile_missing_until_set() {
        let f = fixture(EstimationMode::Live);
        assert!(matches!(f.ctx.require_profile(), Err(Error::ProfileMissing)));
        set_profile(&f.ctx);
        assert_eq!(f.ctx.require_profile().unwrap().weight_kg, 70.0);
    }

    #[test]
    fn test_full_evening() {
        let f = fixture(EstimationMode::Live);
        set_profile(&f.ctx);

        let session = f.ctx.create_session("회식", None).unwrap();
        assert_eq!(
            session.created_at.with_timezone(f.ctx.offset()).date_naive(),
            NaiveDate::from_ymd_opt(2025, 3, 14).unwrap()
        );
        let id = session.short_id();

        f.ctx.start(&id, None).unwrap();
        for _ in 0..7 {
            f.ctx.adjust_count(&id, DrinkKind::Soju, 1).unwrap();
        }
        let live = f.ctx.find(&id).unwrap();
        assert_eq!(live.peak_percentage, None);

        f.clock.advance(Duration::hours(2));
        let ended = f.ctx.end(&id, None).unwrap();
        assert!((ended.peak_percentage.unwrap() - 48.61).abs() < 0.01);

        let profile = f.ctx.require_profile().unwrap();
        let est = f.ctx.estimate(&ended, &profile);
        assert!((est.peak_bac - 0.09805).abs() < 1e-4);
        assert!((est.current_bac - (est.peak_bac - 0.03)).abs() < 1e-9);
        assert_eq!(est.duration.as_deref(), Some("2시간"));

        let reopened = f.ctx.reopen(&id).unwrap();
        assert!(reopened.is_running());
        assert_eq!(f.ctx.find(&id).unwrap().peak_percentage, None);
    }

    #[test]
    fn test_peak_mode_snapshots_on_every_count() {
        let f = fixture(EstimationMode::Peak);
        set_profile(&f.ctx);
        let session = f.ctx.create_session("2차", None).unwrap();
        let id = session.id.to_string();

        let after = f.ctx.adjust_count(&id, DrinkKind::Soju, 7).unwrap();
        assert!((after.peak_percentage.unwrap() - 48.61).abs() < 0.01);
        assert_eq!(f.ctx.find(&id).unwrap().peak_percentage, after.peak_percentage);
    }

    #[test]
    fn test_end_time_edit_rolls_over_midnight() {
        let f = fixture(EstimationMode::Live);
        let session = f
            .ctx
            .create_session("밤샘", Some(NaiveDate::from_ymd_opt(2025, 3, 10).unwrap()))
            .unwrap();
        let id = session.short_id();

        let nine_pm = NaiveTime::from_hms_opt(21, 0, 0).unwrap();
        let one_am = NaiveTime::from_hms_opt(1, 0, 0).unwrap();
        f.ctx.start(&id, Some(nine_pm)).unwrap();
        let ended = f.ctx.end(&id, Some(one_am)).unwrap();

        let hours = (ended.end_time.unwrap() - ended.start_time.unwrap()).num_hours();
        assert_eq!(hours, 4);
    }

    #[test]
    fn test_rename_delete_and_reports() {
        let f = fixture(EstimationMode::Live);
        let a = f.ctx.create_session("a", None).unwrap();
        f.ctx.create_session("b", None).unwrap();

        f.ctx.rename(&a.short_id(), "동창회").unwrap();
        assert_eq!(f.ctx.find(&a.short_id()).unwrap().event_name, "동창회");

        let summary = f.ctx.summary(Period::Monthly, f.ctx.today()).unwrap();
        assert_eq!(summary.session_count, 2);
        assert_eq!(f.ctx.calendar(None).unwrap().len(), 1);

        f.ctx.delete(&a.short_id()).unwrap();
        assert_eq!(f.ctx.sessions().unwrap().len(), 1);
        assert!(matches!(f.ctx.find(&a.short_id()), Err(Error::NotFound(_))));

        let (folded, _) = f.ctx.rollup(true).unwrap();
        assert_eq!(folded, 4);
        assert_eq!(f.ctx.sessions().unwrap().len(), 1);
    }

    #[test]
    fn test_refresh_picks_up_profile_edits() {
        let f = fixture(EstimationMode::Live);
        set_profile(&f.ctx);
        let session = f.ctx.create_session("회식", None).unwrap();
        f.ctx.start(&session.short_id(), None).unwrap();
        f.ctx.adjust_count(&session.short_id(), DrinkKind::Soju, 7).unwrap();

        let (live, profile) = f.ctx.refresh(session.id).unwrap();
        let before = f.ctx.estimate(&live, &profile);

        f.ctx
            .update_profile(ProfilePatch {
                weight_kg: Some(50.0),
                ..Default::default()
            })
            .unwrap();
        f.clock.advance(Duration::seconds(1));

        let (live, profile) = f.ctx.refresh(session.id).unwrap();
        assert_eq!(profile.weight_kg, 50.0);
        let after = f.ctx.estimate(&live, &profile);
        assert!(after.peak_bac > before.peak_bac);
        assert!((after.peak_bac - before.peak_bac * 70.0 / 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_refresh_sees_deleted_session() {
        let f = fixture(EstimationMode::Live);
        set_profile(&f.ctx);
        let session = f.ctx.create_session("a", None).unwrap();
        f.ctx.delete(&session.short_id()).unwrap();
        assert!(matches!(f.ctx.refresh(session.id), Err(Error::NotFound(_))));
    }
}
