//! Session lifecycle rules.
//!
//! Each user action on a session is a pure function from the current record
//! to a `SessionPatch`. Persisting the patch is the store's job.

use crate::catalog::drink_catalog;
use crate::engine::{capacity_percentage, consumed_grams};
use crate::{DrinkCounts, DrinkKind, DrinkingSession, Error, Result, SessionPatch, UserProfile};
use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, TimeZone, Utc};

/// Parse a time of day written as `HH:MM`
pub fn parse_time_of_day(s: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(s.trim(), "%H:%M")
        .map_err(|_| Error::Validation(format!("Invalid time '{}', expected HH:MM", s)))
}

/// Parse a calendar date written as `YYYY-MM-DD`
pub fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|_| Error::Validation(format!("Invalid date '{}', expected YYYY-MM-DD", s)))
}

fn clean_name(name: &str) -> Result<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(Error::Validation("event name must not be empty".into()));
    }
    Ok(trimmed.to_string())
}

fn local_instant(
    date: NaiveDate,
    time: NaiveTime,
    offset: &FixedOffset,
) -> Result<DateTime<Utc>> {
    offset
        .from_local_datetime(&date.and_time(time))
        .single()
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| Error::Validation(format!("{} {} is not a valid local time", date, time)))
}

/// Calendar date of the session in the display timezone
pub fn session_date(session: &DrinkingSession, offset: &FixedOffset) -> NaiveDate {
    session.created_at.with_timezone(offset).date_naive()
}

/// A new session dated at local midnight of `date`
pub fn new_session(
    event_name: &str,
    date: NaiveDate,
    offset: &FixedOffset,
) -> Result<DrinkingSession> {
    let created_at = local_instant(date, NaiveTime::MIN, offset)?;
    Ok(DrinkingSession::new(clean_name(event_name)?, created_at))
}

/// Capacity usage stored on the record for list views
pub fn peak_snapshot(counts: &DrinkCounts, profile: &UserProfile) -> f64 {
    capacity_percentage(consumed_grams(drink_catalog(), counts), profile.capacity)
}

/// Move one drink count by `delta`, never below zero
pub fn adjust_count(session: &DrinkingSession, kind: DrinkKind, delta: i32) -> SessionPatch {
    SessionPatch {
        counts: Some(session.counts.adjusted(kind, delta)),
        ..Default::default()
    }
}

/// First press of "start": stamp the start time
pub fn press_start(session: &DrinkingSession, now: DateTime<Utc>) -> Result<SessionPatch> {
    if session.start_time.is_some() {
        return Err(Error::Validation(
            "session already started; pass a time to correct it".into(),
        ));
    }
    Ok(SessionPatch {
        start_time: Some(Some(now)),
        ..Default::default()
    })
}

/// First press of "end": stamp the end time and snapshot capacity usage
pub fn press_end(
    session: &DrinkingSession,
    now: DateTime<Utc>,
    profile: Option<&UserProfile>,
) -> Result<SessionPatch> {
    if session.start_time.is_none() {
        return Err(Error::Validation("session has not started yet".into()));
    }
    if session.end_time.is_some() {
        return Err(Error::Validation(
            "session already ended; pass a time to correct it".into(),
        ));
    }
    Ok(SessionPatch {
        end_time: Some(Some(now)),
        peak_percentage: profile.map(|p| Some(peak_snapshot(&session.counts, p))),
        ..Default::default()
    })
}

/// Correct the start time to `time` on the session's date
///
/// A start after the stored end pushes the end forward by one day.
pub fn edit_start(
    session: &DrinkingSession,
    time: NaiveTime,
    offset: &FixedOffset,
) -> Result<SessionPatch> {
    let start = local_instant(session_date(session, offset), time, offset)?;
    let mut patch = SessionPatch {
        start_time: Some(Some(start)),
        ..Default::default()
    };
    if let Some(end) = session.end_time {
        if start > end {
            patch.end_time = Some(Some(end + Duration::days(1)));
        }
    }
    Ok(patch)
}

/// Correct the end time to `time` on the session's date
///
/// An end before the start rolls over to the next day (sessions past midnight).
pub fn edit_end(
    session: &DrinkingSession,
    time: NaiveTime,
    offset: &FixedOffset,
) -> Result<SessionPatch> {
    let start = session
        .start_time
        .ok_or_else(|| Error::Validation("session has not started yet".into()))?;
    let mut end = local_instant(session_date(session, offset), time, offset)?;
    if end < start {
        end += Duration::days(1);
    }
    Ok(SessionPatch {
        end_time: Some(Some(end)),
        ..Default::default()
    })
}

/// Re-open a finished session; the peak snapshot is stale once decay resumes
pub fn reopen(session: &DrinkingSession) -> Result<SessionPatch> {
    if session.end_time.is_none() {
        return Err(Error::Validation("session is still running".into()));
    }
    Ok(SessionPatch {
        end_time: Some(None),
        peak_percentage: Some(None),
        ..Default::default()
    })
}

pub fn rename(new_name: &str) -> Result<SessionPatch> {
    Ok(SessionPatch {
        event_name: Some(clean_name(new_name)?),
        ..Default::default()
    })
}
