//! Consumption statistics and the drinking calendar.

use crate::catalog::drink_catalog;
use crate::engine::consumed_grams;
use crate::{DrinkingSession, Error, Result};
use chrono::{Datelike, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Reporting window around an anchor date
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Period {
    #[default]
    Monthly,
    Quarterly,
    Yearly,
}

impl Period {
    /// Whether `date` falls in the same window as `anchor`
    pub fn contains(&self, anchor: NaiveDate, date: NaiveDate) -> bool {
        if date.year() != anchor.year() {
            return false;
        }
        match self {
            Period::Monthly => date.month() == anchor.month(),
            Period::Quarterly => date.month0() / 3 == anchor.month0() / 3,
            Period::Yearly => true,
        }
    }

    /// Chart buckets for this window, all zeroed
    fn empty_buckets(&self, anchor: NaiveDate) -> Vec<Bucket> {
        match self {
            Period::Monthly => (1..=5).map(|w| Bucket::new(format!("{}주차", w))).collect(),
            Period::Quarterly => {
                let first = anchor.month0() / 3 * 3;
                (first..first + 3)
                    .map(|m| Bucket::new(format!("{}월", m + 1)))
                    .collect()
            }
            Period::Yearly => (1..=12).map(|m| Bucket::new(format!("{}월", m))).collect(),
        }
    }

    fn bucket_index(&self, date: NaiveDate) -> usize {
        match self {
            Period::Monthly => ((date.day0() / 7) as usize).min(4),
            Period::Quarterly => (date.month0() % 3) as usize,
            Period::Yearly => date.month0() as usize,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Period::Monthly => "월간",
            Period::Quarterly => "분기",
            Period::Yearly => "연간",
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let key = match self {
            Period::Monthly => "monthly",
            Period::Quarterly => "quarterly",
            Period::Yearly => "yearly",
        };
        f.write_str(key)
    }
}

impl FromStr for Period {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "monthly" | "month" | "m" => Ok(Period::Monthly),
            "quarterly" | "quarter" | "q" => Ok(Period::Quarterly),
            "yearly" | "year" | "y" => Ok(Period::Yearly),
            other => Err(Error::Validation(format!(
                "unknown period '{}', expected monthly, quarterly or yearly",
                other
            ))),
        }
    }
}

/// Grams consumed within one chart bucket
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Bucket {
    pub label: String,
    pub grams: f64,
}

impl Bucket {
    fn new(label: String) -> Self {
        Self { label, grams: 0.0 }
    }
}

/// Totals for one reporting window
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PeriodSummary {
    pub period: Period,
    pub anchor: NaiveDate,
    pub session_count: usize,
    pub total_grams: f64,
    pub average_grams: f64,
    pub buckets: Vec<Bucket>,
}

/// Summarize sessions dated (in the display timezone) within the window
pub fn summarize(
    sessions: &[DrinkingSession],
    period: Period,
    anchor: NaiveDate,
    offset: &FixedOffset,
) -> PeriodSummary {
    let catalog = drink_catalog();
    let mut buckets = period.empty_buckets(anchor);
    let mut session_count = 0;
    let mut total_grams = 0.0;

    for session in sessions {
        let date = session.created_at.with_timezone(offset).date_naive();
        if !period.contains(anchor, date) {
            continue;
        }
        let grams = consumed_grams(catalog, &session.counts);
        buckets[period.bucket_index(date)].grams += grams;
        session_count += 1;
        total_grams += grams;
    }

    let average_grams = if session_count > 0 {
        total_grams / session_count as f64
    } else {
        0.0
    };

    tracing::debug!(
        "{} summary for {}: {} sessions, {:.1} g",
        period,
        anchor,
        session_count,
        total_grams
    );

    PeriodSummary {
        period,
        anchor,
        session_count,
        total_grams,
        average_grams,
        buckets,
    }
}

/// Local dates with at least one session
///
/// With `month` set to `(year, month)` only dates in that month are returned.
pub fn drinking_days(
    sessions: &[DrinkingSession],
    offset: &FixedOffset,
    month: Option<(i32, u32)>,
) -> BTreeSet<NaiveDate> {
    sessions
        .iter()
        .map(|s| s.created_at.with_timezone(offset).date_naive())
        .filter(|d| month.map_or(true, |(y, m)| d.year() == y && d.month() == m))
        .collect()
}

/// Parse `YYYY-MM` into a (year, month) pair
pub fn parse_month(s: &str) -> Result<(i32, u32)> {
    let date = NaiveDate::parse_from_str(&format!("{}-01", s.trim()), "%Y-%m-%d")
        .map_err(|_| Error::Validation(format!("Invalid month '{}', expected YYYY-MM", s)))?;
    Ok((date.year(), date.month()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DrinkKind;
    use chrono::{TimeZone, Utc};

    fn kst() -> FixedOffset {
        FixedOffset::east_opt(9 * 3600).unwrap()
    }

    fn session_on(y: i32, m: u32, d: u32, soju: u32) -> DrinkingSession {
        let created = kst()
            .with_ymd_and_hms(y, m, d, 0, 0, 0)
            .unwrap()
            .with_timezone(&Utc);
        let mut s = DrinkingSession::new("s", created);
        s.counts.set(DrinkKind::Soju, soju);
        s
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_monthly_week_buckets() {
        let sessions = vec![
            session_on(2025, 3, 1, 1),
            session_on(2025, 3, 8, 2),
            session_on(2025, 3, 31, 3),
            session_on(2025, 4, 1, 9),
        ];
        let summary = summarize(&sessions, Period::Monthly, date(2025, 3, 15), &kst());
        let per_glass = drink_catalog().get(DrinkKind::Soju).unwrap().grams_per_glass();

        assert_eq!(summary.session_count, 3);
        assert_eq!(summary.buckets.len(), 5);
        assert_eq!(summary.buckets[0].label, "1주차");
        assert!((summary.buckets[0].grams - per_glass).abs() < 1e-9);
        assert!((summary.buckets[1].grams - 2.0 * per_glass).abs() < 1e-9);
        assert!((summary.buckets[4].grams - 3.0 * per_glass).abs() < 1e-9);
        assert!((summary.average_grams - 2.0 * per_glass).abs() < 1e-9);
    }

    #[test]
    fn test_quarterly_buckets_follow_anchor_quarter() {
        let sessions = vec![session_on(2025, 5, 2, 1), session_on(2025, 6, 30, 1)];
        let summary = summarize(&sessions, Period::Quarterly, date(2025, 4, 1), &kst());

        let labels: Vec<_> = summary.buckets.iter().map(|b| b.label.as_str()).collect();
        assert_eq!(labels, vec!["4월", "5월", "6월"]);
        assert_eq!(summary.buckets[0].grams, 0.0);
        assert!(summary.buckets[1].grams > 0.0);
        assert!(summary.buckets[2].grams > 0.0);
    }

    #[test]
    fn test_yearly_excludes_other_years() {
        let sessions = vec![session_on(2024, 12, 31, 5), session_on(2025, 1, 1, 1)];
        let summary = summarize(&sessions, Period::Yearly, date(2025, 6, 1), &kst());
        assert_eq!(summary.session_count, 1);
        assert_eq!(summary.buckets.len(), 12);
    }

    #[test]
    fn test_empty_window_averages_zero() {
        let summary = summarize(&[], Period::Monthly, date(2025, 1, 1), &kst());
        assert_eq!(summary.session_count, 0);
        assert_eq!(summary.total_grams, 0.0);
        assert_eq!(summary.average_grams, 0.0);
    }

    #[test]
    fn test_local_date_decides_membership() {
        // 2025-04-01 00:00 KST is still March in UTC
        let sessions = vec![session_on(2025, 4, 1, 1)];
        let march = summarize(&sessions, Period::Monthly, date(2025, 3, 1), &kst());
        let april = summarize(&sessions, Period::Monthly, date(2025, 4, 1), &kst());
        assert_eq!(march.session_count, 0);
        assert_eq!(april.session_count, 1);
    }

    #[test]
    fn test_drinking_days_dedup_and_filter() {
        let sessions = vec![
            session_on(2025, 3, 14, 1),
            session_on(2025, 3, 14, 2),
            session_on(2025, 4, 2, 1),
        ];
        let all = drinking_days(&sessions, &kst(), None);
        assert_eq!(all.len(), 2);

        let march = drinking_days(&sessions, &kst(), Some(parse_month("2025-03").unwrap()));
        assert_eq!(march.into_iter().collect::<Vec<_>>(), vec![date(2025, 3, 14)]);
    }

    #[test]
    fn test_period_parsing() {
        assert_eq!("Quarterly".parse::<Period>().unwrap(), Period::Quarterly);
        assert_eq!("y".parse::<Period>().unwrap(), Period::Yearly);
        assert!("weekly".parse::<Period>().is_err());
        assert!(parse_month("2025-13").is_err());
    }
}
