//! Estimation engine: drink counts to alcohol mass, BAC and capacity usage.
//!
//! Everything here is a pure function of its inputs. The engine never reads
//! the store or the clock; callers pass `now` in and may call it on every tick.
//!
//! ## Model
//!
//! 1. **Consumed mass**: `Σ count × volume × ABV × 0.789` grams of ethanol
//! 2. **Capacity usage**: consumed mass over the user's tolerance in reference
//!    soju bottles (360 mL at 16.9 %), as a percentage
//! 3. **Peak BAC** (Widmark): `grams / (weight_g × r) × 100`
//! 4. **Elimination**: linear at 0.015 %/h from the session start
//! 5. **Duration** and **tiers** for display

use crate::catalog::{drink_catalog, Catalog};
use crate::tiers::{capacity_color, capacity_message, LegalStatus, TierColor};
use crate::{DrinkCounts, DrinkingSession, UserProfile};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Density of ethanol, g/mL
pub const ALCOHOL_DENSITY: f64 = 0.789;

/// Linear BAC elimination, percentage points per hour
pub const BAC_ELIMINATION_RATE: f64 = 0.015;

/// Grams of ethanol in the reference soju bottle (360 mL, 16.9 %)
pub const SOJU_BOTTLE_GRAMS: f64 = 360.0 * 0.169 * ALCOHOL_DENSITY;

/// Sessions shorter than this are treated as noise and get no duration
const MIN_DURATION_MS: i64 = 60_000;

const MS_PER_HOUR: i64 = 3_600_000;
const MS_PER_MINUTE: f64 = 60_000.0;

/// Which BAC the engine reports as "current"
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EstimationMode {
    /// BAC decays from the peak as time passes
    #[default]
    Live,
    /// Only the peak is reported; no decay subtraction
    Peak,
}

impl FromStr for EstimationMode {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "live" => Ok(EstimationMode::Live),
            "peak" => Ok(EstimationMode::Peak),
            other => Err(crate::Error::Validation(format!(
                "Unknown estimation mode: {} (expected live or peak)",
                other
            ))),
        }
    }
}

/// Plain-data engine input
#[derive(Clone, Debug)]
pub struct EngineInput<'a> {
    pub counts: &'a DrinkCounts,
    pub profile: &'a UserProfile,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub now: DateTime<Utc>,
    pub mode: EstimationMode,
}

impl<'a> EngineInput<'a> {
    pub fn from_session(
        session: &'a DrinkingSession,
        profile: &'a UserProfile,
        now: DateTime<Utc>,
        mode: EstimationMode,
    ) -> Self {
        Self {
            counts: &session.counts,
            profile,
            start_time: session.start_time,
            end_time: session.end_time,
            now,
            mode,
        }
    }
}

/// Everything the front end displays for one session
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Estimate {
    pub mode: EstimationMode,
    /// Total ethanol drunk, grams
    pub consumed_grams: f64,
    /// Ethanol still in the body, grams (equals consumed in peak mode)
    pub current_grams: f64,
    pub peak_bac: f64,
    /// Decayed BAC (equals peak in peak mode)
    pub current_bac: f64,
    /// Capacity usage, unbounded above
    pub percentage: f64,
    pub sober_at: Option<DateTime<Utc>>,
    pub duration: Option<String>,
    pub capacity_color: TierColor,
    pub capacity_message: &'static str,
    pub legal_status: LegalStatus,
}

impl Estimate {
    /// Bar width for the capacity gauge, 0..=100
    pub fn gauge_width(&self) -> f64 {
        self.percentage.clamp(0.0, 100.0)
    }

    pub fn legal_color(&self) -> TierColor {
        self.legal_status.color()
    }

    pub fn legal_message(&self) -> &'static str {
        self.legal_status.message()
    }
}

/// Run the full model against the built-in catalog
pub fn estimate(input: &EngineInput<'_>) -> Estimate {
    estimate_with_catalog(drink_catalog(), input)
}

/// Run the full model against a specific catalog
pub fn estimate_with_catalog(catalog: &Catalog, input: &EngineInput<'_>) -> Estimate {
    let consumed = consumed_grams(catalog, input.counts);
    let percentage = capacity_percentage(consumed, input.profile.capacity);

    let peak = match input.start_time {
        Some(_) if consumed > 0.0 => peak_bac(consumed, input.profile),
        _ => 0.0,
    };
    let sober_at = input.start_time.and_then(|start| sober_at(start, peak));

    let (current_bac, current_grams) = match (input.mode, input.start_time) {
        (EstimationMode::Live, Some(start)) => {
            let current = decayed_bac(peak, start, input.now);
            (current, grams_for_bac(current, input.profile))
        }
        (EstimationMode::Live, None) => (0.0, 0.0),
        (EstimationMode::Peak, _) => (peak, consumed),
    };

    let estimate = Estimate {
        mode: input.mode,
        consumed_grams: consumed,
        current_grams,
        peak_bac: peak,
        current_bac,
        percentage,
        sober_at,
        duration: format_duration(input.start_time, input.end_time),
        capacity_color: capacity_color(percentage),
        capacity_message: capacity_message(percentage),
        legal_status: LegalStatus::from_bac(current_bac),
    };

    tracing::trace!(
        consumed = estimate.consumed_grams,
        peak = estimate.peak_bac,
        current = estimate.current_bac,
        "estimate computed"
    );

    estimate
}

/// Grams of ethanol for a set of counts
pub fn consumed_grams(catalog: &Catalog, counts: &DrinkCounts) -> f64 {
    counts
        .iter()
        .filter_map(|(kind, count)| {
            catalog
                .get(kind)
                .map(|info| f64::from(count) * info.grams_per_glass())
        })
        .sum()
}

/// Consumed grams as a percentage of the user's capacity
///
/// Zero capacity yields 0 rather than NaN or infinity.
pub fn capacity_percentage(consumed_grams: f64, capacity_bottles: f64) -> f64 {
    let capacity_grams = capacity_bottles * SOJU_BOTTLE_GRAMS;
    if capacity_grams > 0.0 {
        consumed_grams / capacity_grams * 100.0
    } else {
        0.0
    }
}

/// Widmark peak BAC, percent
pub fn peak_bac(consumed_grams: f64, profile: &UserProfile) -> f64 {
    consumed_grams / distribution_mass(profile) * 100.0
}

/// Hours until a BAC is fully eliminated
pub fn hours_to_sober(bac: f64) -> f64 {
    bac / BAC_ELIMINATION_RATE
}

/// Projected sober time; defined only for a positive peak
///
/// None when the projection falls outside the representable date range.
pub fn sober_at(start: DateTime<Utc>, peak_bac: f64) -> Option<DateTime<Utc>> {
    if peak_bac <= 0.0 {
        return None;
    }
    let millis = (hours_to_sober(peak_bac) * MS_PER_HOUR as f64).round();
    if !millis.is_finite() || millis >= i64::MAX as f64 {
        return None;
    }
    start.checked_add_signed(Duration::try_milliseconds(millis as i64)?)
}

/// Peak BAC minus linear elimination since `start`, floored at 0
///
/// A start time in the future counts as zero elapsed time.
pub fn decayed_bac(peak_bac: f64, start: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    let elapsed_ms = (now - start).num_milliseconds().max(0);
    let elapsed_hours = elapsed_ms as f64 / MS_PER_HOUR as f64;
    (peak_bac - BAC_ELIMINATION_RATE * elapsed_hours).max(0.0)
}

/// Grams of ethanol still distributed in the body at a given BAC
pub fn grams_for_bac(bac: f64, profile: &UserProfile) -> f64 {
    if bac > 0.0 {
        bac / 100.0 * distribution_mass(profile)
    } else {
        0.0
    }
}

/// Body mass (grams) times the distribution constant
fn distribution_mass(profile: &UserProfile) -> f64 {
    profile.weight_kg * 1000.0 * profile.gender.distribution_constant()
}

/// Split a millisecond span into whole hours and rounded minutes
///
/// A minute count that rounds up to 60 is carried into the hours.
fn hours_and_minutes(millis: i64) -> (i64, i64) {
    let mut hours = millis / MS_PER_HOUR;
    let mut minutes = ((millis % MS_PER_HOUR) as f64 / MS_PER_MINUTE).round() as i64;
    if minutes >= 60 {
        hours += 1;
        minutes -= 60;
    }
    (hours, minutes)
}

/// Elapsed session time, e.g. `"2시간 15분"`
///
/// None when either end is missing or the span is under a minute.
pub fn format_duration(
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
) -> Option<String> {
    let (start, end) = (start?, end?);
    let diff = (end - start).num_milliseconds();
    if diff < MIN_DURATION_MS {
        return None;
    }

    let (hours, minutes) = hours_and_minutes(diff);
    let mut out = String::new();
    if hours > 0 {
        out.push_str(&format!("{}시간 ", hours));
    }
    if minutes > 0 {
        out.push_str(&format!("{}분", minutes));
    }
    Some(out.trim().to_string())
}

/// Time left until sober, e.g. `"해독까지 3시간 5분 남음"`
///
/// None once the sober time has passed.
pub fn remaining_detox(sober_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Option<String> {
    let remaining = (sober_at? - now).num_milliseconds();
    if remaining <= 0 {
        return None;
    }
    let (hours, minutes) = hours_and_minutes(remaining);
    Some(format!("해독까지 {}시간 {}분 남음", hours, minutes))
}
