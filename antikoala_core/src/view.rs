//! Which screen the front end is showing.

use crate::config::DisplayConfig;
use crate::stats::Period;
use chrono::NaiveDate;
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum View {
    /// Session overview, newest first
    List,
    Stats { period: Period, anchor: NaiveDate },
    Detail { session_id: Uuid },
}

impl View {
    /// Seconds between refreshes, or None for a view with no time-dependent values
    ///
    /// A running session's BAC decays every second; remaining-detox countdowns
    /// only need the passive cadence.
    pub fn tick_seconds(&self, running: bool, display: &DisplayConfig) -> Option<u64> {
        match self {
            View::Detail { .. } if running => Some(display.live_tick_seconds),
            View::Detail { .. } | View::List => Some(display.passive_tick_seconds),
            View::Stats { .. } => None,
        }
    }
}
