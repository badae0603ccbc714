//! Core domain types for antikoala.
//!
//! This module defines the records the rest of the system passes around:
//! - Drink kinds and the per-session count map
//! - The user profile and its partial-update form
//! - Drinking sessions and their partial-update form

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

// ============================================================================
// Drink Types
// ============================================================================

/// Kind of drink the user can count
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum DrinkKind {
    Soju,
    Beer,
    Somac,
    Whiskey,
    Wine,
    Makgeolli,
    Highball,
}

impl DrinkKind {
    /// Every kind, in display order
    pub const ALL: [DrinkKind; 7] = [
        DrinkKind::Soju,
        DrinkKind::Beer,
        DrinkKind::Somac,
        DrinkKind::Whiskey,
        DrinkKind::Wine,
        DrinkKind::Makgeolli,
        DrinkKind::Highball,
    ];

    /// Stable storage key (also the CSV column name)
    pub fn key(&self) -> &'static str {
        match self {
            DrinkKind::Soju => "soju",
            DrinkKind::Beer => "beer",
            DrinkKind::Somac => "somac",
            DrinkKind::Whiskey => "whiskey",
            DrinkKind::Wine => "wine",
            DrinkKind::Makgeolli => "makgeolli",
            DrinkKind::Highball => "highball",
        }
    }
}

impl fmt::Display for DrinkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for DrinkKind {
    type Err = crate::Error;

    /// Accepts the storage key or the Korean display name
    fn from_str(s: &str) -> crate::Result<Self> {
        let wanted = s.trim().to_lowercase();
        DrinkKind::ALL
            .into_iter()
            .find(|kind| {
                kind.key() == wanted
                    || crate::catalog::drink_catalog()
                        .get(*kind)
                        .is_some_and(|info| info.name == wanted)
            })
            .ok_or_else(|| crate::Error::Validation(format!("Unknown drink: {}", s)))
    }
}

/// Per-kind drink counts for one session
///
/// Every kind is always present; kinds missing from a stored record read as 0.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<DrinkKind, u32>", into = "BTreeMap<DrinkKind, u32>")]
pub struct DrinkCounts(BTreeMap<DrinkKind, u32>);

impl Default for DrinkCounts {
    fn default() -> Self {
        Self(DrinkKind::ALL.into_iter().map(|k| (k, 0)).collect())
    }
}

impl From<BTreeMap<DrinkKind, u32>> for DrinkCounts {
    fn from(stored: BTreeMap<DrinkKind, u32>) -> Self {
        let mut counts = Self::default();
        counts.0.extend(stored);
        counts
    }
}

impl From<DrinkCounts> for BTreeMap<DrinkKind, u32> {
    fn from(counts: DrinkCounts) -> Self {
        counts.0
    }
}

impl DrinkCounts {
    pub fn get(&self, kind: DrinkKind) -> u32 {
        self.0.get(&kind).copied().unwrap_or(0)
    }

    pub fn set(&mut self, kind: DrinkKind, count: u32) {
        self.0.insert(kind, count);
    }

    /// Copy with `kind` moved by `delta`, floored at zero
    pub fn adjusted(&self, kind: DrinkKind, delta: i32) -> Self {
        let mut next = self.clone();
        let current = i64::from(self.get(kind));
        let moved = (current + i64::from(delta)).clamp(0, i64::from(u32::MAX));
        next.set(kind, moved as u32);
        next
    }

    pub fn iter(&self) -> impl Iterator<Item = (DrinkKind, u32)> + '_ {
        self.0.iter().map(|(k, v)| (*k, *v))
    }

    /// Total number of glasses across all kinds
    pub fn total(&self) -> u64 {
        self.0.values().map(|v| u64::from(*v)).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.0.values().all(|v| *v == 0)
    }
}

// ============================================================================
// Profile Types
// ============================================================================

/// Biological sex used for the Widmark distribution constant
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    /// Body-water distribution constant `r`
    pub fn distribution_constant(&self) -> f64 {
        match self {
            Gender::Male => 0.68,
            Gender::Female => 0.55,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Gender::Male => "남성",
            Gender::Female => "여성",
        }
    }
}

impl FromStr for Gender {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "male" | "m" | "남" | "남성" => Ok(Gender::Male),
            "female" | "f" | "여" | "여성" => Ok(Gender::Female),
            other => Err(crate::Error::Validation(format!(
                "Unknown gender: {} (expected male or female)",
                other
            ))),
        }
    }
}

/// The user's persisted profile
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct UserProfile {
    pub name: String,
    pub gender: Gender,
    #[serde(rename = "weight")]
    pub weight_kg: f64,
    /// Personal tolerance, in reference soju bottles
    pub capacity: f64,
}

/// Partial profile edit, merged into the stored record
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct ProfilePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<Gender>,
    #[serde(default, rename = "weight", skip_serializing_if = "Option::is_none")]
    pub weight_kg: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capacity: Option<f64>,
}

impl ProfilePatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.gender.is_none()
            && self.weight_kg.is_none()
            && self.capacity.is_none()
    }

    /// Apply this patch on top of an existing profile
    pub fn apply(&self, profile: &mut UserProfile) {
        if let Some(ref name) = self.name {
            profile.name = name.clone();
        }
        if let Some(gender) = self.gender {
            profile.gender = gender;
        }
        if let Some(weight) = self.weight_kg {
            profile.weight_kg = weight;
        }
        if let Some(capacity) = self.capacity {
            profile.capacity = capacity;
        }
    }

    /// Build a full profile when no stored record exists yet
    ///
    /// Gender defaults to male, matching the first-run form.
    pub fn into_profile(self) -> crate::Result<UserProfile> {
        let missing = |field: &str| {
            crate::Error::Validation(format!("{} is required for a new profile", field))
        };
        Ok(UserProfile {
            name: self.name.ok_or_else(|| missing("name"))?,
            gender: self.gender.unwrap_or(Gender::Male),
            weight_kg: self.weight_kg.ok_or_else(|| missing("weight"))?,
            capacity: self.capacity.ok_or_else(|| missing("capacity"))?,
        })
    }
}

// ============================================================================
// Session Types
// ============================================================================

/// One drinking occasion
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct DrinkingSession {
    pub id: Uuid,
    pub event_name: String,
    pub created_at: DateTime<Utc>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub counts: DrinkCounts,
    pub peak_percentage: Option<f64>,
}

impl DrinkingSession {
    /// A fresh session: zero counts, no timestamps, no snapshot
    pub fn new(event_name: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            event_name: event_name.into(),
            created_at,
            start_time: None,
            end_time: None,
            counts: DrinkCounts::default(),
            peak_percentage: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.start_time.is_some() && self.end_time.is_none()
    }

    /// Short id used in tables
    pub fn short_id(&self) -> String {
        self.id.simple().to_string()[..8].to_string()
    }
}

/// Deserialize a present field (including `null`) as `Some`, so that
/// `Option<Option<T>>` can tell "clear this field" from "leave it alone".
fn deserialize_present<'de, T, D>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    T::deserialize(deserializer).map(Some)
}

/// Partial merge for a session record
///
/// Outer `None` leaves a field untouched; `Some(None)` clears a nullable field.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct SessionPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_name: Option<String>,
    #[serde(
        default,
        deserialize_with = "deserialize_present",
        skip_serializing_if = "Option::is_none"
    )]
    pub start_time: Option<Option<DateTime<Utc>>>,
    #[serde(
        default,
        deserialize_with = "deserialize_present",
        skip_serializing_if = "Option::is_none"
    )]
    pub end_time: Option<Option<DateTime<Utc>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub counts: Option<DrinkCounts>,
    #[serde(
        default,
        deserialize_with = "deserialize_present",
        skip_serializing_if = "Option::is_none"
    )]
    pub peak_percentage: Option<Option<f64>>,
}

impl SessionPatch {
    pub fn is_empty(&self) -> bool {
        self.event_name.is_none()
            && self.start_time.is_none()
            && self.end_time.is_none()
            && self.counts.is_none()
            && self.peak_percentage.is_none()
    }

    /// Merge this patch into a session (last write wins per field)
    pub fn apply(&self, session: &mut DrinkingSession) {
        if let Some(ref name) = self.event_name {
            session.event_name = name.clone();
        }
        if let Some(start) = self.start_time {
            session.start_time = start;
        }
        if let Some(end) = self.end_time {
            session.end_time = end;
        }
        if let Some(ref counts) = self.counts {
            session.counts = counts.clone();
        }
        if let Some(peak) = self.peak_percentage {
            session.peak_percentage = peak;
        }
    }

    /// Fold a later patch into this one
    pub fn merge(mut self, later: SessionPatch) -> Self {
        if later.event_name.is_some() {
            self.event_name = later.event_name;
        }
        if later.start_time.is_some() {
            self.start_time = later.start_time;
        }
        if later.end_time.is_some() {
            self.end_time = later.end_time;
        }
        if later.counts.is_some() {
            self.counts = later.counts;
        }
        if later.peak_percentage.is_some() {
            self.peak_percentage = later.peak_percentage;
        }
        self
    }
}
