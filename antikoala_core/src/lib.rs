#![forbid(unsafe_code)]

//! Core domain model and business logic for antikoala.
//!
//! This crate provides:
//! - Domain types (drinks, profiles, sessions)
//! - The drink catalog
//! - The BAC / capacity estimation engine and its tier tables
//! - Session lifecycle rules
//! - Persistence (journal, CSV snapshot, profile document)
//! - Statistics and the drinking calendar

pub mod types;
pub mod error;
pub mod catalog;
pub mod config;
pub mod logging;
pub mod clock;
pub mod tiers;
pub mod engine;
pub mod session;
pub mod profile;
pub mod wal;
pub mod csv_rollup;
pub mod history;
pub mod store;
pub mod stats;
pub mod ticker;
pub mod view;
pub mod context;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use catalog::{build_drink_catalog, drink_catalog};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::Config;
pub use context::AppContext;
pub use engine::{estimate, EngineInput, Estimate, EstimationMode};
pub use stats::Period;
pub use store::{FileStore, ProfileStore, SessionStore};
pub use tiers::{LegalStatus, TierColor};
pub use ticker::Ticker;
pub use view::View;
