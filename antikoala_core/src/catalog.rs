//! Built-in drink catalog.
//!
//! Standard glass volume and ABV per drink kind. These are domain constants,
//! not user data; the catalog is built once and shared.

use crate::engine::ALCOHOL_DENSITY;
use crate::types::DrinkKind;
use once_cell::sync::Lazy;
use std::collections::BTreeMap;

/// Serving definition for one drink kind
#[derive(Clone, Debug, PartialEq)]
pub struct DrinkInfo {
    pub kind: DrinkKind,
    /// Korean display name
    pub name: String,
    pub volume_ml: f64,
    /// Alcohol by volume, as a fraction
    pub abv: f64,
}

impl DrinkInfo {
    /// Grams of ethanol in one standard glass
    pub fn grams_per_glass(&self) -> f64 {
        self.volume_ml * self.abv * ALCOHOL_DENSITY
    }
}

/// The complete drink catalog, keyed and ordered by kind
#[derive(Clone, Debug)]
pub struct Catalog {
    pub drinks: BTreeMap<DrinkKind, DrinkInfo>,
}

/// Cached catalog - built once and reused by every estimate
static DRINK_CATALOG: Lazy<Catalog> = Lazy::new(build_drink_catalog);

/// Get a reference to the cached drink catalog
pub fn drink_catalog() -> &'static Catalog {
    &DRINK_CATALOG
}

/// Builds the drink catalog
///
/// Prefer `drink_catalog()`; this is kept for tests and validation.
pub fn build_drink_catalog() -> Catalog {
    let entries = [
        (DrinkKind::Soju, "소주", 50.0, 0.169),
        (DrinkKind::Beer, "맥주", 200.0, 0.05),
        (DrinkKind::Somac, "소맥", 200.0, 0.09),
        (DrinkKind::Whiskey, "위스키", 30.0, 0.42),
        (DrinkKind::Wine, "와인", 100.0, 0.13),
        (DrinkKind::Makgeolli, "막걸리", 150.0, 0.06),
        (DrinkKind::Highball, "하이볼", 300.0, 0.08),
    ];

    let drinks = entries
        .into_iter()
        .map(|(kind, name, volume_ml, abv)| {
            (
                kind,
                DrinkInfo {
                    kind,
                    name: name.into(),
                    volume_ml,
                    abv,
                },
            )
        })
        .collect();

    Catalog { drinks }
}

impl Catalog {
    pub fn get(&self, kind: DrinkKind) -> Option<&DrinkInfo> {
        self.drinks.get(&kind)
    }

    /// Drinks in display order
    pub fn iter(&self) -> impl Iterator<Item = &DrinkInfo> {
        self.drinks.values()
    }

    /// Validate the catalog for consistency and completeness
    ///
    /// Returns a list of validation errors, or empty Vec if valid.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        for kind in DrinkKind::ALL {
            if !self.drinks.contains_key(&kind) {
                errors.push(format!("Catalog is missing drink '{}'", kind));
            }
        }

        for (kind, info) in &self.drinks {
            if *kind != info.kind {
                errors.push(format!(
                    "Drink key '{}' doesn't match info.kind '{}'",
                    kind, info.kind
                ));
            }
            if info.name.trim().is_empty() {
                errors.push(format!("Drink '{}' has empty name", kind));
            }
            if !(info.volume_ml.is_finite() && info.volume_ml > 0.0) {
                errors.push(format!(
                    "Drink '{}': volume {} mL is not positive",
                    kind, info.volume_ml
                ));
            }
            if !(info.abv > 0.0 && info.abv < 1.0) {
                errors.push(format!(
                    "Drink '{}': ABV {} is outside (0, 1)",
                    kind, info.abv
                ));
            }
        }

        errors
    }
}
