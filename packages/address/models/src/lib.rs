#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Address catalog entry and coordinate types.
//!
//! An [`Address`] is a single record from the address catalog file. It is
//! immutable once the catalog has been loaded; per-query attributes such as
//! a computed distance live in separate result types that borrow or copy
//! the address instead of modifying it.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Valid latitude range in degrees.
pub const LATITUDE_RANGE: std::ops::RangeInclusive<f64> = -90.0..=90.0;

/// Valid longitude range in degrees.
pub const LONGITUDE_RANGE: std::ops::RangeInclusive<f64> = -180.0..=180.0;

/// A WGS84 point in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    /// Latitude in degrees (positive north).
    pub latitude: f64,
    /// Longitude in degrees (positive east).
    pub longitude: f64,
}

impl Coordinate {
    /// Creates a new coordinate from latitude and longitude in degrees.
    #[must_use]
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Whether both components are finite and inside their valid ranges.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        LATITUDE_RANGE.contains(&self.latitude) && LONGITUDE_RANGE.contains(&self.longitude)
    }
}

/// A single entry in the address catalog.
///
/// Fields other than the ones modelled here (street, city, name, ...) are
/// kept in [`Address::details`] so they survive a load and are echoed back
/// in API responses unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    /// Unique identifier within the catalog.
    pub guid: String,
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
    /// Free-form labels used by tag filtering.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Whether the address is currently active.
    pub is_active: bool,
    /// Any additional catalog fields.
    #[serde(flatten)]
    pub details: Map<String, Value>,
}

impl Address {
    /// Creates an address with no extra catalog fields.
    #[must_use]
    pub fn new(
        guid: impl Into<String>,
        latitude: f64,
        longitude: f64,
        tags: Vec<String>,
        is_active: bool,
    ) -> Self {
        Self {
            guid: guid.into(),
            latitude,
            longitude,
            tags,
            is_active,
            details: Map::new(),
        }
    }

    /// Returns this address's position.
    #[must_use]
    pub const fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.latitude, self.longitude)
    }

    /// Whether the address carries `tag`.
    #[must_use]
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    /// Whether the address carries at least one of `tags`.
    #[must_use]
    pub fn has_any_tag<S: AsRef<str>>(&self, tags: &[S]) -> bool {
        tags.iter().any(|tag| self.has_tag(tag.as_ref()))
    }
}
