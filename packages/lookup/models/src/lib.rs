#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Radius lookup job records.
//!
//! A [`RadiusLookupJob`] is written once as [`JobStatus::InProgress`] with
//! no results and overwritten once as [`JobStatus::Complete`] with the
//! matched addresses. These types are the persisted JSON shape and the API
//! response shape at the same time.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use proximity_address_models::Address;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use thiserror::Error;
use uuid::Uuid;

/// Largest accepted search radius: the equatorial circumference in km.
pub const MAX_RADIUS_KM: u32 = 40_075;

/// Why a requested radius was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidRadius {
    /// Not a whole number of kilometers.
    #[error("Distance must be an integer, got {input:?}")]
    NotAnInteger {
        /// The raw input.
        input: String,
    },

    /// Zero or negative.
    #[error("Distance must be 1 km or greater, got {value}")]
    TooSmall {
        /// The parsed value.
        value: i64,
    },

    /// Larger than [`MAX_RADIUS_KM`].
    #[error("Distance cannot exceed the earth's circumference (40075 km), got {value}")]
    TooLarge {
        /// The parsed value.
        value: i64,
    },
}

/// A validated search radius: a whole number of kilometers in
/// `1..=MAX_RADIUS_KM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct RadiusKm(u32);

impl RadiusKm {
    /// Validates `km`.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidRadius`] if `km` is not in `1..=MAX_RADIUS_KM`.
    pub fn new(km: i64) -> Result<Self, InvalidRadius> {
        if km < 1 {
            return Err(InvalidRadius::TooSmall { value: km });
        }
        u32::try_from(km)
            .ok()
            .filter(|km| *km <= MAX_RADIUS_KM)
            .map(Self)
            .ok_or(InvalidRadius::TooLarge { value: km })
    }

    /// The radius in kilometers.
    #[must_use]
    pub const fn km(self) -> u32 {
        self.0
    }

    /// The radius in kilometers as a float, for distance comparisons.
    #[must_use]
    pub fn as_f64(self) -> f64 {
        f64::from(self.0)
    }
}

impl FromStr for RadiusKm {
    type Err = InvalidRadius;

    /// Accepts any numeral that denotes a whole number, so `"10"`, `" 10 "`,
    /// `"10.0"` and `"1e1"` are all ten kilometers.
    #[allow(clippy::float_cmp, clippy::cast_possible_truncation)]
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let not_an_integer = || InvalidRadius::NotAnInteger {
            input: s.to_string(),
        };

        let value: f64 = s.trim().parse().map_err(|_| not_an_integer())?;
        if !value.is_finite() || value.fract() != 0.0 {
            return Err(not_an_integer());
        }

        // Saturates for values outside i64, which are rejected as too large
        // or too small either way.
        Self::new(value as i64)
    }
}

impl TryFrom<i64> for RadiusKm {
    type Error = InvalidRadius;

    fn try_from(km: i64) -> Result<Self, Self::Error> {
        Self::new(km)
    }
}

impl TryFrom<u32> for RadiusKm {
    type Error = InvalidRadius;

    fn try_from(km: u32) -> Result<Self, Self::Error> {
        Self::new(i64::from(km))
    }
}

impl From<RadiusKm> for u32 {
    fn from(radius: RadiusKm) -> Self {
        radius.0
    }
}

impl std::fmt::Display for RadiusKm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} km", self.0)
    }
}

/// Lifecycle state of a radius lookup job.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum JobStatus {
    /// The record exists but results have not been written yet.
    InProgress,
    /// Results are written. Terminal.
    Complete,
}

/// A catalog address matched by a radius lookup, with its distance from
/// the center.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchedAddress {
    /// Copy of the catalog entry.
    #[serde(flatten)]
    pub address: Address,
    /// Distance from the center in kilometers.
    pub distance: f64,
}

/// The persisted state of one radius lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RadiusLookupJob {
    /// Job identifier.
    pub guid: Uuid,
    /// Center of the search.
    pub from: Address,
    /// Requested radius in kilometers.
    pub distance: RadiusKm,
    /// Lifecycle state.
    pub status: JobStatus,
    /// Matches, nearest first. Empty while in progress.
    #[serde(default)]
    pub cities: Vec<MatchedAddress>,
    /// When the job record was first written.
    pub created_at: DateTime<Utc>,
    /// When the results were written.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl RadiusLookupJob {
    /// A fresh in-progress record with no results.
    #[must_use]
    pub fn in_progress(guid: Uuid, from: Address, distance: RadiusKm) -> Self {
        Self {
            guid,
            from,
            distance,
            status: JobStatus::InProgress,
            cities: Vec::new(),
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    /// Consumes this record and returns its completed form holding `cities`.
    #[must_use]
    pub fn complete(self, cities: Vec<MatchedAddress>) -> Self {
        Self {
            status: JobStatus::Complete,
            cities,
            completed_at: Some(Utc::now()),
            ..self
        }
    }

    /// Whether results have been written.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.status == JobStatus::Complete
    }
}
