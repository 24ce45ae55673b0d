#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! In-memory address catalog.
//!
//! The catalog is read once from a JSON file at startup and never changes
//! afterwards. It is shared between requests behind an `Arc` and needs no
//! locking. Lookups are linear scans; the expected catalog size is in the
//! hundreds to low thousands of entries.

use std::collections::BTreeSet;
use std::path::Path;
use std::time::Instant;

use proximity_address_models::Address;
use proximity_spatial::{RadiusMatch, find_within_radius, great_circle_distance};
use serde::Serialize;
use thiserror::Error;

/// Unit reported alongside point-to-point distances.
pub const DISTANCE_UNIT: &str = "km";

/// Errors that make a catalog unusable. All of them are fatal at startup.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The catalog file could not be read.
    #[error("Failed to read catalog at {path}: {source}")]
    Io {
        /// Path that was being read.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The catalog file is not a JSON array of address records.
    #[error("Malformed catalog: {0}")]
    Json(#[from] serde_json::Error),

    /// Two records share a guid.
    #[error("Duplicate address guid: {guid}")]
    DuplicateGuid {
        /// The repeated guid.
        guid: String,
    },

    /// A record's coordinates are outside the valid WGS84 ranges.
    #[error("Address {guid} has invalid coordinates ({latitude}, {longitude})")]
    InvalidCoordinate {
        /// The offending record.
        guid: String,
        /// Latitude as stored.
        latitude: f64,
        /// Longitude as stored.
        longitude: f64,
    },
}

/// A guid that does not name any catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown address: {guid}")]
pub struct UnknownAddress {
    /// The guid that was looked up.
    pub guid: String,
}

/// Great-circle distance between two catalog entries.
#[derive(Debug, Clone, Serialize)]
pub struct AddressDistance<'a> {
    /// Starting address.
    pub from: &'a Address,
    /// Destination address.
    pub to: &'a Address,
    /// Always [`DISTANCE_UNIT`].
    pub unit: &'static str,
    /// Distance in kilometers, rounded to two decimal places.
    pub distance: f64,
}

/// The loaded, immutable address collection.
#[derive(Debug, Clone, Default)]
pub struct AddressCatalog {
    addresses: Vec<Address>,
}

impl AddressCatalog {
    /// Reads and validates the catalog file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError`] if the file cannot be read, is not valid JSON,
    /// or contains duplicate guids or out-of-range coordinates.
    pub async fn load(path: &Path) -> Result<Self, LoadError> {
        let start = Instant::now();

        let data = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| LoadError::Io {
                path: path.display().to_string(),
                source,
            })?;
        log::debug!("Read catalog file in {:?}", start.elapsed());

        let catalog = Self::from_json(&data)?;
        log::info!(
            "Loaded {} addresses from {} in {:?}",
            catalog.len(),
            path.display(),
            start.elapsed()
        );

        Ok(catalog)
    }

    /// Parses and validates a catalog from its JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError`] if the text is malformed or fails validation.
    pub fn from_json(json: &str) -> Result<Self, LoadError> {
        let addresses: Vec<Address> = serde_json::from_str(json)?;
        Self::from_addresses(addresses)
    }

    /// Builds a catalog from already-parsed addresses.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError`] if any guid repeats or any coordinate is out of
    /// range.
    pub fn from_addresses(addresses: Vec<Address>) -> Result<Self, LoadError> {
        let mut seen = BTreeSet::new();

        for address in &addresses {
            if !seen.insert(address.guid.as_str()) {
                return Err(LoadError::DuplicateGuid {
                    guid: address.guid.clone(),
                });
            }
            if !address.coordinate().is_valid() {
                return Err(LoadError::InvalidCoordinate {
                    guid: address.guid.clone(),
                    latitude: address.latitude,
                    longitude: address.longitude,
                });
            }
        }

        Ok(Self { addresses })
    }

    /// All addresses in file order.
    #[must_use]
    pub fn addresses(&self) -> &[Address] {
        &self.addresses
    }

    /// Number of addresses.
    #[must_use]
    pub fn len(&self) -> usize {
        self.addresses.len()
    }

    /// Whether the catalog is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }

    /// Finds an address by guid.
    #[must_use]
    pub fn lookup(&self, guid: &str) -> Option<&Address> {
        self.addresses.iter().find(|address| address.guid == guid)
    }

    /// Like [`Self::lookup`], but a miss is an error.
    ///
    /// # Errors
    ///
    /// Returns [`UnknownAddress`] if no entry has this guid.
    pub fn resolve(&self, guid: &str) -> Result<&Address, UnknownAddress> {
        self.lookup(guid).ok_or_else(|| UnknownAddress {
            guid: guid.to_string(),
        })
    }

    /// Addresses carrying at least one of `tags`, optionally restricted to
    /// those whose active flag equals `is_active`.
    ///
    /// Each address appears at most once, in catalog order, no matter how
    /// many of the requested tags it carries.
    #[must_use]
    pub fn filter_by_tags_and_active<S: AsRef<str>>(
        &self,
        tags: &[S],
        is_active: Option<bool>,
    ) -> Vec<&Address> {
        let start = Instant::now();

        let matched: Vec<&Address> = self
            .addresses
            .iter()
            .filter(|address| is_active.is_none_or(|active| address.is_active == active))
            .filter(|address| address.has_any_tag(tags))
            .collect();

        log::debug!(
            "Tag filter matched {} of {} addresses in {:?}",
            matched.len(),
            self.len(),
            start.elapsed()
        );

        matched
    }

    /// Haversine distance between two catalog entries in kilometers,
    /// rounded to two decimal places.
    ///
    /// # Errors
    ///
    /// Returns [`UnknownAddress`] for the first guid that does not resolve.
    pub fn distance_between(
        &self,
        from_guid: &str,
        to_guid: &str,
    ) -> Result<AddressDistance<'_>, UnknownAddress> {
        let from = self.resolve(from_guid)?;
        let to = self.resolve(to_guid)?;

        let meters = great_circle_distance(from.coordinate(), to.coordinate());

        Ok(AddressDistance {
            from,
            to,
            unit: DISTANCE_UNIT,
            distance: round_to_hundredths(meters / 1000.0),
        })
    }

    /// Every other address strictly within `radius_km` of `center`, nearest
    /// first. See [`proximity_spatial::find_within_radius`].
    #[must_use]
    pub fn find_within_radius(&self, center: &Address, radius_km: f64) -> Vec<RadiusMatch<'_>> {
        let start = Instant::now();
        let matches = find_within_radius(center, radius_km, &self.addresses);
        log::debug!(
            "Radius search around {} found {} addresses in {:?}",
            center.guid,
            matches.len(),
            start.elapsed()
        );
        matches
    }
}

fn round_to_hundredths(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
