#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Great-circle distance and radius search over address catalogs.
//!
//! Radius search is a two-stage linear filter: a latitude/longitude
//! bounding box sized to the radius discards most of the catalog cheaply,
//! and the survivors are tested with the exact spherical distance. There is
//! no spatial index; catalogs are expected to hold at most a few thousand
//! entries.
//!
//! The box does not handle the poles or the antimeridian specially. Near
//! the poles the longitude span widens (and eventually covers every
//! longitude), and a circle that crosses +/-180 degrees is clipped to the
//! side its center is on.

use proximity_address_models::{Address, Coordinate};

/// Mean Earth radius in meters.
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// Haversine great-circle distance between two points, in meters.
#[must_use]
pub fn great_circle_distance(from: Coordinate, to: Coordinate) -> f64 {
    let phi1 = from.latitude.to_radians();
    let phi2 = to.latitude.to_radians();
    let delta_phi = (to.latitude - from.latitude).to_radians();
    let delta_lambda = (to.longitude - from.longitude).to_radians();

    let a = (delta_phi / 2.0).sin().powi(2)
        + phi1.cos() * phi2.cos() * (delta_lambda / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_METERS * c
}

/// Spherical law of cosines distance between two points, in meters.
///
/// Algebraically the same as [`great_circle_distance`]; radius search uses
/// this form. The `acos` argument is clamped so coincident points come out
/// as `0.0` rather than `NaN`.
#[must_use]
pub fn spherical_distance(from: Coordinate, to: Coordinate) -> f64 {
    let phi1 = from.latitude.to_radians();
    let phi2 = to.latitude.to_radians();
    let delta_lambda = to.longitude.to_radians() - from.longitude.to_radians();

    let cos_c = phi1.sin().mul_add(phi2.sin(), phi1.cos() * phi2.cos() * delta_lambda.cos());

    cos_c.clamp(-1.0, 1.0).acos() * EARTH_RADIUS_METERS
}

/// An axis-aligned latitude/longitude box in degrees. Bounds are inclusive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    /// Southern latitude boundary.
    pub min_lat: f64,
    /// Northern latitude boundary.
    pub max_lat: f64,
    /// Western longitude boundary.
    pub min_lon: f64,
    /// Eastern longitude boundary.
    pub max_lon: f64,
}

impl BoundingBox {
    /// Box around `center` that encloses a circle of `radius_meters`.
    ///
    /// The longitude half-width is the latitude half-width divided by
    /// `cos(center.latitude)`, so it grows without bound toward the poles.
    #[must_use]
    pub fn around(center: Coordinate, radius_meters: f64) -> Self {
        let lat_delta = (radius_meters / EARTH_RADIUS_METERS).to_degrees();
        let lon_delta = lat_delta / center.latitude.to_radians().cos();

        Self {
            min_lat: center.latitude - lat_delta,
            max_lat: center.latitude + lat_delta,
            min_lon: center.longitude - lon_delta,
            max_lon: center.longitude + lon_delta,
        }
    }

    /// Whether `point` lies inside the box.
    #[must_use]
    pub fn contains(&self, point: Coordinate) -> bool {
        point.latitude >= self.min_lat
            && point.latitude <= self.max_lat
            && point.longitude >= self.min_lon
            && point.longitude <= self.max_lon
    }
}

/// A catalog address found by [`find_within_radius`] together with its
/// distance from the search center.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RadiusMatch<'a> {
    /// The matched catalog entry.
    pub address: &'a Address,
    /// Distance from the center in meters.
    pub distance_meters: f64,
}

impl RadiusMatch<'_> {
    /// Distance from the center in kilometers.
    #[must_use]
    pub fn distance_km(&self) -> f64 {
        self.distance_meters / 1000.0
    }
}

/// Finds every address strictly closer than `radius_km` to `center`.
///
/// Results are sorted by ascending distance (ties keep catalog order) and
/// never include `center` itself, identified by guid. Other addresses at
/// the same position are returned with a distance of zero.
///
/// A non-positive radius returns nothing; callers are expected to validate
/// the radius first.
#[must_use]
pub fn find_within_radius<'a>(
    center: &Address,
    radius_km: f64,
    addresses: &'a [Address],
) -> Vec<RadiusMatch<'a>> {
    let radius_meters = radius_km * 1000.0;
    let origin = center.coordinate();
    let bbox = BoundingBox::around(origin, radius_meters);

    let candidates: Vec<&Address> = addresses
        .iter()
        .filter(|address| bbox.contains(address.coordinate()))
        .collect();

    log::debug!(
        "Bounding box kept {} of {} addresses for radius {radius_km} km around {}",
        candidates.len(),
        addresses.len(),
        center.guid
    );

    let mut matches: Vec<RadiusMatch<'a>> = candidates
        .into_iter()
        .map(|address| RadiusMatch {
            address,
            distance_meters: spherical_distance(address.coordinate(), origin),
        })
        .filter(|m| m.distance_meters < radius_meters)
        .collect();

    matches.sort_by(|a, b| a.distance_meters.total_cmp(&b.distance_meters));
    matches.retain(|m| m.address.guid != center.guid);

    matches
}
