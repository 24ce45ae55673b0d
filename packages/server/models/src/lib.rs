#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! API request and response types for the proximity server.
//!
//! Query parameters are kept as raw strings where the server has to report
//! a specific validation error (ids, radius) instead of the extractor's
//! generic one.

use proximity_address_models::Address;
use serde::{Deserialize, Serialize};

/// Query parameters for `GET /cities-by-tag`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagQueryParams {
    /// Comma-separated tags; an address matches if it has any of them.
    pub tag: Option<String>,
    /// Restrict to addresses with this active flag.
    pub is_active: Option<bool>,
}

/// Query parameters for `GET /distance`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DistanceQueryParams {
    /// Guid of the starting address.
    pub from: Option<String>,
    /// Guid of the destination address.
    pub to: Option<String>,
}

/// Query parameters for `GET /area`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AreaQueryParams {
    /// Guid of the center address.
    pub from: Option<String>,
    /// Search radius in whole kilometers.
    pub distance: Option<String>,
}

/// Response from `GET /cities-by-tag`.
#[derive(Debug, Clone, Serialize)]
pub struct ApiCities<'a> {
    /// Matching addresses in catalog order.
    pub cities: Vec<&'a Address>,
}

/// Response from `GET /area` once the lookup has been recorded.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiAreaAccepted {
    /// Where to poll for the job record.
    pub results_url: String,
}

/// Health check response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiHealth {
    /// Whether the service is healthy.
    pub healthy: bool,
    /// Service version.
    pub version: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn area_accepted_uses_camel_case() {
        let json = serde_json::to_value(ApiAreaAccepted {
            results_url: "http://localhost:8080/area-result/x".to_string(),
        })
        .unwrap();
        assert_eq!(json["resultsUrl"], "http://localhost:8080/area-result/x");
    }

    #[test]
    fn cities_borrow_catalog_entries() {
        let address = Address::new("a", 1.0, 2.0, vec!["t".to_string()], true);
        let json = serde_json::to_value(ApiCities {
            cities: vec![&address],
        })
        .unwrap();
        assert_eq!(json["cities"][0]["guid"], "a");
        assert_eq!(json["cities"][0]["isActive"], true);
    }
}
