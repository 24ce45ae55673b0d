#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Radius lookup jobs.
//!
//! [`RadiusLookupService`] validates a request, writes an `in_progress`
//! job record, runs the radius search against the shared catalog and
//! overwrites the record with the `complete` result. Records live in a
//! [`JobStore`]; clients poll them by job id through
//! [`RadiusLookupService::read_job`].
//!
//! Nothing is retried. If the final write fails the record stays
//! `in_progress`, and a record that never completes should be treated as
//! abandoned.

pub mod store;

use std::sync::Arc;
use std::time::Instant;

use proximity_address_models::Address;
use proximity_catalog::{AddressCatalog, UnknownAddress};
use proximity_lookup_models::{InvalidRadius, MatchedAddress, RadiusKm, RadiusLookupJob};
use thiserror::Error;
use uuid::Uuid;

pub use store::{FileJobStore, JobStore, JobStoreError, MemoryJobStore};

/// Errors from starting, running, or reading a radius lookup.
#[derive(Debug, Error)]
pub enum LookupError {
    /// The requested radius was refused. Nothing was written.
    #[error(transparent)]
    InvalidRadius(#[from] InvalidRadius),

    /// The center guid is not in the catalog. Nothing was written.
    #[error(transparent)]
    UnknownAddress(#[from] UnknownAddress),

    /// The job store failed.
    #[error(transparent)]
    Store(#[from] JobStoreError),
}

/// Starts radius lookups and reads their records.
pub struct RadiusLookupService {
    catalog: Arc<AddressCatalog>,
    store: Arc<dyn JobStore>,
}

impl RadiusLookupService {
    /// Creates a service over a loaded catalog and a job store.
    #[must_use]
    pub fn new(catalog: Arc<AddressCatalog>, store: Arc<dyn JobStore>) -> Self {
        Self { catalog, store }
    }

    /// The catalog searched by this service.
    #[must_use]
    pub fn catalog(&self) -> &AddressCatalog {
        &self.catalog
    }

    /// Runs a lookup to completion under a fresh job id and returns the id.
    ///
    /// # Errors
    ///
    /// See [`Self::begin`] and [`PendingLookup::run`].
    pub async fn start_lookup(&self, from_guid: &str, radius_km: &str) -> Result<Uuid, LookupError> {
        self.begin(from_guid, radius_km).await?.run().await
    }

    /// Validates the request and writes the `in_progress` record under a
    /// fresh job id. The search itself runs when the returned
    /// [`PendingLookup`] is [run](PendingLookup::run).
    ///
    /// # Errors
    ///
    /// * [`LookupError::InvalidRadius`] if `radius_km` is not a whole number
    ///   in `1..=40075`
    /// * [`LookupError::UnknownAddress`] if `from_guid` is not in the catalog
    /// * [`LookupError::Store`] if the record cannot be created
    pub async fn begin(
        &self,
        from_guid: &str,
        radius_km: &str,
    ) -> Result<PendingLookup<'_>, LookupError> {
        self.begin_with_id(Uuid::new_v4(), from_guid, radius_km)
            .await
    }

    /// Like [`Self::begin`], but under a caller-chosen job id.
    ///
    /// # Errors
    ///
    /// As [`Self::begin`]; an id that already has a record fails with
    /// [`JobStoreError::Conflict`].
    pub async fn begin_with_id(
        &self,
        job_id: Uuid,
        from_guid: &str,
        radius_km: &str,
    ) -> Result<PendingLookup<'_>, LookupError> {
        let radius: RadiusKm = radius_km.parse()?;
        let center = self.catalog.resolve(from_guid)?;

        let job = RadiusLookupJob::in_progress(job_id, center.clone(), radius);
        self.store.create(&job).await?;

        log::info!("Started radius lookup {job_id}: {radius} around {from_guid}");

        Ok(PendingLookup {
            service: self,
            center,
            job,
        })
    }

    /// Reads the current record for a job.
    ///
    /// # Errors
    ///
    /// Returns [`LookupError::Store`] if the record does not exist or
    /// cannot be read.
    pub async fn read_job(&self, job_id: Uuid) -> Result<RadiusLookupJob, LookupError> {
        Ok(self.store.read(job_id).await?)
    }
}

/// A lookup whose `in_progress` record has been written but whose search
/// has not run yet.
pub struct PendingLookup<'a> {
    service: &'a RadiusLookupService,
    center: &'a Address,
    job: RadiusLookupJob,
}

impl PendingLookup<'_> {
    /// The job id.
    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.job.guid
    }

    /// Runs the radius search and writes the `complete` record.
    ///
    /// # Errors
    ///
    /// Returns [`LookupError::Store`] if the final record cannot be written.
    /// The `in_progress` record is left in place.
    pub async fn run(self) -> Result<Uuid, LookupError> {
        let Self {
            service,
            center,
            job,
        } = self;
        let start = Instant::now();
        let id = job.guid;

        let cities: Vec<MatchedAddress> = service
            .catalog
            .find_within_radius(center, job.distance.as_f64())
            .into_iter()
            .map(|m| MatchedAddress {
                address: m.address.clone(),
                distance: m.distance_km(),
            })
            .collect();
        let found = cities.len();

        let job = job.complete(cities);
        if let Err(e) = service.store.finalize(&job).await {
            log::error!("Failed to write result of radius lookup {id}: {e}");
            return Err(e.into());
        }

        log::info!(
            "Completed radius lookup {id}: {found} addresses in {:?}",
            start.elapsed()
        );

        Ok(id)
    }
}
