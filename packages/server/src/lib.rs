#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Actix-Web API server for address proximity queries.
//!
//! Serves tag filtering, point-to-point distances and radius lookups over a
//! read-only address catalog loaded at startup. Radius lookup results are
//! persisted as job records under `<data dir>/radius_lookups/` and polled
//! through `/area-result/{guid}`. Every route except `/health` requires the
//! shared `TOKEN` secret.

mod auth;
pub mod config;
mod handlers;
pub mod interactive;

use std::path::PathBuf;
use std::sync::Arc;

use actix_cors::Cors;
use actix_web::middleware::from_fn;
use actix_web::{App, HttpServer, middleware, web};
use proximity_catalog::{AddressCatalog, LoadError};
use proximity_lookup::{FileJobStore, JobStore, JobStoreError, RadiusLookupService};
use thiserror::Error;

use crate::config::ServerConfig;

/// Errors that stop the server from starting.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The address catalog could not be loaded.
    #[error("Failed to load address catalog: {0}")]
    Catalog(#[from] LoadError),

    /// The job record directory could not be opened.
    #[error("Failed to open job store: {0}")]
    Store(#[from] JobStoreError),

    /// The HTTP server failed to bind or run.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Shared application state.
pub struct AppState {
    /// Catalog access and radius lookup jobs.
    pub lookups: RadiusLookupService,
    /// Shared secret expected on authenticated routes.
    pub token: String,
    /// Catalog file served verbatim by `/all-cities`.
    pub catalog_path: PathBuf,
    /// Prefix for result URLs handed to clients.
    pub public_base_url: String,
}

impl AppState {
    /// Builds the state from an already loaded catalog and job store.
    #[must_use]
    pub fn new(catalog: AddressCatalog, store: Arc<dyn JobStore>, config: &ServerConfig) -> Self {
        Self {
            lookups: RadiusLookupService::new(Arc::new(catalog), store),
            token: config.token.clone(),
            catalog_path: config.catalog_path(),
            public_base_url: config.public_base_url(),
        }
    }

    /// Loads the catalog and opens the file job store described by `config`.
    ///
    /// # Errors
    ///
    /// * [`ServerError::Catalog`] if the catalog is missing or invalid
    /// * [`ServerError::Store`] if the job directory cannot be created
    pub async fn load(config: &ServerConfig) -> Result<Self, ServerError> {
        let catalog_path = config.catalog_path();
        log::info!("Loading address catalog from {}...", catalog_path.display());
        let catalog = AddressCatalog::load(&catalog_path).await?;

        let lookups_dir = config.lookups_dir();
        log::info!("Opening job store at {}...", lookups_dir.display());
        let store = FileJobStore::open(&lookups_dir).await?;

        Ok(Self::new(catalog, Arc::new(store), config))
    }
}

/// Registers every route. `/health` is public; everything else sits behind
/// the token check.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::QueryConfig::default().error_handler(handlers::query_error))
        .route("/health", web::get().to(handlers::health))
        .service(
            web::scope("")
                .wrap(from_fn(auth::require_token))
                .route("/cities-by-tag", web::get().to(handlers::cities_by_tag))
                .route("/distance", web::get().to(handlers::distance))
                .route("/area", web::get().to(handlers::area))
                .route("/area-result/{guid}", web::get().to(handlers::area_result))
                .route("/all-cities", web::get().to(handlers::all_cities)),
        );
}

/// Starts the proximity API server.
///
/// Loads the catalog, opens the job store and runs the Actix-Web HTTP
/// server until it is shut down. The caller provides the async runtime
/// (e.g. via `#[actix_web::main]`).
///
/// # Errors
///
/// Returns [`ServerError`] if startup fails or the server cannot bind.
#[allow(clippy::future_not_send)]
pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let state = web::Data::new(AppState::load(&config).await?);

    log::info!("Starting server on {}:{}", config.bind_addr, config.port);

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .configure(configure)
    })
    .bind((config.bind_addr.as_str(), config.port))?
    .run()
    .await?;

    Ok(())
}
