//! HTTP handler functions for the proximity API.

use actix_files::NamedFile;
use actix_web::error::{InternalError, QueryPayloadError};
use actix_web::http::StatusCode;
use actix_web::{HttpRequest, HttpResponse, web};
use proximity_lookup::{JobStoreError, LookupError};
use proximity_server_models::{
    ApiAreaAccepted, ApiCities, ApiHealth, AreaQueryParams, DistanceQueryParams, TagQueryParams,
};
use uuid::Uuid;

use crate::AppState;

/// `GET /health`
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(ApiHealth {
        healthy: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// `GET /cities-by-tag`
///
/// Returns every address carrying any of the comma-separated `tag` values,
/// optionally restricted by `isActive`.
pub async fn cities_by_tag(
    state: web::Data<AppState>,
    params: web::Query<TagQueryParams>,
) -> HttpResponse {
    let tags = params.tag.as_deref().map(parse_tags).unwrap_or_default();
    if tags.is_empty() {
        return error_response(
            StatusCode::BAD_REQUEST,
            "No tags were provided. Use the /all-cities endpoint instead",
        );
    }

    let cities = state
        .lookups
        .catalog()
        .filter_by_tags_and_active(tags.as_slice(), params.is_active);

    HttpResponse::Ok().json(ApiCities { cities })
}

/// `GET /distance`
///
/// Great-circle distance in kilometers between two catalog addresses.
pub async fn distance(
    state: web::Data<AppState>,
    params: web::Query<DistanceQueryParams>,
) -> HttpResponse {
    let (Some(from), Some(to)) = (
        valid_guid(params.from.as_deref()),
        valid_guid(params.to.as_deref()),
    ) else {
        return error_response(
            StatusCode::BAD_REQUEST,
            "Invalid id supplied for 'from' or 'to'",
        );
    };

    match state.lookups.catalog().distance_between(from, to) {
        Ok(result) => HttpResponse::Ok().json(result),
        Err(e) => error_response(StatusCode::NOT_FOUND, &e.to_string()),
    }
}

/// `GET /area`
///
/// Runs a radius lookup and answers `202 Accepted` with the URL of its job
/// record.
pub async fn area(
    state: web::Data<AppState>,
    params: web::Query<AreaQueryParams>,
) -> HttpResponse {
    let (Some(from), Some(radius)) = (
        valid_guid(params.from.as_deref()),
        params.distance.as_deref(),
    ) else {
        return error_response(
            StatusCode::BAD_REQUEST,
            "One or more required parameters missing",
        );
    };

    match state.lookups.start_lookup(from, radius).await {
        Ok(id) => HttpResponse::Accepted().json(ApiAreaAccepted {
            results_url: format!("{}/area-result/{id}", state.public_base_url),
        }),
        Err(e) => lookup_error_response(&e),
    }
}

/// `GET /area-result/{guid}`
///
/// Returns the job record: `200 OK` once complete, `202 Accepted` while
/// still in progress.
pub async fn area_result(state: web::Data<AppState>, path: web::Path<String>) -> HttpResponse {
    let Ok(id) = Uuid::parse_str(&path) else {
        return error_response(StatusCode::BAD_REQUEST, "Invalid guid supplied");
    };

    match state.lookups.read_job(id).await {
        Ok(job) if job.is_complete() => HttpResponse::Ok().json(job),
        Ok(job) => HttpResponse::Accepted().json(job),
        Err(e) => lookup_error_response(&e),
    }
}

/// `GET /all-cities`
///
/// Streams the raw catalog file.
pub async fn all_cities(state: web::Data<AppState>, req: HttpRequest) -> HttpResponse {
    match NamedFile::open_async(&state.catalog_path).await {
        Ok(file) => file.into_response(&req),
        Err(e) => {
            log::error!(
                "Failed to open catalog file {}: {e}",
                state.catalog_path.display()
            );
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to load address data",
            )
        }
    }
}

/// Splits a comma-separated tag list, trimming whitespace and dropping
/// empty entries.
fn parse_tags(s: &str) -> Vec<String> {
    s.split(',')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(str::to_string)
        .collect()
}

fn valid_guid(value: Option<&str>) -> Option<&str> {
    value.filter(|v| Uuid::parse_str(v).is_ok())
}

fn lookup_error_response(e: &LookupError) -> HttpResponse {
    match e {
        LookupError::InvalidRadius(_) => error_response(StatusCode::BAD_REQUEST, &e.to_string()),
        LookupError::UnknownAddress(_) | LookupError::Store(JobStoreError::NotFound(_)) => {
            error_response(StatusCode::NOT_FOUND, &e.to_string())
        }
        LookupError::Store(JobStoreError::Conflict(_)) => {
            error_response(StatusCode::CONFLICT, &e.to_string())
        }
        LookupError::Store(_) => {
            log::error!("Radius lookup failed: {e}");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to process radius lookup",
            )
        }
    }
}

/// Turns query string parse failures into the usual JSON error body.
pub fn query_error(err: QueryPayloadError, _req: &HttpRequest) -> actix_web::Error {
    let response = error_response(StatusCode::BAD_REQUEST, &err.to_string());
    InternalError::from_response(err, response).into()
}

fn error_response(status: StatusCode, message: &str) -> HttpResponse {
    HttpResponse::build(status).json(serde_json::json!({ "error": message }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use actix_web::App;
    use actix_web::test as actix_test;
    use proximity_catalog::AddressCatalog;
    use proximity_lookup::{JobStore, MemoryJobStore};
    use proximity_lookup_models::RadiusLookupJob;
    use serde_json::Value;

    use crate::config::ServerConfig;

    const TOKEN: &str = "s3cret";
    const CENTER: &str = "2152f96f-50c7-4d76-9e18-f7033bd14428";
    const NEAR: &str = "ed354fef-31d3-44a9-b92f-4a3bd7eb0408";
    const FAR: &str = "7a3b9c4e-1f2d-4e5a-8b6c-9d0e1f2a3b4c";

    fn catalog_json() -> String {
        format!(
            r#"[
                {{"guid": "{CENTER}", "isActive": true,  "latitude": 0.0, "longitude": 0.0, "tags": ["red", "blue"]}},
                {{"guid": "{NEAR}",   "isActive": false, "latitude": 0.0, "longitude": 1.0, "tags": ["blue"], "address": "1 Main St"}},
                {{"guid": "{FAR}",    "isActive": true,  "latitude": 0.0, "longitude": 10.0, "tags": ["green"]}}
            ]"#
        )
    }

    fn state_with(catalog_path: std::path::PathBuf) -> (web::Data<AppState>, Arc<MemoryJobStore>) {
        let config = ServerConfig {
            bind_addr: "127.0.0.1".to_string(),
            port: 8080,
            public_host: Some("proximity.test".to_string()),
            token: TOKEN.to_string(),
            data_dir: std::env::temp_dir(),
        };
        let catalog = AddressCatalog::from_json(&catalog_json()).unwrap();
        let store = Arc::new(MemoryJobStore::new());
        let mut state = AppState::new(catalog, store.clone(), &config);
        state.catalog_path = catalog_path;
        (web::Data::new(state), store)
    }

    fn state() -> (web::Data<AppState>, Arc<MemoryJobStore>) {
        state_with(std::env::temp_dir().join("proximity_handlers_missing_catalog.json"))
    }

    fn get(uri: &str) -> actix_test::TestRequest {
        actix_test::TestRequest::get()
            .uri(uri)
            .insert_header(("authorization", format!("bearer {TOKEN}")))
    }

    #[actix_web::test]
    async fn health_needs_no_token() {
        let (state, _) = state();
        let app = actix_test::init_service(App::new().app_data(state).configure(crate::configure)).await;

        let resp = actix_test::call_service(&app, actix_test::TestRequest::get().uri("/health").to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[actix_web::test]
    async fn rejects_requests_without_token() {
        let (state, _) = state();
        let app = actix_test::init_service(App::new().app_data(state).configure(crate::configure)).await;

        let req = actix_test::TestRequest::get()
            .uri("/cities-by-tag?tag=blue")
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let req = actix_test::TestRequest::get()
            .uri("/cities-by-tag?tag=blue")
            .insert_header(("authorization", "bearer wrong"))
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn cities_by_tag_filters() {
        let (state, _) = state();
        let app = actix_test::init_service(App::new().app_data(state).configure(crate::configure)).await;

        let body: Value =
            actix_test::call_and_read_body_json(&app, get("/cities-by-tag?tag=blue,%20green").to_request())
                .await;
        let guids: Vec<&str> = body["cities"]
            .as_array()
            .unwrap()
            .iter()
            .map(|c| c["guid"].as_str().unwrap())
            .collect();
        assert_eq!(guids, vec![CENTER, NEAR, FAR]);

        let body: Value = actix_test::call_and_read_body_json(
            &app,
            get("/cities-by-tag?tag=blue&isActive=false").to_request(),
        )
        .await;
        assert_eq!(body["cities"].as_array().unwrap().len(), 1);
        assert_eq!(body["cities"][0]["address"], "1 Main St");

        let resp = actix_test::call_service(&app, get("/cities-by-tag").to_request()).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn malformed_query_is_a_json_error() {
        let (state, _) = state();
        let app =
            actix_test::init_service(App::new().app_data(state).configure(crate::configure)).await;

        let resp = actix_test::call_service(
            &app,
            get("/cities-by-tag?tag=blue&isActive=yes").to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = actix_test::read_body_json(resp).await;
        let message = body["error"].as_str().unwrap();
        assert!(
            message.starts_with("Query deserialize error"),
            "unexpected body {body}"
        );
    }

    #[actix_web::test]
    async fn distance_between_addresses() {
        let (state, _) = state();
        let app = actix_test::init_service(App::new().app_data(state).configure(crate::configure)).await;

        let body: Value = actix_test::call_and_read_body_json(
            &app,
            get(&format!("/distance?from={CENTER}&to={NEAR}")).to_request(),
        )
        .await;
        assert_eq!(body["unit"], "km");
        assert_eq!(body["distance"], 111.19);
        assert_eq!(body["from"]["guid"], CENTER);
        assert_eq!(body["to"]["guid"], NEAR);

        let resp = actix_test::call_service(&app, get("/distance?from=abc&to=def").to_request()).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let unknown = Uuid::new_v4();
        let resp = actix_test::call_service(
            &app,
            get(&format!("/distance?from={CENTER}&to={unknown}")).to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn area_lookup_then_poll() {
        let (state, store) = state();
        let app = actix_test::init_service(App::new().app_data(state).configure(crate::configure)).await;

        let resp = actix_test::call_service(
            &app,
            get(&format!("/area?from={CENTER}&distance=500")).to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::ACCEPTED);
        let body: Value = actix_test::read_body_json(resp).await;
        let url = body["resultsUrl"].as_str().unwrap();
        let prefix = "http://proximity.test:8080/area-result/";
        assert!(url.starts_with(prefix), "unexpected url {url}");
        assert_eq!(store.len(), 1);

        let path = url.strip_prefix("http://proximity.test:8080").unwrap();
        let resp = actix_test::call_service(&app, get(path).to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let job: Value = actix_test::read_body_json(resp).await;
        assert_eq!(job["status"], "complete");
        assert_eq!(job["distance"], 500);
        assert_eq!(job["from"]["guid"], CENTER);
        assert_eq!(job["cities"].as_array().unwrap().len(), 1);
        assert_eq!(job["cities"][0]["guid"], NEAR);
    }

    #[actix_web::test]
    async fn in_progress_job_is_accepted_not_ok() {
        let (state, store) = state();
        let center = state.lookups.catalog().lookup(CENTER).unwrap().clone();
        let job = RadiusLookupJob::in_progress(Uuid::new_v4(), center, "5".parse().unwrap());
        store.create(&job).await.unwrap();

        let app = actix_test::init_service(App::new().app_data(state).configure(crate::configure)).await;
        let resp = actix_test::call_service(
            &app,
            get(&format!("/area-result/{}", job.guid)).to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::ACCEPTED);
        let body: Value = actix_test::read_body_json(resp).await;
        assert_eq!(body["status"], "in_progress");
        assert_eq!(body["cities"], serde_json::json!([]));
    }

    #[actix_web::test]
    async fn area_rejects_bad_input_before_writing() {
        let (state, store) = state();
        let app = actix_test::init_service(App::new().app_data(state).configure(crate::configure)).await;

        for radius in ["0", "-5", "40076", "abc"] {
            let resp = actix_test::call_service(
                &app,
                get(&format!("/area?from={CENTER}&distance={radius}")).to_request(),
            )
            .await;
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "radius {radius}");
        }

        let resp = actix_test::call_service(&app, get("/area?from=not-a-guid&distance=5").to_request()).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let unknown = Uuid::new_v4();
        let resp = actix_test::call_service(
            &app,
            get(&format!("/area?from={unknown}&distance=5")).to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        assert!(store.is_empty());
    }

    #[actix_web::test]
    async fn area_result_errors() {
        let (state, _) = state();
        let app = actix_test::init_service(App::new().app_data(state).configure(crate::configure)).await;

        let resp = actix_test::call_service(&app, get("/area-result/nope").to_request()).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let resp = actix_test::call_service(
            &app,
            get(&format!("/area-result/{}", Uuid::new_v4())).to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn all_cities_streams_catalog_file() {
        let tmp = std::env::temp_dir().join("proximity_handlers_all_cities");
        let _ = std::fs::remove_dir_all(&tmp);
        std::fs::create_dir_all(&tmp).unwrap();
        let path = tmp.join("addresses.json");
        std::fs::write(&path, catalog_json()).unwrap();

        let (state, _) = state_with(path);
        let app = actix_test::init_service(App::new().app_data(state).configure(crate::configure)).await;

        let body: Value = actix_test::call_and_read_body_json(&app, get("/all-cities").to_request()).await;
        assert_eq!(body.as_array().unwrap().len(), 3);

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[actix_web::test]
    async fn all_cities_reports_missing_file() {
        let (state, _) = state();
        let app = actix_test::init_service(App::new().app_data(state).configure(crate::configure)).await;

        let resp = actix_test::call_service(&app, get("/all-cities").to_request()).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn parses_tag_lists() {
        assert_eq!(parse_tags(" a, b ,,c "), vec!["a", "b", "c"]);
        assert!(parse_tags(" , ").is_empty());
    }
}
