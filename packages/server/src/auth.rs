//! Shared-secret authentication middleware.

use actix_web::body::MessageBody;
use actix_web::dev::{ServiceRequest, ServiceResponse};
use actix_web::http::header::{self, HeaderMap};
use actix_web::middleware::Next;
use actix_web::{Error, HttpResponse, web};

use crate::AppState;

/// Rejects requests whose `Authorization` header is not exactly
/// `bearer <token>` with `401 Unauthorized`.
pub async fn require_token(
    req: ServiceRequest,
    next: Next<impl MessageBody + 'static>,
) -> Result<ServiceResponse<impl MessageBody>, Error> {
    let authorized = req
        .app_data::<web::Data<AppState>>()
        .is_some_and(|state| is_authorized(req.headers(), &state.token));

    if authorized {
        next.call(req).await.map(ServiceResponse::map_into_left_body)
    } else {
        log::debug!("Rejected unauthenticated request to {}", req.path());
        Ok(req
            .into_response(HttpResponse::Unauthorized().body("Missing or invalid authentication"))
            .map_into_right_body())
    }
}

fn is_authorized(headers: &HeaderMap, token: &str) -> bool {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("bearer "))
        .is_some_and(|supplied| supplied == token)
}
