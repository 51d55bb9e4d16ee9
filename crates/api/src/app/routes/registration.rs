//! Registration requests: public submission and the admin review queue.

use std::str::FromStr;
use std::sync::Arc;

use axum::{
    Extension, Json, Router,
    extract::{Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde_json::json;

use bizdesk_auth::{AuthzError, Role};
use bizdesk_core::RegistrationRequestId;
use bizdesk_onboarding::RegistrationStatus;

use crate::app::dto::{ListRegistrationsQuery, RejectRegistrationRequest, SubmitRegistrationRequest};
use crate::app::errors::{authz_error_to_response, domain_error_to_response, onboarding_error_to_response};
use crate::app::services::AppServices;
use crate::context::PrincipalContext;

pub fn admin_router() -> Router {
    Router::new()
        .route("/registration-requests", get(list))
        .route("/registration-requests/:id", get(get_one))
        .route("/registration-requests/:id/approve", post(approve))
        .route("/registration-requests/:id/reject", post(reject))
        .route("/outbox/flush", post(flush_outbox))
}

fn parse_id(raw: &str) -> Result<RegistrationRequestId, axum::response::Response> {
    RegistrationRequestId::from_str(raw).map_err(domain_error_to_response)
}

/// POST /registration-requests (anonymous)
pub async fn submit(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<SubmitRegistrationRequest>,
) -> axum::response::Response {
    match services.onboarding.submit(body.owner, body.company) {
        Ok(request) => (StatusCode::CREATED, Json(request)).into_response(),
        Err(e) => onboarding_error_to_response(e),
    }
}

/// GET /admin/registration-requests?status=pending
pub async fn list(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Query(query): Query<ListRegistrationsQuery>,
) -> axum::response::Response {
    let status = match query.status.as_deref().map(RegistrationStatus::from_str).transpose() {
        Ok(status) => status.unwrap_or_default(),
        Err(e) => return domain_error_to_response(e),
    };

    match services.onboarding.list(Some(principal.principal()), status) {
        Ok(requests) => Json(json!({ "status": status, "requests": requests })).into_response(),
        Err(e) => onboarding_error_to_response(e),
    }
}

/// GET /admin/registration-requests/:id
pub async fn get_one(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match parse_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    match services.onboarding.get(Some(principal.principal()), id) {
        Ok(request) => Json(request).into_response(),
        Err(e) => onboarding_error_to_response(e),
    }
}

/// POST /admin/registration-requests/:id/approve
pub async fn approve(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match parse_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    match services.onboarding.approve(Some(principal.principal()), id) {
        Ok(receipt) => Json(receipt).into_response(),
        Err(e) => onboarding_error_to_response(e),
    }
}

/// POST /admin/registration-requests/:id/reject
pub async fn reject(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Json(body): Json<RejectRegistrationRequest>,
) -> axum::response::Response {
    let id = match parse_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    match services.onboarding.reject(Some(principal.principal()), id, &body.reason) {
        Ok(request) => Json(request).into_response(),
        Err(e) => onboarding_error_to_response(e),
    }
}

/// POST /admin/outbox/flush - retry undelivered owner notifications.
pub async fn flush_outbox(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> axum::response::Response {
    let role = principal.principal().role;
    if role != Role::PlatformAdmin {
        return authz_error_to_response(AuthzError::RoleNotAllowed { role });
    }
    Json(services.onboarding.flush_outbox()).into_response()
}
