//! Identity endpoints: login, profile, first-login rotation, invites and
//! external sign-in.

use std::sync::Arc;

use axum::{
    Extension, Json, Router,
    extract::Path,
    http::StatusCode,
    response::IntoResponse,
    routing::post,
};

use bizdesk_session::{IdentityGateway, LoginRequest};

use crate::app::dto::{AcceptInviteRequest, ExternalCallbackRequest, GrantResponse, NewPasswordRequest};
use crate::app::errors::{exchange_error_to_response, session_error_to_response};
use crate::app::services::AppServices;
use crate::context::PrincipalContext;

/// The only route a temporary-credential session may call.
pub fn rotation_router() -> Router {
    Router::new().route("/auth/first-login/password", post(change_password_first))
}

/// POST /auth/login
pub async fn login(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<LoginRequest>,
) -> axum::response::Response {
    if body.email.trim().is_empty() || body.password.is_empty() {
        return session_error_to_response(bizdesk_session::SessionError::Validation(
            "email and password are required".into(),
        ));
    }

    match services.identity.login(&body).await {
        Ok(grant) => (StatusCode::OK, Json(GrantResponse::from(grant))).into_response(),
        Err(e) => {
            tracing::info!(email = %body.email, error = %e, "login refused");
            session_error_to_response(e)
        }
    }
}

/// GET /auth/me
pub async fn me(Extension(principal): Extension<PrincipalContext>) -> impl IntoResponse {
    Json(principal.principal().clone())
}

/// POST /auth/first-login/password
pub async fn change_password_first(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<NewPasswordRequest>,
) -> axum::response::Response {
    match services
        .identity
        .change_password_first(principal.token(), &body.new_password)
        .await
    {
        Ok(grant) => (StatusCode::OK, Json(GrantResponse::from(grant))).into_response(),
        Err(e) => session_error_to_response(e),
    }
}

/// POST /auth/invites/accept
pub async fn accept_invite(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<AcceptInviteRequest>,
) -> axum::response::Response {
    match services.identity.accept_invite(&body.token, &body.new_password).await {
        Ok(grant) => (StatusCode::OK, Json(GrantResponse::from(grant))).into_response(),
        Err(e) => session_error_to_response(e),
    }
}

/// POST /auth/external/:provider - finish a provider handshake.
pub async fn external_callback(
    Extension(services): Extension<Arc<AppServices>>,
    Path(provider): Path<String>,
    Json(body): Json<ExternalCallbackRequest>,
) -> axum::response::Response {
    let identity = match services.exchanges.exchange(&provider, &body.code).await {
        Ok(identity) => identity,
        Err(e) => return exchange_error_to_response(e),
    };

    match services.identity.sign_in_external(&identity) {
        Ok(grant) => (StatusCode::OK, Json(GrantResponse::from(grant))).into_response(),
        Err(e) => session_error_to_response(e),
    }
}
