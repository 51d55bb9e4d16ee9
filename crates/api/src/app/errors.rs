use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use bizdesk_auth::{AuthzError, ExchangeError};
use bizdesk_core::DomainError;
use bizdesk_infra::DirectoryError;
use bizdesk_onboarding::OnboardingError;
use bizdesk_session::SessionError;

pub fn json_error(status: StatusCode, code: &'static str, message: impl Into<String>) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

/// Not-authenticated (401) and forbidden (403) stay distinguishable.
pub fn authz_error_to_response(err: AuthzError) -> axum::response::Response {
    match err {
        AuthzError::NotAuthenticated => json_error(StatusCode::UNAUTHORIZED, "not_authenticated", err.to_string()),
        AuthzError::Forbidden { ref missing } => (
            StatusCode::FORBIDDEN,
            axum::Json(json!({
                "error": "forbidden",
                "message": err.to_string(),
                "missing": missing,
            })),
        )
            .into_response(),
        AuthzError::RoleNotAllowed { .. } => json_error(StatusCode::FORBIDDEN, "forbidden", err.to_string()),
        AuthzError::PasswordChangeRequired => {
            json_error(StatusCode::FORBIDDEN, "password_change_required", err.to_string())
        }
        AuthzError::TenantMismatch => json_error(StatusCode::FORBIDDEN, "tenant_mismatch", err.to_string()),
    }
}

pub fn domain_error_to_response(err: DomainError) -> axum::response::Response {
    match err {
        DomainError::Validation(msg) => json_error(StatusCode::BAD_REQUEST, "validation_error", msg),
        DomainError::InvalidId(msg) => json_error(StatusCode::BAD_REQUEST, "invalid_id", msg),
        DomainError::NotFound(msg) => json_error(StatusCode::NOT_FOUND, "not_found", msg),
        DomainError::Conflict(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
        DomainError::InvariantViolation(msg) => {
            json_error(StatusCode::UNPROCESSABLE_ENTITY, "invariant_violation", msg)
        }
        DomainError::Unauthorized => json_error(StatusCode::FORBIDDEN, "forbidden", "unauthorized"),
    }
}

pub fn onboarding_error_to_response(err: OnboardingError) -> axum::response::Response {
    match err {
        OnboardingError::Domain(e) => domain_error_to_response(e),
        OnboardingError::Authz(e) => authz_error_to_response(e),
        OnboardingError::Provisioning(msg) => json_error(StatusCode::BAD_GATEWAY, "provisioning_failed", msg),
        OnboardingError::Store(msg) => json_error(StatusCode::INTERNAL_SERVER_ERROR, "store_error", msg),
    }
}

pub fn session_error_to_response(err: SessionError) -> axum::response::Response {
    match err {
        SessionError::NotAuthenticated => json_error(StatusCode::UNAUTHORIZED, "not_authenticated", err.to_string()),
        SessionError::InvalidCredentials => {
            json_error(StatusCode::UNAUTHORIZED, "invalid_credentials", err.to_string())
        }
        SessionError::AccountLocked { until } => (
            StatusCode::LOCKED,
            axum::Json(json!({
                "error": "account_locked",
                "message": err.to_string(),
                "locked_until": until,
            })),
        )
            .into_response(),
        SessionError::Validation(msg) => json_error(StatusCode::BAD_REQUEST, "validation_error", msg),
        SessionError::Authz(e) => authz_error_to_response(e),
        SessionError::Transport(msg) => json_error(StatusCode::BAD_GATEWAY, "upstream_error", msg),
    }
}

pub fn directory_error_to_response(err: DirectoryError) -> axum::response::Response {
    session_error_to_response(err.into())
}

pub fn exchange_error_to_response(err: ExchangeError) -> axum::response::Response {
    match err {
        ExchangeError::UnknownProvider(_) => json_error(StatusCode::NOT_FOUND, "unknown_provider", err.to_string()),
        ExchangeError::Rejected(_) => json_error(StatusCode::UNAUTHORIZED, "exchange_rejected", err.to_string()),
        ExchangeError::MissingEmail => json_error(StatusCode::BAD_REQUEST, "validation_error", err.to_string()),
        ExchangeError::Transport(_) => json_error(StatusCode::BAD_GATEWAY, "upstream_error", err.to_string()),
    }
}
