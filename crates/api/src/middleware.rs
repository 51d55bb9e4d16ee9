use std::str::FromStr;
use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};

use bizdesk_auth::authorize_tenant;
use bizdesk_core::TenantId;

use crate::app::AppServices;
use crate::app::errors::{authz_error_to_response, domain_error_to_response, json_error, session_error_to_response};
use crate::context::{PrincipalContext, TenantContext};

/// Header carrying the tenant for tenant-scoped endpoints.
pub const BUSINESS_ID_HEADER: &str = "x-business-id";

/// Resolve the bearer token into the canonical principal.
pub async fn auth_middleware(
    State(services): State<Arc<AppServices>>,
    mut req: Request,
    next: Next,
) -> Result<Response, Response> {
    let token = extract_bearer(req.headers())
        .ok_or_else(|| json_error(StatusCode::UNAUTHORIZED, "not_authenticated", "missing bearer token"))?
        .to_string();

    let principal = services.identity.resolve(&token).map_err(session_error_to_response)?;

    req.extensions_mut().insert(PrincipalContext::new(principal, token));
    Ok(next.run(req).await)
}

/// Temporary-credential sessions only reach the password rotation.
pub async fn first_login_gate(req: Request, next: Next) -> Result<Response, Response> {
    let Some(ctx) = req.extensions().get::<PrincipalContext>() else {
        return Err(json_error(StatusCode::UNAUTHORIZED, "not_authenticated", "not authenticated"));
    };

    if ctx.principal().must_change_password {
        tracing::debug!(principal = %ctx.principal().id, path = %req.uri().path(), "blocked until password rotation");
        return Err(json_error(
            StatusCode::FORBIDDEN,
            "password_change_required",
            "password change required before continuing",
        ));
    }

    Ok(next.run(req).await)
}

/// Establish [`TenantContext`] from `X-Business-Id` after the tenant scope check.
pub async fn tenant_middleware(
    State(services): State<Arc<AppServices>>,
    mut req: Request,
    next: Next,
) -> Result<Response, Response> {
    let raw = req
        .headers()
        .get(BUSINESS_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| json_error(StatusCode::BAD_REQUEST, "missing_business_id", "X-Business-Id header is required"))?;
    let tenant_id = TenantId::from_str(raw).map_err(domain_error_to_response)?;

    let principal = req.extensions().get::<PrincipalContext>().map(|c| c.principal());
    authorize_tenant(principal, tenant_id, services.directory.as_ref()).map_err(authz_error_to_response)?;

    req.extensions_mut().insert(TenantContext::new(tenant_id));
    Ok(next.run(req).await)
}

fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    let header = headers.get(axum::http::header::AUTHORIZATION)?;
    let header = header.to_str().ok()?;
    let token = header.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        return None;
    }
    Some(token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn bearer_extraction() {
        let mut headers = HeaderMap::new();
        assert_eq!(extract_bearer(&headers), None);

        headers.insert(axum::http::header::AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(extract_bearer(&headers), None);

        headers.insert(axum::http::header::AUTHORIZATION, HeaderValue::from_static("Bearer   "));
        assert_eq!(extract_bearer(&headers), None);

        headers.insert(axum::http::header::AUTHORIZATION, HeaderValue::from_static("Bearer abc.def"));
        assert_eq!(extract_bearer(&headers), Some("abc.def"));
    }
}
