use axum::{Extension, Json, http::StatusCode, response::IntoResponse};

use bizdesk_auth::explain as explain_decision;

use crate::app::dto::ExplainRequest;
use crate::context::PrincipalContext;

pub async fn health() -> StatusCode {
    StatusCode::OK
}

/// POST /authz/explain - why the current principal would be allowed or
/// denied the given permissions.
pub async fn explain(
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<ExplainRequest>,
) -> impl IntoResponse {
    Json(explain_decision(Some(principal.principal()), body.permissions.as_slice()))
}
