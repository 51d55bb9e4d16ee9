use std::str::FromStr;
use std::sync::Arc;

use axum::{Extension, Json, Router, http::StatusCode, response::IntoResponse, routing::post};
use serde_json::json;

use bizdesk_auth::permissions::known;
use bizdesk_auth::Role;

use crate::app::dto::InviteMemberRequest;
use crate::app::errors::{authz_error_to_response, directory_error_to_response, json_error};
use crate::app::services::AppServices;
use crate::authz;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new().route("/invites", post(invite_member))
}

/// POST /team/invites
///
/// The member account starts with `must_change_password`; the returned
/// invite token is what the invitee exchanges for their own password.
pub async fn invite_member(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<InviteMemberRequest>,
) -> axum::response::Response {
    if let Err(e) = authz::require_permissions(&principal, &[known::TEAM_INVITE]) {
        return authz_error_to_response(e);
    }

    let role = match Role::from_str(&body.role) {
        Ok(role) => role,
        Err(e) => return json_error(StatusCode::BAD_REQUEST, "validation_error", e.to_string()),
    };

    match services.directory.invite_member(
        principal.principal(),
        &body.email,
        &body.display_name,
        role,
        &body.permissions,
    ) {
        Ok(invitation) => (
            StatusCode::CREATED,
            Json(json!({
                "invite_token": invitation.token,
                "member": invitation.member,
            })),
        )
            .into_response(),
        Err(e) => directory_error_to_response(e),
    }
}
