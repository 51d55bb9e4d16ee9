//! Request/response bodies.

use serde::{Deserialize, Serialize};

use bizdesk_auth::Principal;
use bizdesk_onboarding::{CompanyInfo, OwnerInfo};
use bizdesk_session::AuthGrant;

#[derive(Debug, Serialize)]
pub struct GrantResponse {
    pub token: String,
    pub must_change_password: bool,
    pub principal: Principal,
}

impl From<AuthGrant> for GrantResponse {
    fn from(grant: AuthGrant) -> Self {
        Self {
            token: grant.token,
            must_change_password: grant.principal.must_change_password,
            principal: grant.principal,
        }
    }
}

#[derive(Deserialize)]
pub struct NewPasswordRequest {
    pub new_password: String,
}

#[derive(Deserialize)]
pub struct AcceptInviteRequest {
    pub token: String,
    pub new_password: String,
}

#[derive(Debug, Deserialize)]
pub struct ExternalCallbackRequest {
    pub code: String,
}

#[derive(Debug, Deserialize)]
pub struct ExplainRequest {
    #[serde(default)]
    pub permissions: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct InviteMemberRequest {
    pub email: String,
    pub display_name: String,
    pub role: String,
    #[serde(default)]
    pub permissions: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct SubmitRegistrationRequest {
    pub owner: OwnerInfo,
    pub company: CompanyInfo,
}

#[derive(Debug, Deserialize)]
pub struct ListRegistrationsQuery {
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RejectRegistrationRequest {
    #[serde(default)]
    pub reason: String,
}
