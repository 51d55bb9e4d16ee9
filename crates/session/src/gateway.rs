//! Contract of the remote identity endpoints the session store talks to.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use bizdesk_auth::Principal;

use crate::SessionError;

#[derive(Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    /// Bot-challenge (captcha) token, when the client obtained one.
    #[serde(default)]
    pub bot_challenge: Option<String>,
}

impl core::fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("LoginRequest")
            .field("email", &self.email)
            .field("bot_challenge", &self.bot_challenge.is_some())
            .finish_non_exhaustive()
    }
}

impl LoginRequest {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
            bot_challenge: None,
        }
    }

    pub fn with_bot_challenge(mut self, token: impl Into<String>) -> Self {
        self.bot_challenge = Some(token.into());
        self
    }
}

/// Token + principal pair returned by every credential exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthGrant {
    pub token: String,
    pub principal: Principal,
}

#[async_trait]
pub trait IdentityGateway: Send + Sync {
    /// Credential validation; the principal may carry `must_change_password`.
    async fn login(&self, request: &LoginRequest) -> Result<AuthGrant, SessionError>;

    /// Canonical profile behind a bearer token.
    async fn current_principal(&self, token: &str) -> Result<Principal, SessionError>;

    async fn accept_invite(&self, invite_token: &str, new_password: &str) -> Result<AuthGrant, SessionError>;

    /// First-login rotation, authenticated by the temporary session's token.
    async fn change_password_first(&self, token: &str, new_password: &str) -> Result<AuthGrant, SessionError>;
}

#[async_trait]
impl<G: IdentityGateway + ?Sized> IdentityGateway for std::sync::Arc<G> {
    async fn login(&self, request: &LoginRequest) -> Result<AuthGrant, SessionError> {
        (**self).login(request).await
    }

    async fn current_principal(&self, token: &str) -> Result<Principal, SessionError> {
        (**self).current_principal(token).await
    }

    async fn accept_invite(&self, invite_token: &str, new_password: &str) -> Result<AuthGrant, SessionError> {
        (**self).accept_invite(invite_token, new_password).await
    }

    async fn change_password_first(&self, token: &str, new_password: &str) -> Result<AuthGrant, SessionError> {
        (**self).change_password_first(token, new_password).await
    }
}
