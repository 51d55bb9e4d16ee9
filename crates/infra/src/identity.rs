//! In-process implementation of the identity endpoints.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;

use bizdesk_auth::{ExternalIdentity, Hs256JwtValidator, JwtValidator, Principal, TokenError};
use bizdesk_session::{AuthGrant, IdentityGateway, LoginRequest, SessionError};

use crate::accounts::{AccountDirectory, DirectoryError};

impl From<DirectoryError> for SessionError {
    fn from(err: DirectoryError) -> Self {
        match err {
            DirectoryError::InvalidCredentials => SessionError::InvalidCredentials,
            DirectoryError::AccountLocked { until } => SessionError::AccountLocked { until },
            DirectoryError::UnknownAccount => SessionError::NotAuthenticated,
            DirectoryError::Password(e) => e.into(),
            DirectoryError::Authz(e) => SessionError::Authz(e),
            DirectoryError::Poisoned => SessionError::transport("account directory unavailable"),
            other => SessionError::Validation(other.to_string()),
        }
    }
}

fn token_error(err: TokenError) -> SessionError {
    match err {
        TokenError::Signing(msg) => SessionError::transport(msg),
        _ => SessionError::NotAuthenticated,
    }
}

/// Issues and resolves bearer tokens against an [`AccountDirectory`].
#[derive(Debug, Clone)]
pub struct DirectoryIdentityGateway {
    directory: Arc<AccountDirectory>,
    tokens: Hs256JwtValidator,
}

impl DirectoryIdentityGateway {
    pub fn new(directory: Arc<AccountDirectory>, tokens: Hs256JwtValidator) -> Self {
        Self { directory, tokens }
    }

    pub fn directory(&self) -> &Arc<AccountDirectory> {
        &self.directory
    }

    pub fn grant(&self, principal: Principal) -> Result<AuthGrant, SessionError> {
        let token = self.tokens.issue(&principal, Utc::now()).map_err(token_error)?;
        Ok(AuthGrant { token, principal })
    }

    /// Canonical principal behind `token`.
    ///
    /// A token minted before a password rotation no longer matches the
    /// account's flag and is refused.
    pub fn resolve(&self, token: &str) -> Result<Principal, SessionError> {
        let claims = self.tokens.validate(token, Utc::now()).map_err(token_error)?;
        let principal = self.directory.principal(claims.sub)?;
        if claims.must_change_password != principal.must_change_password {
            tracing::debug!(user = %principal.id, "stale token after password rotation");
            return Err(SessionError::NotAuthenticated);
        }
        Ok(principal)
    }

    /// Token for an external sign-in; only known accounts are accepted.
    pub fn sign_in_external(&self, identity: &ExternalIdentity) -> Result<AuthGrant, SessionError> {
        let principal = self.directory.sign_in_external(identity, Utc::now())?;
        tracing::info!(user = %principal.id, provider = %identity.provider, "external sign-in");
        self.grant(principal)
    }
}

#[async_trait]
impl IdentityGateway for DirectoryIdentityGateway {
    async fn login(&self, request: &LoginRequest) -> Result<AuthGrant, SessionError> {
        let principal = self.directory.verify_credentials(
            &request.email,
            &request.password,
            request.bot_challenge.as_deref(),
            Utc::now(),
        )?;
        tracing::info!(user = %principal.id, flagged = principal.must_change_password, "login succeeded");
        self.grant(principal)
    }

    async fn current_principal(&self, token: &str) -> Result<Principal, SessionError> {
        self.resolve(token)
    }

    async fn accept_invite(&self, invite_token: &str, new_password: &str) -> Result<AuthGrant, SessionError> {
        let principal = self.directory.accept_invite(invite_token, new_password)?;
        self.grant(principal)
    }

    async fn change_password_first(&self, token: &str, new_password: &str) -> Result<AuthGrant, SessionError> {
        let current = self.resolve(token)?;
        let principal = self.directory.change_password_first(current.id, new_password)?;
        self.grant(principal)
    }
}
