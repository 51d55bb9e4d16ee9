use thiserror::Error;

use bizdesk_auth::AuthzError;
use bizdesk_core::DomainError;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum OnboardingError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Authz(#[from] AuthzError),

    /// Tenant/account creation failed; the request stays pending.
    #[error("provisioning failed: {0}")]
    Provisioning(String),

    #[error("store error: {0}")]
    Store(String),
}

impl OnboardingError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, OnboardingError::Domain(DomainError::Conflict(_)))
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, OnboardingError::Domain(DomainError::Validation(_)))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, OnboardingError::Domain(DomainError::NotFound(_)))
    }
}
