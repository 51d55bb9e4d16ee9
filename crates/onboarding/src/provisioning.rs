//! Tenant + owner account creation for approved registrations.

use serde::{Deserialize, Serialize};

use bizdesk_core::{RegistrationRequestId, TenantId, UserId};

use crate::{OnboardingError, RegistrationRequest};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisioningRequest {
    /// Idempotency key: one tenant per registration request.
    pub registration_id: RegistrationRequestId,
    pub owner_name: String,
    pub owner_email: String,
    pub owner_phone: Option<String>,
    pub company_name: String,
    pub company_category: String,
    pub company_address: Option<String>,
    pub tax_id: Option<String>,
}

impl From<&RegistrationRequest> for ProvisioningRequest {
    fn from(req: &RegistrationRequest) -> Self {
        Self {
            registration_id: req.id,
            owner_name: req.owner.name.clone(),
            owner_email: req.owner.email.clone(),
            owner_phone: req.owner.phone.clone(),
            company_name: req.company.name.clone(),
            company_category: req.company.category.clone(),
            company_address: req.company.address.clone(),
            tax_id: req.company.tax_id.clone(),
        }
    }
}

/// Outcome of provisioning. The owner account always starts with
/// `must_change_password` set.
#[derive(Clone, PartialEq, Eq)]
pub struct ProvisionedAccount {
    pub tenant_id: TenantId,
    pub owner_id: UserId,
    pub login_email: String,
    pub temporary_password: String,
}

impl core::fmt::Debug for ProvisionedAccount {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ProvisionedAccount")
            .field("tenant_id", &self.tenant_id)
            .field("owner_id", &self.owner_id)
            .field("login_email", &self.login_email)
            .finish_non_exhaustive()
    }
}

/// Creates the tenant and its owner account.
///
/// Must be idempotent per `registration_id`: a repeated call returns the
/// same tenant, owner and temporary password while the owner has not rotated
/// yet, and fails afterwards.
pub trait TenantProvisioner: Send + Sync {
    fn provision(&self, request: &ProvisioningRequest) -> Result<ProvisionedAccount, OnboardingError>;
}

impl<P: TenantProvisioner + ?Sized> TenantProvisioner for std::sync::Arc<P> {
    fn provision(&self, request: &ProvisioningRequest) -> Result<ProvisionedAccount, OnboardingError> {
        (**self).provision(request)
    }
}
