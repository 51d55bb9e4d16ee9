use bizdesk_auth::Principal;
use bizdesk_core::TenantId;

/// Tenant context for a tenant-scoped request, established only after the
/// tenant scope check passed.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct TenantContext {
    tenant_id: TenantId,
}

impl TenantContext {
    pub fn new(tenant_id: TenantId) -> Self {
        Self { tenant_id }
    }

    pub fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }
}

/// Canonical principal behind the request's bearer token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrincipalContext {
    principal: Principal,
    token: String,
}

impl PrincipalContext {
    pub fn new(principal: Principal, token: String) -> Self {
        Self { principal, token }
    }

    pub fn principal(&self) -> &Principal {
        &self.principal
    }

    pub fn token(&self) -> &str {
        &self.token
    }
}
