//! Tenant scope check for tenant-scoped operations.

use bizdesk_core::{TenantId, UserId};

use crate::{AuthzError, Principal, Role};

/// Read access to tenant existence and ownership.
pub trait TenantDirectory: Send + Sync {
    fn tenant_exists(&self, tenant_id: TenantId) -> bool;

    fn owner_of(&self, tenant_id: TenantId) -> Option<UserId>;
}

impl<D: TenantDirectory + ?Sized> TenantDirectory for std::sync::Arc<D> {
    fn tenant_exists(&self, tenant_id: TenantId) -> bool {
        (**self).tenant_exists(tenant_id)
    }

    fn owner_of(&self, tenant_id: TenantId) -> Option<UserId> {
        (**self).owner_of(tenant_id)
    }
}

/// Decide whether `principal` may act inside `tenant_id`.
///
/// - temporary-credential principals never reach tenant data
/// - unknown tenants are treated as "not authenticated" for tenant work
/// - platform admins may enter any existing tenant
/// - owners may enter the tenants they own
/// - everybody else only their own `business_id`
pub fn authorize_tenant<D: TenantDirectory + ?Sized>(
    principal: Option<&Principal>,
    tenant_id: TenantId,
    directory: &D,
) -> Result<(), AuthzError> {
    let principal = principal.ok_or(AuthzError::NotAuthenticated)?;

    if principal.must_change_password {
        return Err(AuthzError::PasswordChangeRequired);
    }

    if !directory.tenant_exists(tenant_id) {
        tracing::warn!(principal = %principal.id, tenant = %tenant_id, "unknown tenant requested");
        return Err(AuthzError::NotAuthenticated);
    }

    let allowed = if principal.role == Role::PlatformAdmin {
        true
    } else if principal.role.is_tenant_bound() {
        principal.business_id == Some(tenant_id)
    } else {
        directory.owner_of(tenant_id) == Some(principal.id) || principal.business_id == Some(tenant_id)
    };

    if allowed {
        Ok(())
    } else {
        tracing::warn!(principal = %principal.id, tenant = %tenant_id, "tenant scope denied");
        Err(AuthzError::TenantMismatch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[derive(Default)]
    struct Tenants(HashMap<TenantId, UserId>);

    impl TenantDirectory for Tenants {
        fn tenant_exists(&self, tenant_id: TenantId) -> bool {
            self.0.contains_key(&tenant_id)
        }

        fn owner_of(&self, tenant_id: TenantId) -> Option<UserId> {
            self.0.get(&tenant_id).copied()
        }
    }

    #[test]
    fn owner_may_enter_every_owned_tenant() {
        let owner = Principal::new(UserId::new(), "o@x.tn", "O", Role::BusinessOwner);
        let (a, b) = (TenantId::new(), TenantId::new());
        let tenants = Tenants(HashMap::from([(a, owner.id), (b, owner.id)]));

        assert!(authorize_tenant(Some(&owner), a, &tenants).is_ok());
        assert!(authorize_tenant(Some(&owner), b, &tenants).is_ok());
    }

    #[test]
    fn flagged_owner_is_kept_out() {
        let owner = Principal::new(UserId::new(), "o@x.tn", "O", Role::BusinessOwner).requiring_password_change();
        let tenant = TenantId::new();
        let tenants = Tenants(HashMap::from([(tenant, owner.id)]));

        assert_eq!(
            authorize_tenant(Some(&owner), tenant, &tenants),
            Err(AuthzError::PasswordChangeRequired)
        );
    }

    #[test]
    fn bound_roles_stay_in_their_tenant() {
        let mine = TenantId::new();
        let other = TenantId::new();
        let tenants = Tenants(HashMap::from([(mine, UserId::new()), (other, UserId::new())]));
        let accountant = Principal::new(UserId::new(), "a@x.tn", "A", Role::Accountant).with_business(mine);

        assert!(authorize_tenant(Some(&accountant), mine, &tenants).is_ok());
        assert_eq!(
            authorize_tenant(Some(&accountant), other, &tenants),
            Err(AuthzError::TenantMismatch)
        );
    }

    #[test]
    fn missing_tenant_or_principal_is_unauthenticated() {
        let tenants = Tenants::default();
        let admin = Principal::new(UserId::new(), "root@x.tn", "Root", Role::PlatformAdmin);

        assert_eq!(
            authorize_tenant(Some(&admin), TenantId::new(), &tenants),
            Err(AuthzError::NotAuthenticated)
        );
        assert_eq!(
            authorize_tenant(None, TenantId::new(), &tenants),
            Err(AuthzError::NotAuthenticated)
        );
    }
}
