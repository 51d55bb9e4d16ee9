use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use bizdesk_core::{TenantId, UserId};

use crate::{PermissionSet, Role};

/// The authenticated identity and its authorization attributes.
///
/// Sessions replace a principal wholesale; nothing mutates one in place once
/// it has been handed out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: UserId,
    pub display_name: String,
    pub email: String,
    pub role: Role,
    #[serde(default)]
    pub permissions: PermissionSet,
    /// Tenant the principal is bound to. Owners may own several tenants and
    /// platform admins none, so this is optional.
    #[serde(default)]
    pub business_id: Option<TenantId>,
    /// Set on temporary-credential accounts until the first rotation.
    #[serde(default)]
    pub must_change_password: bool,
    #[serde(default)]
    pub locked_until: Option<DateTime<Utc>>,
}

impl Principal {
    pub fn new(id: UserId, email: impl Into<String>, display_name: impl Into<String>, role: Role) -> Self {
        Self {
            id,
            display_name: display_name.into(),
            email: email.into(),
            role,
            permissions: PermissionSet::new(),
            business_id: None,
            must_change_password: false,
            locked_until: None,
        }
    }

    pub fn with_permissions<I, S>(mut self, raw: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.permissions = PermissionSet::from_raw(raw);
        self
    }

    pub fn with_business(mut self, tenant_id: TenantId) -> Self {
        self.business_id = Some(tenant_id);
        self
    }

    pub fn requiring_password_change(mut self) -> Self {
        self.must_change_password = true;
        self
    }

    pub fn is_locked(&self, now: DateTime<Utc>) -> bool {
        self.locked_until.is_some_and(|until| until > now)
    }
}
