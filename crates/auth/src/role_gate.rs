//! Coarse role allow-list for whole route subtrees (e.g. the admin console).
//!
//! A role mismatch never yields a raw denial: the principal is sent to the
//! landing page that fits their role instead.

use serde::Serialize;

use crate::guard::{NavigationPaths, safe_return_path};
use crate::{Principal, Role, UnknownRole};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum GateDecision {
    Allow,
    /// No principal; `return_to` lets navigation resume after login.
    RedirectToLogin { return_to: Option<String> },
    /// Role not in the allow-list.
    Redirect { to: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleGate {
    allowed: Vec<Role>,
}

impl RoleGate {
    pub fn new(allowed: impl IntoIterator<Item = Role>) -> Self {
        Self {
            allowed: allowed.into_iter().collect(),
        }
    }

    /// Build a gate from wire role names; unknown names are rejected.
    pub fn from_names<I, S>(names: I) -> Result<Self, UnknownRole>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let allowed = names
            .into_iter()
            .map(|n| n.as_ref().parse())
            .collect::<Result<Vec<Role>, _>>()?;
        Ok(Self { allowed })
    }

    pub fn allowed(&self) -> &[Role] {
        &self.allowed
    }

    /// An empty allow-list admits everybody.
    pub fn permits(&self, role: Role) -> bool {
        self.allowed.is_empty() || self.allowed.contains(&role)
    }

    pub fn can_access(&self, principal: Option<&Principal>) -> bool {
        if self.allowed.is_empty() {
            return true;
        }
        principal.is_some_and(|p| self.permits(p.role))
    }

    pub fn check(&self, principal: Option<&Principal>, requested_path: &str, paths: &NavigationPaths) -> GateDecision {
        if self.allowed.is_empty() {
            return GateDecision::Allow;
        }

        let Some(principal) = principal else {
            return GateDecision::RedirectToLogin {
                return_to: safe_return_path(requested_path, paths),
            };
        };

        if self.permits(principal.role) {
            return GateDecision::Allow;
        }

        tracing::debug!(role = %principal.role, path = requested_path, "role gate redirect");
        GateDecision::Redirect {
            to: paths.home_for(principal.role).to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bizdesk_core::UserId;

    fn p(role: Role) -> Principal {
        Principal::new(UserId::new(), "x@example.com", "X", role)
    }

    #[test]
    fn empty_allow_list_admits_anyone() {
        let gate = RoleGate::default();
        assert!(gate.can_access(None));
        assert_eq!(gate.check(None, "/x", &NavigationPaths::default()), GateDecision::Allow);
    }

    #[test]
    fn anonymous_is_sent_to_login_with_return_path() {
        let gate = RoleGate::new([Role::PlatformAdmin]);
        let decision = gate.check(None, "/admin/requests", &NavigationPaths::default());
        assert_eq!(
            decision,
            GateDecision::RedirectToLogin {
                return_to: Some("/admin/requests".to_string())
            }
        );
    }

    #[test]
    fn wrong_role_lands_on_role_home() {
        let paths = NavigationPaths::default();

        let owners_only = RoleGate::new([Role::BusinessOwner]);
        assert_eq!(
            owners_only.check(Some(&p(Role::PlatformAdmin)), "/settings", &paths),
            GateDecision::Redirect { to: "/admin".into() }
        );

        let admin_only = RoleGate::new([Role::PlatformAdmin]);
        assert_eq!(
            admin_only.check(Some(&p(Role::Accountant)), "/admin", &paths),
            GateDecision::Redirect { to: "/dashboard".into() }
        );
    }

    #[test]
    fn unknown_role_names_are_rejected() {
        assert!(RoleGate::from_names(["platform_admin", "root"]).is_err());
        let gate = RoleGate::from_names(["Business_Admin"]).unwrap();
        assert!(gate.permits(Role::BusinessAdmin));
    }
}
