//! API-side permission guard for handlers.
//!
//! Evaluated before the handler touches any service, so a denied request has
//! no side effects.

use bizdesk_auth::{AuthzError, authorize};

use crate::context::PrincipalContext;

/// Require every permission in `required` for the current principal.
///
/// Temporary-credential principals are refused outright, whatever their role.
pub fn require_permissions(principal: &PrincipalContext, required: &[&str]) -> Result<(), AuthzError> {
    let principal = principal.principal();
    if principal.must_change_password {
        return Err(AuthzError::PasswordChangeRequired);
    }
    authorize(Some(principal), required)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bizdesk_auth::{Principal, Role};
    use bizdesk_core::UserId;

    fn ctx(principal: Principal) -> PrincipalContext {
        PrincipalContext::new(principal, "token".into())
    }

    #[test]
    fn member_needs_every_permission() {
        let member = Principal::new(UserId::new(), "m@x.tn", "M", Role::TeamMember).with_permissions(["invoices.view"]);
        assert_eq!(
            require_permissions(&ctx(member), &["invoices.view", "invoices.create"]),
            Err(AuthzError::Forbidden {
                missing: vec!["invoices.create".to_string()]
            })
        );
    }

    #[test]
    fn flagged_owner_is_refused_despite_bypass() {
        let owner = Principal::new(UserId::new(), "o@x.tn", "O", Role::BusinessOwner).requiring_password_change();
        assert_eq!(
            require_permissions(&ctx(owner), &["team.invite"]),
            Err(AuthzError::PasswordChangeRequired)
        );
    }
}
