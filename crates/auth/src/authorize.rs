use serde::Serialize;
use thiserror::Error;

use crate::{PermissionSet, Principal, Role};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    /// No principal where one is required. Callers send the user to login.
    #[error("not authenticated")]
    NotAuthenticated,

    #[error("forbidden: missing permissions {missing:?}")]
    Forbidden { missing: Vec<String> },

    #[error("forbidden: role '{role}' is not allowed here")]
    RoleNotAllowed { role: Role },

    /// Temporary-credential principal that has not rotated its password yet.
    #[error("password change required before continuing")]
    PasswordChangeRequired,

    #[error("tenant mismatch")]
    TenantMismatch,
}

impl AuthzError {
    pub fn is_not_authenticated(&self) -> bool {
        matches!(self, AuthzError::NotAuthenticated)
    }
}

/// Which rule settled an authorization decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionKind {
    /// Nothing required after normalization.
    NoRestriction,
    NotAuthenticated,
    /// Platform admin or business owner.
    RoleBypass,
    Wildcard,
    AllPresent,
    MissingPermissions,
}

/// Auditable explanation of an authorization decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthorizationExplanation {
    pub granted: bool,
    pub kind: DecisionKind,
    pub reason: String,
    pub role: Option<Role>,
    pub required: Vec<String>,
    pub missing: Vec<String>,
}

/// Explain how `principal` fares against `required`.
///
/// Rules, first match wins:
/// 1. nothing required (after normalization) → granted
/// 2. no principal → denied, not authenticated
/// 3. platform admin / business owner → granted
/// 4. wildcard permission → granted
/// 5. every required permission held (AND) → granted, otherwise denied
pub fn explain<S: AsRef<str>>(principal: Option<&Principal>, required: &[S]) -> AuthorizationExplanation {
    let required = PermissionSet::from_raw(required);
    let required_list = required.to_strings();

    let decided = |granted, kind, reason: String, role, missing| AuthorizationExplanation {
        granted,
        kind,
        reason,
        role,
        required: required_list.clone(),
        missing,
    };

    if required.is_empty() {
        return decided(
            true,
            DecisionKind::NoRestriction,
            "no permissions required".to_string(),
            principal.map(|p| p.role),
            Vec::new(),
        );
    }

    let Some(principal) = principal else {
        return decided(
            false,
            DecisionKind::NotAuthenticated,
            "no authenticated principal".to_string(),
            None,
            required_list.clone(),
        );
    };

    if principal.role.bypasses_permission_checks() {
        return decided(
            true,
            DecisionKind::RoleBypass,
            format!("role '{}' bypasses permission checks", principal.role),
            Some(principal.role),
            Vec::new(),
        );
    }

    if principal.permissions.has_wildcard() {
        return decided(
            true,
            DecisionKind::Wildcard,
            "principal holds the wildcard permission '*'".to_string(),
            Some(principal.role),
            Vec::new(),
        );
    }

    let missing: Vec<String> = principal
        .permissions
        .missing_from(&required)
        .into_iter()
        .map(|p| p.as_str().to_string())
        .collect();

    if missing.is_empty() {
        decided(
            true,
            DecisionKind::AllPresent,
            "principal holds every required permission".to_string(),
            Some(principal.role),
            missing,
        )
    } else {
        decided(
            false,
            DecisionKind::MissingPermissions,
            format!("missing required permissions: {}", missing.join(", ")),
            Some(principal.role),
            missing,
        )
    }
}

/// Decide whether `principal` may perform an operation guarded by `required`.
///
/// Pure; the error tells "not authenticated" apart from "forbidden".
pub fn authorize<S: AsRef<str>>(principal: Option<&Principal>, required: &[S]) -> Result<(), AuthzError> {
    let explanation = explain(principal, required);
    match explanation.kind {
        DecisionKind::NotAuthenticated => Err(AuthzError::NotAuthenticated),
        DecisionKind::MissingPermissions => {
            tracing::debug!(
                principal = ?principal.map(|p| p.id),
                missing = ?explanation.missing,
                "permission check denied"
            );
            Err(AuthzError::Forbidden {
                missing: explanation.missing,
            })
        }
        _ => Ok(()),
    }
}

/// Boolean form of [`authorize`].
pub fn can_access<S: AsRef<str>>(principal: Option<&Principal>, required: &[S]) -> bool {
    explain(principal, required).granted
}
