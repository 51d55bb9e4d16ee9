use core::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Coarse-grained role of a principal.
///
/// Closed set; the wire form is snake_case (`"business_owner"`).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    PlatformAdmin,
    BusinessOwner,
    BusinessAdmin,
    Accountant,
    TeamMember,
    Client,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown role '{0}'")]
pub struct UnknownRole(pub String);

impl Role {
    pub const ALL: [Role; 6] = [
        Role::PlatformAdmin,
        Role::BusinessOwner,
        Role::BusinessAdmin,
        Role::Accountant,
        Role::TeamMember,
        Role::Client,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::PlatformAdmin => "platform_admin",
            Role::BusinessOwner => "business_owner",
            Role::BusinessAdmin => "business_admin",
            Role::Accountant => "accountant",
            Role::TeamMember => "team_member",
            Role::Client => "client",
        }
    }

    /// Roles that skip granular permission checks entirely.
    pub fn bypasses_permission_checks(&self) -> bool {
        matches!(self, Role::PlatformAdmin | Role::BusinessOwner)
    }

    /// Roles bound to exactly one tenant through `business_id`.
    pub fn is_tenant_bound(&self) -> bool {
        !matches!(self, Role::PlatformAdmin | Role::BusinessOwner)
    }

    /// Roles an owner or business admin may hand out through a team invite.
    pub fn is_invitable(&self) -> bool {
        matches!(
            self,
            Role::BusinessAdmin | Role::Accountant | Role::TeamMember | Role::Client
        )
    }
}

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Role::ALL
            .into_iter()
            .find(|r| r.as_str() == wanted)
            .ok_or_else(|| UnknownRole(s.to_string()))
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}
