//! `bizdesk-auth` — pure authentication/authorization boundary.
//!
//! This crate is intentionally decoupled from HTTP and storage: it decides,
//! callers enforce.

pub mod authorize;
pub mod claims;
pub mod config;
pub mod external;
pub mod guard;
pub mod password;
pub mod permissions;
pub mod principal;
pub mod role_gate;
pub mod roles;
pub mod tenant;
pub mod token;

pub use authorize::{
    AuthorizationExplanation, AuthzError, DecisionKind, authorize, can_access, explain,
};
pub use claims::{TokenClaims, TokenError, validate_claims};
pub use config::AuthConfig;
pub use external::{ExchangeError, ExternalIdentity, IdentityExchange, IdentityExchangeRegistry};
pub use guard::{Navigation, NavigationPaths, RouteGuard, RouteRequirement};
pub use password::{PasswordError, PasswordPolicy};
pub use permissions::{Permission, PermissionSet, normalize};
pub use principal::Principal;
pub use role_gate::{GateDecision, RoleGate};
pub use roles::{Role, UnknownRole};
pub use tenant::{TenantDirectory, authorize_tenant};
pub use token::{Hs256JwtValidator, JwtValidator};
