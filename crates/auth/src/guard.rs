//! Navigation guard: the single place route entry is decided.
//!
//! Evaluation order for a protected route:
//! 1. no principal → login (remembering where the user was going)
//! 2. `must_change_password` → password reset screen (same)
//! 3. role gate → role-appropriate landing page
//! 4. permission gate → visible denial listing what is missing

use serde::{Deserialize, Serialize};

use crate::{AuthConfig, Principal, Role, RoleGate, role_gate::GateDecision};

/// Well-known client locations the guard redirects to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavigationPaths {
    pub login: String,
    pub password_reset: String,
    pub admin_home: String,
    pub dashboard_home: String,
}

impl Default for NavigationPaths {
    fn default() -> Self {
        Self {
            login: "/login".into(),
            password_reset: "/first-login".into(),
            admin_home: "/admin".into(),
            dashboard_home: "/dashboard".into(),
        }
    }
}

impl NavigationPaths {
    pub fn from_config(config: &AuthConfig) -> Self {
        Self {
            login: config.login_path.clone(),
            password_reset: config.password_reset_path.clone(),
            admin_home: config.admin_home.clone(),
            dashboard_home: config.dashboard_home.clone(),
        }
    }

    pub fn home_for(&self, role: Role) -> &str {
        match role {
            Role::PlatformAdmin => &self.admin_home,
            _ => &self.dashboard_home,
        }
    }
}

/// Keep `requested` as a post-login destination only when it is a same-site
/// path that is not itself an auth screen.
pub(crate) fn safe_return_path(requested: &str, paths: &NavigationPaths) -> Option<String> {
    let requested = requested.trim();
    if !requested.starts_with('/') || requested.starts_with("//") {
        return None;
    }
    let path_only = requested.split(['?', '#']).next().unwrap_or(requested);
    if path_only == paths.login || path_only == paths.password_reset {
        return None;
    }
    Some(requested.to_string())
}

/// What a route demands from whoever enters it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteRequirement {
    pub public: bool,
    pub roles: Vec<Role>,
    pub permissions: Vec<String>,
}

impl RouteRequirement {
    /// Reachable without a session (login, signup request form).
    pub fn public() -> Self {
        Self {
            public: true,
            ..Self::default()
        }
    }

    /// Any authenticated principal.
    pub fn authenticated() -> Self {
        Self::default()
    }

    pub fn roles(mut self, roles: impl IntoIterator<Item = Role>) -> Self {
        self.roles = roles.into_iter().collect();
        self
    }

    pub fn permissions<I, S>(mut self, permissions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.permissions = permissions.into_iter().map(Into::into).collect();
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "navigation", rename_all = "snake_case")]
pub enum Navigation {
    Allow,
    RedirectToLogin { return_to: Option<String> },
    RedirectToPasswordReset { return_to: Option<String> },
    Redirect { to: String },
    Forbidden { missing: Vec<String> },
}

impl Navigation {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Navigation::Allow)
    }
}

#[derive(Debug, Clone, Default)]
pub struct RouteGuard {
    paths: NavigationPaths,
}

impl RouteGuard {
    pub fn new(paths: NavigationPaths) -> Self {
        Self { paths }
    }

    pub fn paths(&self) -> &NavigationPaths {
        &self.paths
    }

    pub fn evaluate(&self, principal: Option<&Principal>, route: &RouteRequirement, requested_path: &str) -> Navigation {
        if route.public {
            return Navigation::Allow;
        }

        let Some(principal) = principal else {
            return Navigation::RedirectToLogin {
                return_to: safe_return_path(requested_path, &self.paths),
            };
        };

        if principal.must_change_password {
            let path_only = requested_path.split(['?', '#']).next().unwrap_or(requested_path);
            if path_only == self.paths.password_reset {
                return Navigation::Allow;
            }
            return Navigation::RedirectToPasswordReset {
                return_to: safe_return_path(requested_path, &self.paths),
            };
        }

        match RoleGate::new(route.roles.iter().copied()).check(Some(principal), requested_path, &self.paths) {
            GateDecision::Allow => {}
            GateDecision::Redirect { to } => return Navigation::Redirect { to },
            GateDecision::RedirectToLogin { return_to } => return Navigation::RedirectToLogin { return_to },
        }

        match crate::authorize(Some(principal), &route.permissions) {
            Ok(()) => Navigation::Allow,
            Err(crate::AuthzError::Forbidden { missing }) => Navigation::Forbidden { missing },
            Err(_) => Navigation::RedirectToLogin {
                return_to: safe_return_path(requested_path, &self.paths),
            },
        }
    }
}
