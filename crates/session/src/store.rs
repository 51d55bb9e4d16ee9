//! Session/identity store.

use std::sync::{Arc, RwLock, RwLockWriteGuard};

use chrono::Utc;

use bizdesk_auth::{
    Navigation, PasswordPolicy, Principal, RouteGuard, RouteRequirement, TenantDirectory, authorize_tenant,
};
use bizdesk_core::TenantId;
use bizdesk_events::{EventBus, InMemoryEventBus, Subscription};

use crate::{
    AuthGrant, CredentialStorage, IdentityGateway, LoginRequest, SessionChangeKind, SessionChanged, SessionError,
};

/// Immutable view of the session at one point in time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionSnapshot {
    /// False until startup resolution finished; protected content waits on it.
    pub ready: bool,
    pub token: Option<String>,
    pub principal: Option<Principal>,
    pub selected_tenant: Option<TenantId>,
    /// Location to resume once login or the password rotation completes.
    pub return_to: Option<String>,
}

impl SessionSnapshot {
    pub fn is_authenticated(&self) -> bool {
        self.principal.is_some() && self.token.is_some()
    }

    pub fn requires_password_change(&self) -> bool {
        self.principal.as_ref().is_some_and(|p| p.must_change_password)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    Authenticated(Principal),
    /// Temporary credential: only the first-login rotation is open now.
    PasswordChangeRequired(Principal),
}

pub struct SessionStore<G, S> {
    gateway: G,
    storage: S,
    policy: PasswordPolicy,
    guard: RouteGuard,
    state: RwLock<Arc<SessionSnapshot>>,
    bus: InMemoryEventBus<SessionChanged>,
}

impl<G, S> SessionStore<G, S>
where
    G: IdentityGateway,
    S: CredentialStorage,
{
    pub fn new(gateway: G, storage: S, policy: PasswordPolicy, guard: RouteGuard) -> Self {
        Self {
            gateway,
            storage,
            policy,
            guard,
            state: RwLock::new(Arc::new(SessionSnapshot::default())),
            bus: InMemoryEventBus::new(),
        }
    }

    /// Current snapshot. Readers should not hold on to it across changes.
    pub fn snapshot(&self) -> Arc<SessionSnapshot> {
        match self.state.read() {
            Ok(s) => Arc::clone(&s),
            Err(poisoned) => Arc::clone(&poisoned.into_inner()),
        }
    }

    pub fn is_ready(&self) -> bool {
        self.snapshot().ready
    }

    pub fn principal(&self) -> Option<Principal> {
        self.snapshot().principal.clone()
    }

    pub fn subscribe(&self) -> Subscription<SessionChanged> {
        self.bus.subscribe()
    }

    /// Resolve a stored token into the active session.
    ///
    /// Any failure wipes the stored session and leaves the client signed out;
    /// either way the store is ready afterwards.
    pub async fn initialize(&self) {
        let Some(token) = self.storage.load() else {
            self.replace(
                SessionSnapshot {
                    ready: true,
                    ..SessionSnapshot::default()
                },
                SessionChangeKind::Cleared,
            );
            return;
        };

        match self.gateway.current_principal(&token).await {
            Ok(principal) => {
                tracing::info!(principal = %principal.id, "session restored");
                self.replace(
                    SessionSnapshot {
                        ready: true,
                        token: Some(token),
                        principal: Some(principal),
                        selected_tenant: None,
                        return_to: None,
                    },
                    SessionChangeKind::Restored,
                );
            }
            Err(e) => {
                tracing::warn!(error = %e, "stored session could not be resolved; clearing");
                self.storage.clear();
                self.replace(
                    SessionSnapshot {
                        ready: true,
                        ..SessionSnapshot::default()
                    },
                    SessionChangeKind::Cleared,
                );
            }
        }
    }

    pub async fn login(&self, request: LoginRequest) -> Result<LoginOutcome, SessionError> {
        if request.email.trim().is_empty() || request.password.is_empty() {
            return Err(SessionError::Validation("email and password are required".into()));
        }

        let grant = self.gateway.login(&request).await?;

        if grant.principal.must_change_password {
            // Stop here: the canonical profile is only fetched after rotation.
            tracing::info!(principal = %grant.principal.id, "login requires password change");
            let principal = grant.principal.clone();
            self.install(grant, SessionChangeKind::LoggedIn);
            return Ok(LoginOutcome::PasswordChangeRequired(principal));
        }

        let principal = self.gateway.current_principal(&grant.token).await?;
        tracing::info!(principal = %principal.id, role = %principal.role, "logged in");
        self.install(
            AuthGrant {
                token: grant.token,
                principal: principal.clone(),
            },
            SessionChangeKind::LoggedIn,
        );
        Ok(LoginOutcome::Authenticated(principal))
    }

    /// Adopt a token produced by an external identity provider's handshake.
    pub async fn complete_external_login(&self, token: &str) -> Result<LoginOutcome, SessionError> {
        let principal = self.gateway.current_principal(token).await?;
        let outcome = if principal.must_change_password {
            LoginOutcome::PasswordChangeRequired(principal.clone())
        } else {
            LoginOutcome::Authenticated(principal.clone())
        };
        self.install(
            AuthGrant {
                token: token.to_string(),
                principal,
            },
            SessionChangeKind::LoggedIn,
        );
        Ok(outcome)
    }

    /// Mandatory first-login credential rotation.
    pub async fn change_password_first(&self, new_password: &str) -> Result<Principal, SessionError> {
        let snapshot = self.snapshot();
        let (Some(token), Some(_)) = (snapshot.token.as_deref(), snapshot.principal.as_ref()) else {
            return Err(SessionError::NotAuthenticated);
        };

        self.policy.validate(new_password)?;

        let mut grant = self.gateway.change_password_first(token, new_password).await?;
        grant.principal.must_change_password = false;
        let principal = grant.principal.clone();

        tracing::info!(principal = %principal.id, "first-login password rotated");
        self.install(grant, SessionChangeKind::PasswordRotated);
        Ok(principal)
    }

    pub async fn accept_invite(&self, invite_token: &str, new_password: &str) -> Result<Principal, SessionError> {
        if invite_token.trim().is_empty() {
            return Err(SessionError::Validation("invite token is required".into()));
        }
        self.policy.validate(new_password)?;

        let grant = self.gateway.accept_invite(invite_token, new_password).await?;
        let principal = grant.principal.clone();

        tracing::info!(principal = %principal.id, "invite accepted");
        self.install(grant, SessionChangeKind::InviteAccepted);
        Ok(principal)
    }

    pub fn logout(&self) {
        self.storage.clear();
        self.replace(
            SessionSnapshot {
                ready: true,
                ..SessionSnapshot::default()
            },
            SessionChangeKind::LoggedOut,
        );
        tracing::info!("logged out");
    }

    /// Switch the active tenant after checking the principal may enter it.
    ///
    /// The directory is consulted without holding the session; if the
    /// identity changed in the meantime the selection is abandoned.
    pub fn select_tenant<D: TenantDirectory + ?Sized>(
        &self,
        tenant_id: TenantId,
        directory: &D,
    ) -> Result<(), SessionError> {
        let checked = self.snapshot();
        authorize_tenant(checked.principal.as_ref(), tenant_id, directory)?;

        let next = {
            let mut slot = self.write_slot();
            if !same_identity(&slot, &checked) {
                tracing::warn!(tenant = %tenant_id, "session changed during tenant selection; selection dropped");
                return Err(SessionError::NotAuthenticated);
            }
            let next = Arc::new(SessionSnapshot {
                selected_tenant: Some(tenant_id),
                ..(**slot).clone()
            });
            *slot = Arc::clone(&next);
            next
        };
        self.publish(&next, SessionChangeKind::TenantSelected);
        Ok(())
    }

    /// Evaluate route entry against the current session, remembering where
    /// the user was headed when sent to login or to the password reset.
    pub fn navigate(&self, route: &RouteRequirement, requested_path: &str) -> Navigation {
        let mut slot = self.write_slot();
        let navigation = self.guard.evaluate(slot.principal.as_ref(), route, requested_path);

        if let Navigation::RedirectToLogin { return_to: Some(to) }
        | Navigation::RedirectToPasswordReset { return_to: Some(to) } = &navigation
        {
            let next = SessionSnapshot {
                return_to: Some(to.clone()),
                ..(**slot).clone()
            };
            *slot = Arc::new(next);
        }

        navigation
    }

    /// Pop the remembered destination once the user may resume.
    pub fn take_return_to(&self) -> Option<String> {
        let mut slot = self.write_slot();
        if slot.requires_password_change() {
            return None;
        }
        let to = slot.return_to.clone()?;
        let next = SessionSnapshot {
            return_to: None,
            ..(**slot).clone()
        };
        *slot = Arc::new(next);
        Some(to)
    }

    /// Identity change: new token + principal, tenant selection dropped.
    fn install(&self, grant: AuthGrant, kind: SessionChangeKind) {
        self.storage.store(&grant.token);
        let next = {
            let mut slot = self.write_slot();
            let next = Arc::new(SessionSnapshot {
                ready: true,
                token: Some(grant.token),
                principal: Some(grant.principal),
                selected_tenant: None,
                return_to: slot.return_to.clone(),
            });
            *slot = Arc::clone(&next);
            next
        };
        self.publish(&next, kind);
    }

    fn replace(&self, next: SessionSnapshot, kind: SessionChangeKind) {
        let next = Arc::new(next);
        *self.write_slot() = Arc::clone(&next);
        self.publish(&next, kind);
    }

    fn write_slot(&self) -> RwLockWriteGuard<'_, Arc<SessionSnapshot>> {
        match self.state.write() {
            Ok(slot) => slot,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn publish(&self, snapshot: &SessionSnapshot, kind: SessionChangeKind) {
        let event = SessionChanged {
            kind,
            principal_id: snapshot.principal.as_ref().map(|p| p.id),
            selected_tenant: snapshot.selected_tenant,
            occurred_at: Utc::now(),
        };
        if let Err(e) = self.bus.publish(event) {
            tracing::warn!(error = ?e, "session change notification dropped");
        }
    }
}

fn same_identity(live: &SessionSnapshot, checked: &SessionSnapshot) -> bool {
    live.token == checked.token && live.principal == checked.principal
}
