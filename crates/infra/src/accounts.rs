//! In-memory account + tenant directory.
//!
//! Owns credentials (Argon2 hashes), failed-login counters, tenants and their
//! owners, pending team invites, and the provisioning ledger keyed by
//! registration request.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use bizdesk_auth::password::{generate_temporary_password, hash_password, verify_password};
use bizdesk_auth::permissions::known;
use bizdesk_auth::{
    AuthConfig, AuthzError, ExternalIdentity, PasswordError, PasswordPolicy, Permission, PermissionSet, Principal,
    Role, TenantDirectory, authorize,
};
use bizdesk_core::{DomainError, RegistrationRequestId, TenantId, UserId};
use bizdesk_onboarding::{OnboardingError, ProvisionedAccount, ProvisioningRequest, TenantProvisioner};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DirectoryError {
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("account is locked until {until}")]
    AccountLocked { until: DateTime<Utc> },

    #[error("bot challenge required")]
    BotChallengeRequired,

    #[error("email '{0}' is already registered")]
    EmailTaken(String),

    #[error("'{0}' is not a valid email")]
    InvalidEmail(String),

    #[error("invalid or already used invite")]
    InvalidInvite,

    #[error("role '{0}' cannot be invited")]
    RoleNotInvitable(Role),

    #[error("no pending password change")]
    NoPendingRotation,

    #[error("unknown account")]
    UnknownAccount,

    #[error(transparent)]
    Password(#[from] PasswordError),

    #[error(transparent)]
    Authz(#[from] AuthzError),

    #[error("directory lock poisoned")]
    Poisoned,
}

#[derive(Debug, Clone)]
struct Account {
    principal: Principal,
    password_hash: String,
    /// Hash of the one-time credential, kept until the first rotation.
    temporary_hash: Option<String>,
    /// One-time credential issued at provisioning; replays hand back the same
    /// value until the owner rotates.
    issued_temporary: Option<String>,
    failed_attempts: u32,
    external_links: Vec<(String, String)>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Tenant {
    pub id: TenantId,
    pub name: String,
    pub category: String,
    pub owner_id: UserId,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
struct PendingInvite {
    user_id: UserId,
    invited_by: UserId,
}

/// Result of inviting a team member. `token` is single-use.
#[derive(Clone)]
pub struct Invitation {
    pub token: String,
    pub member: Principal,
    pub temporary_password: String,
}

impl core::fmt::Debug for Invitation {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Invitation")
            .field("member", &self.member.id)
            .field("email", &self.member.email)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Default)]
struct DirectoryState {
    accounts: HashMap<UserId, Account>,
    by_email: HashMap<String, UserId>,
    tenants: HashMap<TenantId, Tenant>,
    provisioned: HashMap<RegistrationRequestId, (TenantId, UserId)>,
    invites: HashMap<String, PendingInvite>,
}

impl DirectoryState {
    fn account_by_email(&mut self, email: &str) -> Option<&mut Account> {
        let id = self.by_email.get(email)?;
        self.accounts.get_mut(id)
    }

    fn insert_account(&mut self, account: Account) -> Result<(), DirectoryError> {
        let email = account.principal.email.clone();
        if self.by_email.contains_key(&email) {
            return Err(DirectoryError::EmailTaken(email));
        }
        self.by_email.insert(email, account.principal.id);
        self.accounts.insert(account.principal.id, account);
        Ok(())
    }
}

/// Thread-safe directory for tests/dev and the single-node server.
#[derive(Debug)]
pub struct AccountDirectory {
    state: RwLock<DirectoryState>,
    policy: PasswordPolicy,
    max_failed_attempts: u32,
    lockout: Duration,
    require_bot_challenge: bool,
}

impl Default for AccountDirectory {
    fn default() -> Self {
        Self::new(&AuthConfig::default())
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

impl AccountDirectory {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            state: RwLock::new(DirectoryState::default()),
            policy: PasswordPolicy::new(config.min_password_length),
            max_failed_attempts: config.max_failed_login_attempts.max(1),
            lockout: Duration::seconds(i64::try_from(config.lockout_duration_secs).unwrap_or(i64::MAX).min(86_400 * 365)),
            require_bot_challenge: config.require_bot_challenge,
        }
    }

    pub fn password_policy(&self) -> PasswordPolicy {
        self.policy
    }

    /// Register the operator account. Platform admins are never provisioned
    /// through registration requests.
    pub fn seed_platform_admin(&self, email: &str, display_name: &str, password: &str) -> Result<Principal, DirectoryError> {
        self.policy.validate(password)?;
        let principal = Principal::new(UserId::new(), normalize_email(email), display_name.trim(), Role::PlatformAdmin);
        let account = Account {
            principal: principal.clone(),
            password_hash: hash_password(password)?,
            temporary_hash: None,
            issued_temporary: None,
            failed_attempts: 0,
            external_links: Vec::new(),
        };

        self.state.write().map_err(|_| DirectoryError::Poisoned)?.insert_account(account)?;
        tracing::info!(user = %principal.id, "platform admin seeded");
        Ok(principal)
    }

    pub fn principal(&self, id: UserId) -> Result<Principal, DirectoryError> {
        let state = self.state.read().map_err(|_| DirectoryError::Poisoned)?;
        state
            .accounts
            .get(&id)
            .map(|a| a.principal.clone())
            .ok_or(DirectoryError::UnknownAccount)
    }

    pub fn tenant(&self, id: TenantId) -> Option<Tenant> {
        self.state.read().ok()?.tenants.get(&id).cloned()
    }

    /// Validate email/password, counting failures toward the lockout.
    pub fn verify_credentials(
        &self,
        email: &str,
        password: &str,
        bot_challenge: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Principal, DirectoryError> {
        if self.require_bot_challenge && bot_challenge.is_none_or(|t| t.trim().is_empty()) {
            return Err(DirectoryError::BotChallengeRequired);
        }

        let email = normalize_email(email);
        let mut state = self.state.write().map_err(|_| DirectoryError::Poisoned)?;
        let account = state.account_by_email(&email).ok_or(DirectoryError::InvalidCredentials)?;

        if let Some(until) = account.principal.locked_until {
            if until > now {
                return Err(DirectoryError::AccountLocked { until });
            }
            account.principal.locked_until = None;
        }

        if verify_password(password, &account.password_hash)? {
            account.failed_attempts = 0;
            return Ok(account.principal.clone());
        }

        account.failed_attempts += 1;
        if account.failed_attempts >= self.max_failed_attempts {
            let until = now + self.lockout;
            account.failed_attempts = 0;
            account.principal.locked_until = Some(until);
            tracing::warn!(user = %account.principal.id, %until, "account locked after repeated failures");
            return Err(DirectoryError::AccountLocked { until });
        }
        Err(DirectoryError::InvalidCredentials)
    }

    /// First-login rotation. The new password must differ from the
    /// temporary one.
    pub fn change_password_first(&self, user_id: UserId, new_password: &str) -> Result<Principal, DirectoryError> {
        self.policy.validate(new_password)?;

        let mut state = self.state.write().map_err(|_| DirectoryError::Poisoned)?;
        let account = state.accounts.get_mut(&user_id).ok_or(DirectoryError::UnknownAccount)?;
        if !account.principal.must_change_password {
            return Err(DirectoryError::NoPendingRotation);
        }
        if let Some(temporary) = &account.temporary_hash {
            if verify_password(new_password, temporary)? {
                return Err(PasswordError::Unchanged.into());
            }
        }

        account.password_hash = hash_password(new_password)?;
        account.temporary_hash = None;
        account.issued_temporary = None;
        account.principal.must_change_password = false;
        tracing::info!(user = %user_id, "temporary password rotated");
        Ok(account.principal.clone())
    }

    /// Create a flagged member account in the inviter's tenant.
    pub fn invite_member(
        &self,
        inviter: &Principal,
        email: &str,
        display_name: &str,
        role: Role,
        permissions: &[String],
    ) -> Result<Invitation, DirectoryError> {
        if inviter.must_change_password {
            return Err(AuthzError::PasswordChangeRequired.into());
        }
        authorize(Some(inviter), &[known::TEAM_INVITE])?;
        let tenant_id = inviter.business_id.ok_or(AuthzError::TenantMismatch)?;
        if !role.is_invitable() {
            return Err(DirectoryError::RoleNotInvitable(role));
        }
        let email = normalize_email(email);
        if !email.contains('@') {
            return Err(DirectoryError::InvalidEmail(email));
        }

        let granted = PermissionSet::from_raw(permissions);
        if !inviter.role.bypasses_permission_checks() {
            let beyond: Vec<String> = granted
                .iter()
                .filter(|p| p.is_wildcard() || !(inviter.permissions.has_wildcard() || inviter.permissions.contains(p)))
                .map(Permission::to_string)
                .collect();
            if !beyond.is_empty() {
                tracing::warn!(inviter = %inviter.id, ?beyond, "invite grants permissions the inviter lacks");
                return Err(AuthzError::Forbidden { missing: beyond }.into());
            }
        }

        let temporary_password = generate_temporary_password();
        let temporary_hash = hash_password(&temporary_password)?;
        let member = Principal::new(UserId::new(), email, display_name.trim(), role)
            .with_permissions(granted.iter().map(Permission::as_str))
            .with_business(tenant_id)
            .requiring_password_change();

        let token = Uuid::new_v4().simple().to_string();
        let mut state = self.state.write().map_err(|_| DirectoryError::Poisoned)?;
        state.insert_account(Account {
            principal: member.clone(),
            password_hash: temporary_hash.clone(),
            temporary_hash: Some(temporary_hash),
            issued_temporary: None,
            failed_attempts: 0,
            external_links: Vec::new(),
        })?;
        state.invites.insert(
            token.clone(),
            PendingInvite {
                user_id: member.id,
                invited_by: inviter.id,
            },
        );

        tracing::info!(member = %member.id, tenant = %tenant_id, role = %role, "team member invited");
        Ok(Invitation {
            token,
            member,
            temporary_password,
        })
    }

    /// Consume an invite token and set the member's own password.
    pub fn accept_invite(&self, invite_token: &str, new_password: &str) -> Result<Principal, DirectoryError> {
        self.policy.validate(new_password)?;

        let mut state = self.state.write().map_err(|_| DirectoryError::Poisoned)?;
        let invite = state.invites.get(invite_token.trim()).cloned().ok_or(DirectoryError::InvalidInvite)?;
        let account = state.accounts.get_mut(&invite.user_id).ok_or(DirectoryError::InvalidInvite)?;

        account.password_hash = hash_password(new_password)?;
        account.temporary_hash = None;
        account.principal.must_change_password = false;
        let principal = account.principal.clone();
        state.invites.remove(invite_token.trim());

        tracing::info!(member = %principal.id, invited_by = %invite.invited_by, "invite accepted");
        Ok(principal)
    }

    /// Map a completed external handshake onto an existing account.
    ///
    /// Accounts only come from approved registrations or invites, so an
    /// unknown email is rejected.
    pub fn sign_in_external(&self, identity: &ExternalIdentity, now: DateTime<Utc>) -> Result<Principal, DirectoryError> {
        let email = normalize_email(&identity.email);
        let mut state = self.state.write().map_err(|_| DirectoryError::Poisoned)?;
        let account = state.account_by_email(&email).ok_or(DirectoryError::InvalidCredentials)?;

        if let Some(until) = account.principal.locked_until.filter(|until| *until > now) {
            tracing::warn!(user = %account.principal.id, %until, "external sign-in refused for locked account");
            return Err(DirectoryError::AccountLocked { until });
        }

        let link = (identity.provider.to_lowercase(), identity.provider_id.clone());
        if !account.external_links.contains(&link) {
            account.external_links.push(link);
        }
        Ok(account.principal.clone())
    }

    fn provision_inner(&self, request: &ProvisioningRequest) -> Result<ProvisionedAccount, DirectoryError> {
        let email = normalize_email(&request.owner_email);

        if let Some(replayed) = self.replay_provisioning(request.registration_id)? {
            return Ok(replayed);
        }

        let temporary_password = generate_temporary_password();
        let temporary_hash = hash_password(&temporary_password)?;
        let mut state = self.state.write().map_err(|_| DirectoryError::Poisoned)?;

        // Another approval may have provisioned while the hash was computed.
        if state.provisioned.contains_key(&request.registration_id) {
            drop(state);
            return self
                .replay_provisioning(request.registration_id)?
                .ok_or(DirectoryError::UnknownAccount);
        }

        let tenant_id = TenantId::new();
        let owner = Principal::new(UserId::new(), email.clone(), request.owner_name.trim(), Role::BusinessOwner)
            .with_business(tenant_id)
            .requiring_password_change();
        let owner_id = owner.id;

        state.insert_account(Account {
            principal: owner,
            password_hash: temporary_hash.clone(),
            temporary_hash: Some(temporary_hash),
            issued_temporary: Some(temporary_password.clone()),
            failed_attempts: 0,
            external_links: Vec::new(),
        })?;
        state.tenants.insert(
            tenant_id,
            Tenant {
                id: tenant_id,
                name: request.company_name.trim().to_string(),
                category: request.company_category.trim().to_string(),
                owner_id,
                created_at: Utc::now(),
            },
        );
        state.provisioned.insert(request.registration_id, (tenant_id, owner_id));

        tracing::info!(tenant = %tenant_id, owner = %owner_id, "tenant provisioned");
        Ok(ProvisionedAccount {
            tenant_id,
            owner_id,
            login_email: email,
            temporary_password,
        })
    }
}

impl AccountDirectory {
    /// Hand back the credential issued for an already provisioned request.
    fn replay_provisioning(
        &self,
        registration_id: RegistrationRequestId,
    ) -> Result<Option<ProvisionedAccount>, DirectoryError> {
        let state = self.state.read().map_err(|_| DirectoryError::Poisoned)?;
        let Some((tenant_id, owner_id)) = state.provisioned.get(&registration_id).copied() else {
            return Ok(None);
        };
        let account = state.accounts.get(&owner_id).ok_or(DirectoryError::UnknownAccount)?;
        let temporary_password = match (&account.issued_temporary, account.principal.must_change_password) {
            (Some(issued), true) => issued.clone(),
            _ => return Err(DirectoryError::NoPendingRotation),
        };

        tracing::info!(tenant = %tenant_id, "provisioning replayed; issued credential returned");
        Ok(Some(ProvisionedAccount {
            tenant_id,
            owner_id,
            login_email: account.principal.email.clone(),
            temporary_password,
        }))
    }
}

impl TenantProvisioner for AccountDirectory {
    fn provision(&self, request: &ProvisioningRequest) -> Result<ProvisionedAccount, OnboardingError> {
        self.provision_inner(request).map_err(|e| match e {
            DirectoryError::EmailTaken(email) => {
                DomainError::conflict(format!("email '{email}' is already registered")).into()
            }
            other => OnboardingError::Provisioning(other.to_string()),
        })
    }
}

impl TenantDirectory for AccountDirectory {
    fn tenant_exists(&self, tenant_id: TenantId) -> bool {
        self.state.read().map(|s| s.tenants.contains_key(&tenant_id)).unwrap_or(false)
    }

    fn owner_of(&self, tenant_id: TenantId) -> Option<UserId> {
        self.state.read().ok()?.tenants.get(&tenant_id).map(|t| t.owner_id)
    }
}
