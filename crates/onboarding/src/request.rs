//! Registration request aggregate.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use bizdesk_core::{Aggregate, AggregateRoot, DomainError, RegistrationRequestId, TenantId, UserId};
use bizdesk_events::Event;

// ─────────────────────────────────────────────────────────────────────────────
// Status
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl RegistrationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RegistrationStatus::Pending => "pending",
            RegistrationStatus::Approved => "approved",
            RegistrationStatus::Rejected => "rejected",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, RegistrationStatus::Pending)
    }
}

impl core::str::FromStr for RegistrationStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Ok(RegistrationStatus::Pending),
            "approved" => Ok(RegistrationStatus::Approved),
            "rejected" => Ok(RegistrationStatus::Rejected),
            other => Err(DomainError::validation(format!(
                "status must be one of: pending, approved, rejected (got '{other}')"
            ))),
        }
    }
}

impl core::fmt::Display for RegistrationStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Submission payload
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnerInfo {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyInfo {
    pub name: String,
    pub category: String,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub tax_id: Option<String>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Aggregate
// ─────────────────────────────────────────────────────────────────────────────

/// Signup request awaiting a platform admin's decision.
///
/// # Invariants
/// - `pending` is the only state that accepts a decision.
/// - A rejected request always carries a non-blank reason.
/// - An approved request records the tenant provisioned for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationRequest {
    pub id: RegistrationRequestId,
    pub owner: OwnerInfo,
    pub company: CompanyInfo,
    pub status: RegistrationStatus,
    pub rejection_reason: Option<String>,
    pub decided_by: Option<UserId>,
    pub provisioned_tenant: Option<TenantId>,
    pub provisioned_owner: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub version: u64,
    pub submitted: bool,
}

impl RegistrationRequest {
    pub fn empty(id: RegistrationRequestId) -> Self {
        let epoch = DateTime::<Utc>::default();
        Self {
            id,
            owner: OwnerInfo::default(),
            company: CompanyInfo::default(),
            status: RegistrationStatus::Pending,
            rejection_reason: None,
            decided_by: None,
            provisioned_tenant: None,
            provisioned_owner: None,
            created_at: epoch,
            updated_at: epoch,
            version: 0,
            submitted: false,
        }
    }

    /// Fails with a conflict unless the request can still be decided.
    pub fn ensure_pending(&self) -> Result<(), DomainError> {
        if !self.submitted {
            return Err(DomainError::not_found(format!("registration request {}", self.id)));
        }
        if self.status.is_terminal() {
            return Err(DomainError::conflict(format!(
                "registration request {} is already {}",
                self.id, self.status
            )));
        }
        Ok(())
    }
}

impl AggregateRoot for RegistrationRequest {
    type Id = RegistrationRequestId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Commands
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitRegistration {
    pub owner: OwnerInfo,
    pub company: CompanyInfo,
    pub occurred_at: DateTime<Utc>,
}

/// Carries the provisioning outcome so the approval records it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApproveRegistration {
    pub decided_by: UserId,
    pub tenant_id: TenantId,
    pub owner_id: UserId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RejectRegistration {
    pub decided_by: UserId,
    pub reason: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum RegistrationCommand {
    Submit(SubmitRegistration),
    Approve(ApproveRegistration),
    Reject(RejectRegistration),
}

// ─────────────────────────────────────────────────────────────────────────────
// Events
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RegistrationEvent {
    Submitted {
        owner: OwnerInfo,
        company: CompanyInfo,
        occurred_at: DateTime<Utc>,
    },
    Approved {
        decided_by: UserId,
        tenant_id: TenantId,
        owner_id: UserId,
        occurred_at: DateTime<Utc>,
    },
    Rejected {
        decided_by: UserId,
        reason: String,
        occurred_at: DateTime<Utc>,
    },
}

impl Event for RegistrationEvent {
    fn event_type(&self) -> &'static str {
        match self {
            RegistrationEvent::Submitted { .. } => "onboarding.request.submitted",
            RegistrationEvent::Approved { .. } => "onboarding.request.approved",
            RegistrationEvent::Rejected { .. } => "onboarding.request.rejected",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            RegistrationEvent::Submitted { occurred_at, .. }
            | RegistrationEvent::Approved { occurred_at, .. }
            | RegistrationEvent::Rejected { occurred_at, .. } => *occurred_at,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Aggregate Implementation
// ─────────────────────────────────────────────────────────────────────────────

impl Aggregate for RegistrationRequest {
    type Command = RegistrationCommand;
    type Event = RegistrationEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            RegistrationEvent::Submitted {
                owner,
                company,
                occurred_at,
            } => {
                self.owner = owner.clone();
                self.company = company.clone();
                self.status = RegistrationStatus::Pending;
                self.created_at = *occurred_at;
                self.updated_at = *occurred_at;
                self.submitted = true;
            }
            RegistrationEvent::Approved {
                decided_by,
                tenant_id,
                owner_id,
                occurred_at,
            } => {
                self.status = RegistrationStatus::Approved;
                self.decided_by = Some(*decided_by);
                self.provisioned_tenant = Some(*tenant_id);
                self.provisioned_owner = Some(*owner_id);
                self.updated_at = *occurred_at;
            }
            RegistrationEvent::Rejected {
                decided_by,
                reason,
                occurred_at,
            } => {
                self.status = RegistrationStatus::Rejected;
                self.decided_by = Some(*decided_by);
                self.rejection_reason = Some(reason.clone());
                self.updated_at = *occurred_at;
            }
        }
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            RegistrationCommand::Submit(cmd) => self.handle_submit(cmd),
            RegistrationCommand::Approve(cmd) => self.handle_approve(cmd),
            RegistrationCommand::Reject(cmd) => self.handle_reject(cmd),
        }
    }
}

impl RegistrationRequest {
    fn handle_submit(&self, cmd: &SubmitRegistration) -> Result<Vec<RegistrationEvent>, DomainError> {
        if self.submitted {
            return Err(DomainError::conflict("registration request already submitted"));
        }

        let owner_name = required("owner name", &cmd.owner.name)?;
        let owner_email = required("owner email", &cmd.owner.email)?.to_lowercase();
        if !owner_email.contains('@') {
            return Err(DomainError::validation("owner email is not a valid address"));
        }
        let company_name = required("company name", &cmd.company.name)?;
        let company_category = required("company category", &cmd.company.category)?;

        Ok(vec![RegistrationEvent::Submitted {
            owner: OwnerInfo {
                name: owner_name,
                email: owner_email,
                phone: optional(&cmd.owner.phone),
            },
            company: CompanyInfo {
                name: company_name,
                category: company_category,
                address: optional(&cmd.company.address),
                tax_id: optional(&cmd.company.tax_id),
            },
            occurred_at: cmd.occurred_at,
        }])
    }

    fn handle_approve(&self, cmd: &ApproveRegistration) -> Result<Vec<RegistrationEvent>, DomainError> {
        self.ensure_pending()?;

        Ok(vec![RegistrationEvent::Approved {
            decided_by: cmd.decided_by,
            tenant_id: cmd.tenant_id,
            owner_id: cmd.owner_id,
            occurred_at: cmd.occurred_at,
        }])
    }

    fn handle_reject(&self, cmd: &RejectRegistration) -> Result<Vec<RegistrationEvent>, DomainError> {
        self.ensure_pending()?;
        let reason = required("rejection reason", &cmd.reason)?;

        Ok(vec![RegistrationEvent::Rejected {
            decided_by: cmd.decided_by,
            reason,
            occurred_at: cmd.occurred_at,
        }])
    }
}

fn required(field: &str, value: &str) -> Result<String, DomainError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(DomainError::validation(format!("{field} is required")));
    }
    Ok(trimmed.to_string())
}

fn optional(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
