//! Registration request orchestration: validation, admin gate, provisioning,
//! persistence and owner notification.

use chrono::Utc;
use serde::Serialize;

use bizdesk_auth::{AuthzError, Principal, Role};
use bizdesk_core::{Aggregate, ExpectedVersion, RegistrationRequestId, TenantId, UserId};

use crate::{
    ApproveRegistration, CompanyInfo, FlushReport, Notification, Notifier, OnboardingError, Outbox, OutboxMessage,
    OwnerInfo, ProvisioningRequest, RegistrationCommand, RegistrationRequest, RegistrationRequestRepository,
    RegistrationStatus, RejectRegistration, SubmitRegistration, TenantProvisioner,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApprovalReceipt {
    pub request: RegistrationRequest,
    pub tenant_id: TenantId,
    pub owner_id: UserId,
    /// False when the owner email is still waiting in the outbox.
    pub notification_delivered: bool,
}

pub struct OnboardingService<R, P, O, N> {
    requests: R,
    provisioner: P,
    outbox: O,
    notifier: N,
}

impl<R, P, O, N> OnboardingService<R, P, O, N>
where
    R: RegistrationRequestRepository,
    P: TenantProvisioner,
    O: Outbox,
    N: Notifier,
{
    pub fn new(requests: R, provisioner: P, outbox: O, notifier: N) -> Self {
        Self {
            requests,
            provisioner,
            outbox,
            notifier,
        }
    }

    /// Anonymous signup submission.
    pub fn submit(&self, owner: OwnerInfo, company: CompanyInfo) -> Result<RegistrationRequest, OnboardingError> {
        let mut request = RegistrationRequest::empty(RegistrationRequestId::new());
        let command = RegistrationCommand::Submit(SubmitRegistration {
            owner,
            company,
            occurred_at: Utc::now(),
        });
        for event in request.handle(&command)? {
            request.apply(&event);
        }

        self.requests.insert(request.clone())?;
        tracing::info!(request = %request.id, company = %request.company.name, "registration request submitted");
        Ok(request)
    }

    pub fn list(
        &self,
        actor: Option<&Principal>,
        status: RegistrationStatus,
    ) -> Result<Vec<RegistrationRequest>, OnboardingError> {
        require_platform_admin(actor)?;
        self.requests.list(status)
    }

    pub fn get(&self, actor: Option<&Principal>, id: RegistrationRequestId) -> Result<RegistrationRequest, OnboardingError> {
        require_platform_admin(actor)?;
        self.load(id)
    }

    /// Approve a pending request.
    ///
    /// Order: check pending → provision (idempotent) → persist `approved`
    /// guarded by the loaded version → enqueue + try to deliver the owner
    /// email. A failure before persisting leaves the request pending and safe
    /// to retry; a failed delivery stays in the outbox.
    pub fn approve(&self, actor: Option<&Principal>, id: RegistrationRequestId) -> Result<ApprovalReceipt, OnboardingError> {
        let admin = require_platform_admin(actor)?;
        let mut request = self.load(id)?;
        request.ensure_pending()?;
        let loaded_version = request.version;

        let account = self.provisioner.provision(&ProvisioningRequest::from(&request))?;

        let command = RegistrationCommand::Approve(ApproveRegistration {
            decided_by: admin.id,
            tenant_id: account.tenant_id,
            owner_id: account.owner_id,
            occurred_at: Utc::now(),
        });
        for event in request.handle(&command)? {
            request.apply(&event);
        }
        self.requests.save(request.clone(), ExpectedVersion::Exact(loaded_version))?;

        tracing::info!(
            request = %request.id,
            tenant = %account.tenant_id,
            admin = %admin.id,
            "registration request approved"
        );

        let message = self.outbox.enqueue(Notification::RegistrationApproved {
            to: request.owner.email.clone(),
            owner_name: request.owner.name.clone(),
            company_name: request.company.name.clone(),
            login_email: account.login_email.clone(),
            temporary_password: account.temporary_password.clone(),
        });
        let notification_delivered = self.deliver(&message);

        Ok(ApprovalReceipt {
            request,
            tenant_id: account.tenant_id,
            owner_id: account.owner_id,
            notification_delivered,
        })
    }

    /// Reject a pending request; `reason` is mandatory.
    pub fn reject(
        &self,
        actor: Option<&Principal>,
        id: RegistrationRequestId,
        reason: &str,
    ) -> Result<RegistrationRequest, OnboardingError> {
        let admin = require_platform_admin(actor)?;
        let mut request = self.load(id)?;
        let loaded_version = request.version;

        let command = RegistrationCommand::Reject(RejectRegistration {
            decided_by: admin.id,
            reason: reason.to_string(),
            occurred_at: Utc::now(),
        });
        for event in request.handle(&command)? {
            request.apply(&event);
        }
        self.requests.save(request.clone(), ExpectedVersion::Exact(loaded_version))?;

        tracing::info!(request = %request.id, admin = %admin.id, "registration request rejected");

        let message = self.outbox.enqueue(Notification::RegistrationRejected {
            to: request.owner.email.clone(),
            owner_name: request.owner.name.clone(),
            company_name: request.company.name.clone(),
            reason: request.rejection_reason.clone().unwrap_or_default(),
        });
        self.deliver(&message);

        Ok(request)
    }

    /// Retry every undelivered notification.
    pub fn flush_outbox(&self) -> FlushReport {
        let mut report = FlushReport::default();
        for message in self.outbox.pending() {
            if self.deliver(&message) {
                report.sent += 1;
            } else {
                report.failed += 1;
            }
        }
        report
    }

    fn deliver(&self, message: &OutboxMessage) -> bool {
        match self.notifier.send(&message.notification) {
            Ok(()) => {
                self.outbox.mark_sent(message.id);
                true
            }
            Err(e) => {
                tracing::warn!(
                    message = %message.id,
                    kind = message.notification.kind(),
                    error = %e,
                    "notification dispatch failed; kept in outbox"
                );
                self.outbox.mark_failed(message.id, &e.to_string());
                false
            }
        }
    }

    fn load(&self, id: RegistrationRequestId) -> Result<RegistrationRequest, OnboardingError> {
        self.requests
            .get(id)?
            .ok_or_else(|| bizdesk_core::DomainError::not_found(format!("registration request {id}")).into())
    }
}

fn require_platform_admin(actor: Option<&Principal>) -> Result<&Principal, OnboardingError> {
    let actor = actor.ok_or(AuthzError::NotAuthenticated)?;
    if actor.must_change_password {
        return Err(AuthzError::PasswordChangeRequired.into());
    }
    if actor.role != Role::PlatformAdmin {
        tracing::warn!(principal = %actor.id, role = %actor.role, "non-admin attempted registration review");
        return Err(AuthzError::RoleNotAllowed { role: actor.role }.into());
    }
    Ok(actor)
}
