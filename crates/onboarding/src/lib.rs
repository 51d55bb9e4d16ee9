//! `bizdesk-onboarding` — signup registration requests and their resolution.
//!
//! A request starts `pending` and is resolved exactly once, by a platform
//! admin, to `approved` (tenant + owner account provisioned, owner notified)
//! or `rejected` (owner notified with the reason).

pub mod error;
pub mod notification;
pub mod provisioning;
pub mod repository;
pub mod request;
pub mod service;

pub use error::OnboardingError;
pub use notification::{FlushReport, Notification, NotifyError, Notifier, Outbox, OutboxMessage};
pub use provisioning::{ProvisionedAccount, ProvisioningRequest, TenantProvisioner};
pub use repository::RegistrationRequestRepository;
pub use request::{
    ApproveRegistration, CompanyInfo, OwnerInfo, RegistrationCommand, RegistrationEvent, RegistrationRequest,
    RegistrationStatus, RejectRegistration, SubmitRegistration,
};
pub use service::{ApprovalReceipt, OnboardingService};
