//! Owner notifications and the outbox that guarantees their delivery.
//!
//! Decisions enqueue first and dispatch second. A failed dispatch leaves the
//! message queued for [`crate::OnboardingService::flush_outbox`], so delivery
//! is at-least-once.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Notification {
    RegistrationApproved {
        to: String,
        owner_name: String,
        company_name: String,
        login_email: String,
        temporary_password: String,
    },
    RegistrationRejected {
        to: String,
        owner_name: String,
        company_name: String,
        reason: String,
    },
}

impl Notification {
    pub fn recipient(&self) -> &str {
        match self {
            Notification::RegistrationApproved { to, .. } | Notification::RegistrationRejected { to, .. } => to,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Notification::RegistrationApproved { .. } => "registration_approved",
            Notification::RegistrationRejected { .. } => "registration_rejected",
        }
    }

    pub fn subject(&self) -> String {
        match self {
            Notification::RegistrationApproved { company_name, .. } => {
                format!("{company_name} is ready: your login details")
            }
            Notification::RegistrationRejected { company_name, .. } => {
                format!("Your registration for {company_name}")
            }
        }
    }
}

// The temporary password must never reach logs.
impl core::fmt::Debug for Notification {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Notification")
            .field("kind", &self.kind())
            .field("to", &self.recipient())
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboxMessage {
    pub id: Uuid,
    pub notification: Notification,
    pub attempts: u32,
    pub last_error: Option<String>,
    pub enqueued_at: DateTime<Utc>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("notification dispatch failed: {0}")]
pub struct NotifyError(pub String);

/// Delivers a notification (email, SMS, ...).
pub trait Notifier: Send + Sync {
    fn send(&self, notification: &Notification) -> Result<(), NotifyError>;
}

impl<N: Notifier + ?Sized> Notifier for std::sync::Arc<N> {
    fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        (**self).send(notification)
    }
}

/// Durable queue of notifications awaiting delivery.
pub trait Outbox: Send + Sync {
    fn enqueue(&self, notification: Notification) -> OutboxMessage;

    /// Undelivered messages, oldest first.
    fn pending(&self) -> Vec<OutboxMessage>;

    fn mark_sent(&self, id: Uuid);

    fn mark_failed(&self, id: Uuid, error: &str);
}

impl<O: Outbox + ?Sized> Outbox for std::sync::Arc<O> {
    fn enqueue(&self, notification: Notification) -> OutboxMessage {
        (**self).enqueue(notification)
    }

    fn pending(&self) -> Vec<OutboxMessage> {
        (**self).pending()
    }

    fn mark_sent(&self, id: Uuid) {
        (**self).mark_sent(id)
    }

    fn mark_failed(&self, id: Uuid, error: &str) {
        (**self).mark_failed(id, error)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FlushReport {
    pub sent: usize,
    pub failed: usize,
}
