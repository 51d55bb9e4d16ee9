//! Outbox storage and notifier adapters.

use std::sync::{Mutex, RwLock};

use chrono::Utc;
use uuid::Uuid;

use bizdesk_onboarding::{Notification, NotifyError, Notifier, Outbox, OutboxMessage};

/// In-memory outbox. Sent messages are dropped; failed ones keep their
/// attempt count and last error.
#[derive(Debug, Default)]
pub struct InMemoryOutbox {
    pending: RwLock<Vec<OutboxMessage>>,
}

impl InMemoryOutbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.pending.read().map(|p| p.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Outbox for InMemoryOutbox {
    fn enqueue(&self, notification: Notification) -> OutboxMessage {
        let message = OutboxMessage {
            id: Uuid::now_v7(),
            notification,
            attempts: 0,
            last_error: None,
            enqueued_at: Utc::now(),
        };
        if let Ok(mut pending) = self.pending.write() {
            pending.push(message.clone());
        }
        message
    }

    fn pending(&self) -> Vec<OutboxMessage> {
        self.pending.read().map(|p| p.clone()).unwrap_or_default()
    }

    fn mark_sent(&self, id: Uuid) {
        if let Ok(mut pending) = self.pending.write() {
            pending.retain(|m| m.id != id);
        }
    }

    fn mark_failed(&self, id: Uuid, error: &str) {
        if let Ok(mut pending) = self.pending.write() {
            if let Some(message) = pending.iter_mut().find(|m| m.id == id) {
                message.attempts += 1;
                message.last_error = Some(error.to_string());
            }
        }
    }
}

/// Writes notifications to the log instead of a mail provider.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingNotifier;

impl Notifier for LoggingNotifier {
    fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        tracing::info!(
            to = notification.recipient(),
            kind = notification.kind(),
            subject = %notification.subject(),
            "notification dispatched"
        );
        Ok(())
    }
}

/// Captures delivered notifications; can be switched into a failing mode.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<Notification>>,
    failing: Mutex<bool>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        if let Ok(mut f) = self.failing.lock() {
            *f = failing;
        }
    }

    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

impl Notifier for RecordingNotifier {
    fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        if self.failing.lock().map(|f| *f).unwrap_or(false) {
            return Err(NotifyError("mail provider unavailable".to_string()));
        }
        self.sent
            .lock()
            .map_err(|_| NotifyError("recorder poisoned".to_string()))?
            .push(notification.clone());
        Ok(())
    }
}
