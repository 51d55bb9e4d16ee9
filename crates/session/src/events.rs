use chrono::{DateTime, Utc};

use bizdesk_core::{TenantId, UserId};
use bizdesk_events::Event;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionChangeKind {
    /// Stored token resolved on startup.
    Restored,
    /// Stored token was unusable and has been discarded.
    Cleared,
    LoggedIn,
    PasswordRotated,
    InviteAccepted,
    LoggedOut,
    TenantSelected,
}

/// Broadcast after every session write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionChanged {
    pub kind: SessionChangeKind,
    pub principal_id: Option<UserId>,
    pub selected_tenant: Option<TenantId>,
    pub occurred_at: DateTime<Utc>,
}

impl Event for SessionChanged {
    fn event_type(&self) -> &'static str {
        match self.kind {
            SessionChangeKind::Restored => "session.restored",
            SessionChangeKind::Cleared => "session.cleared",
            SessionChangeKind::LoggedIn => "session.logged_in",
            SessionChangeKind::PasswordRotated => "session.password_rotated",
            SessionChangeKind::InviteAccepted => "session.invite_accepted",
            SessionChangeKind::LoggedOut => "session.logged_out",
            SessionChangeKind::TenantSelected => "session.tenant_selected",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }
}
