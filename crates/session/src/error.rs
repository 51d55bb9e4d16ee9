use chrono::{DateTime, Utc};
use thiserror::Error;

use bizdesk_auth::{AuthzError, PasswordError};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("not authenticated")]
    NotAuthenticated,

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("account is locked until {until}")]
    AccountLocked { until: DateTime<Utc> },

    #[error("validation failed: {0}")]
    Validation(String),

    #[error(transparent)]
    Authz(#[from] AuthzError),

    /// Lower-layer failure; carries the collaborator's message when it had one.
    #[error("request failed: {0}")]
    Transport(String),
}

impl SessionError {
    pub fn transport(msg: impl Into<String>) -> Self {
        let msg = msg.into();
        if msg.trim().is_empty() {
            Self::Transport("unexpected failure".to_string())
        } else {
            Self::Transport(msg)
        }
    }
}

impl From<PasswordError> for SessionError {
    fn from(err: PasswordError) -> Self {
        match err {
            PasswordError::Crypto(msg) => SessionError::transport(msg),
            other => SessionError::Validation(other.to_string()),
        }
    }
}
