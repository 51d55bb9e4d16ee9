use std::sync::Mutex;

/// Where the client keeps its bearer token between runs.
pub trait CredentialStorage: Send + Sync {
    fn load(&self) -> Option<String>;

    fn store(&self, token: &str);

    fn clear(&self);
}

#[derive(Debug, Default)]
pub struct InMemoryCredentialStorage {
    token: Mutex<Option<String>>,
}

impl InMemoryCredentialStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: Mutex::new(Some(token.into())),
        }
    }
}

impl CredentialStorage for InMemoryCredentialStorage {
    fn load(&self) -> Option<String> {
        self.token.lock().ok().and_then(|t| t.clone())
    }

    fn store(&self, token: &str) {
        if let Ok(mut slot) = self.token.lock() {
            *slot = Some(token.to_string());
        }
    }

    fn clear(&self) {
        if let Ok(mut slot) = self.token.lock() {
            *slot = None;
        }
    }
}
