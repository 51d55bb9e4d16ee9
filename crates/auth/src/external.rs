//! External identity providers (OAuth-style redirect handshakes).
//!
//! Every provider is reduced to the same output, an [`ExternalIdentity`]; the
//! handshake itself lives with the provider implementation.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalIdentity {
    pub provider: String,
    pub provider_id: String,
    pub email: String,
    pub display_name: String,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExchangeError {
    #[error("unknown identity provider '{0}'")]
    UnknownProvider(String),

    #[error("identity provider rejected the exchange: {0}")]
    Rejected(String),

    #[error("identity provider returned no email")]
    MissingEmail,

    #[error("identity provider unreachable: {0}")]
    Transport(String),
}

/// Completes a provider handshake from the callback code.
#[async_trait]
pub trait IdentityExchange: Send + Sync {
    /// Stable provider name (e.g. "google").
    fn provider(&self) -> &str;

    async fn exchange(&self, callback_code: &str) -> Result<ExternalIdentity, ExchangeError>;
}

/// Providers by name.
#[derive(Clone, Default)]
pub struct IdentityExchangeRegistry {
    providers: HashMap<String, Arc<dyn IdentityExchange>>,
}

impl IdentityExchangeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, provider: Arc<dyn IdentityExchange>) {
        self.providers.insert(provider.provider().to_lowercase(), provider);
    }

    pub fn providers(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.providers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Run the named provider's exchange and normalize the returned email.
    pub async fn exchange(&self, provider: &str, callback_code: &str) -> Result<ExternalIdentity, ExchangeError> {
        let exchanger = self
            .providers
            .get(&provider.trim().to_lowercase())
            .ok_or_else(|| ExchangeError::UnknownProvider(provider.to_string()))?;

        let mut identity = exchanger.exchange(callback_code).await?;
        identity.email = identity.email.trim().to_lowercase();
        if identity.email.is_empty() {
            return Err(ExchangeError::MissingEmail);
        }
        Ok(identity)
    }
}
