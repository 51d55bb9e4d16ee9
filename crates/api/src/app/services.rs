//! Service wiring: account directory, identity gateway, onboarding pipeline.

use std::sync::Arc;

use bizdesk_auth::{AuthConfig, Hs256JwtValidator, IdentityExchange, IdentityExchangeRegistry};
use bizdesk_infra::{
    AccountDirectory, DirectoryIdentityGateway, InMemoryOutbox, InMemoryRegistrationRequestStore, LoggingNotifier,
};
use bizdesk_onboarding::{Notifier, OnboardingService};

pub type Onboarding = OnboardingService<
    Arc<InMemoryRegistrationRequestStore>,
    Arc<AccountDirectory>,
    Arc<InMemoryOutbox>,
    Arc<dyn Notifier>,
>;

pub struct AppServices {
    pub config: AuthConfig,
    pub directory: Arc<AccountDirectory>,
    pub identity: DirectoryIdentityGateway,
    pub onboarding: Onboarding,
    pub outbox: Arc<InMemoryOutbox>,
    pub exchanges: IdentityExchangeRegistry,
}

impl AppServices {
    /// In-memory wiring; notifications go to the log.
    pub fn new(config: AuthConfig) -> Self {
        Self::with_notifier(config, Arc::new(LoggingNotifier))
    }

    pub fn with_notifier(config: AuthConfig, notifier: Arc<dyn Notifier>) -> Self {
        let directory = Arc::new(AccountDirectory::new(&config));
        let tokens = Hs256JwtValidator::new(config.jwt_secret.clone().into_bytes(), config.access_token_lifetime_secs);
        let identity = DirectoryIdentityGateway::new(directory.clone(), tokens);
        let outbox = Arc::new(InMemoryOutbox::new());
        let onboarding = OnboardingService::new(
            Arc::new(InMemoryRegistrationRequestStore::new()),
            directory.clone(),
            outbox.clone(),
            notifier,
        );

        Self {
            config,
            directory,
            identity,
            onboarding,
            outbox,
            exchanges: IdentityExchangeRegistry::new(),
        }
    }

    /// Enable an external identity provider.
    pub fn with_identity_provider(mut self, provider: Arc<dyn IdentityExchange>) -> Self {
        tracing::info!(provider = provider.provider(), "identity provider registered");
        self.exchanges.register(provider);
        self
    }
}
