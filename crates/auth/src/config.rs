//! Authentication configuration.

/// Configuration for token issuance, password policy, lockout and navigation.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// HS256 signing secret for access tokens.
    pub jwt_secret: String,
    /// Access token lifetime in seconds (default: 3600).
    pub access_token_lifetime_secs: u64,
    /// Minimum password length for new passwords (default: 8).
    pub min_password_length: usize,
    /// Consecutive failed logins before the account locks (default: 5).
    pub max_failed_login_attempts: u32,
    /// Lockout duration in seconds (default: 900).
    pub lockout_duration_secs: u64,
    /// Reject logins that carry no bot-challenge token.
    pub require_bot_challenge: bool,
    pub login_path: String,
    pub password_reset_path: String,
    pub admin_home: String,
    pub dashboard_home: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "dev-secret".into(),
            access_token_lifetime_secs: 3600,
            min_password_length: 8,
            max_failed_login_attempts: 5,
            lockout_duration_secs: 900,
            require_bot_challenge: false,
            login_path: "/login".into(),
            password_reset_path: "/first-login".into(),
            admin_home: "/admin".into(),
            dashboard_home: "/dashboard".into(),
        }
    }
}

impl AuthConfig {
    /// Defaults overridden by `BIZDESK_*` environment variables.
    ///
    /// Unparseable numeric values keep the default and log a warning.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        match std::env::var("BIZDESK_JWT_SECRET") {
            Ok(secret) if !secret.trim().is_empty() => config.jwt_secret = secret,
            _ => tracing::warn!("BIZDESK_JWT_SECRET not set; using insecure dev default"),
        }

        env_parse("BIZDESK_ACCESS_TOKEN_TTL_SECS", &mut config.access_token_lifetime_secs);
        env_parse("BIZDESK_MIN_PASSWORD_LENGTH", &mut config.min_password_length);
        env_parse("BIZDESK_MAX_FAILED_LOGINS", &mut config.max_failed_login_attempts);
        env_parse("BIZDESK_LOCKOUT_SECS", &mut config.lockout_duration_secs);
        env_parse("BIZDESK_REQUIRE_BOT_CHALLENGE", &mut config.require_bot_challenge);

        config
    }
}

fn env_parse<T: core::str::FromStr>(key: &str, slot: &mut T) {
    let Ok(raw) = std::env::var(key) else {
        return;
    };
    match raw.trim().parse() {
        Ok(value) => *slot = value,
        Err(_) => tracing::warn!(key, value = %raw, "ignoring unparseable config value"),
    }
}
