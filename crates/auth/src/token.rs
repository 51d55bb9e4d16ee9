//! Access token issuance and validation (HS256 JWT).

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};

use crate::{Principal, TokenClaims, TokenError, validate_claims};

/// Ten years; longer lifetimes are clamped.
const MAX_LIFETIME_SECS: i64 = 10 * 365 * 24 * 3600;

/// Verifies bearer tokens and yields their claims.
pub trait JwtValidator: Send + Sync {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<TokenClaims, TokenError>;
}

/// Symmetric-key JWT issuer/validator.
#[derive(Clone)]
pub struct Hs256JwtValidator {
    secret: Vec<u8>,
    lifetime: Duration,
}

impl core::fmt::Debug for Hs256JwtValidator {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Hs256JwtValidator")
            .field("lifetime", &self.lifetime)
            .finish_non_exhaustive()
    }
}

impl Hs256JwtValidator {
    pub fn new(secret: impl Into<Vec<u8>>, lifetime_secs: u64) -> Self {
        Self {
            secret: secret.into(),
            lifetime: Duration::seconds(i64::try_from(lifetime_secs).unwrap_or(i64::MAX).min(MAX_LIFETIME_SECS)),
        }
    }

    pub fn claims_for(&self, principal: &Principal, now: DateTime<Utc>) -> TokenClaims {
        TokenClaims {
            sub: principal.id,
            role: principal.role,
            business_id: principal.business_id,
            must_change_password: principal.must_change_password,
            issued_at: now,
            expires_at: now + self.lifetime,
        }
    }

    pub fn issue(&self, principal: &Principal, now: DateTime<Utc>) -> Result<String, TokenError> {
        let claims = self.claims_for(principal, now);
        jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(&self.secret),
        )
        .map_err(|e| TokenError::Signing(e.to_string()))
    }
}

impl JwtValidator for Hs256JwtValidator {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<TokenClaims, TokenError> {
        // Our claims carry chrono timestamps instead of `exp`; the window is
        // checked by `validate_claims`.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.required_spec_claims.clear();
        validation.validate_exp = false;

        let data = jsonwebtoken::decode::<TokenClaims>(
            token,
            &DecodingKey::from_secret(&self.secret),
            &validation,
        )
        .map_err(|e| TokenError::Malformed(e.to_string()))?;

        validate_claims(&data.claims, now)?;
        Ok(data.claims)
    }
}
