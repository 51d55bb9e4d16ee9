//! Password policy, Argon2id hashing and temporary credentials.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHasher, SaltString};
use argon2::{Argon2, PasswordVerifier};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PasswordError {
    #[error("password must be at least {min} characters")]
    TooShort { min: usize },

    #[error("new password must differ from the temporary password")]
    Unchanged,

    #[error("cryptography error: {0}")]
    Crypto(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PasswordPolicy {
    pub min_length: usize,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self { min_length: 8 }
    }
}

impl PasswordPolicy {
    pub fn new(min_length: usize) -> Self {
        Self { min_length }
    }

    /// Length is counted in characters, not bytes.
    pub fn validate(&self, candidate: &str) -> Result<(), PasswordError> {
        if candidate.chars().count() < self.min_length {
            return Err(PasswordError::TooShort { min: self.min_length });
        }
        Ok(())
    }
}

/// Hash a password into an Argon2id PHC string.
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| PasswordError::Crypto(format!("hash error: {e}")))
}

/// Verify a plaintext password against an Argon2id PHC-format hash.
///
/// `Ok(false)` on mismatch, `Err(PasswordError::Crypto)` when the stored hash
/// is malformed.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, PasswordError> {
    let parsed_hash = argon2::PasswordHash::new(hash)
        .map_err(|e| PasswordError::Crypto(format!("invalid hash format: {e}")))?;

    match Argon2::default().verify_password(password.as_bytes(), &parsed_hash) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(PasswordError::Crypto(format!("verify error: {e}"))),
    }
}

/// Random one-time credential handed to provisioned or invited accounts.
pub fn generate_temporary_password() -> String {
    let raw = Uuid::new_v4().simple().to_string();
    format!("Tmp-{}", &raw[..12])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn correct_password_matches() {
        let hash = hash_password("hunter2hunter2").unwrap();
        assert!(verify_password("hunter2hunter2", &hash).unwrap());
        assert!(!verify_password("wrong", &hash).unwrap());
    }

    #[test]
    fn malformed_hash_returns_error() {
        assert!(verify_password("pw", "not-a-hash").is_err());
    }

    #[test]
    fn policy_counts_characters() {
        let policy = PasswordPolicy::new(8);
        assert_eq!(policy.validate("short"), Err(PasswordError::TooShort { min: 8 }));
        assert!(policy.validate("newStrongPass1").is_ok());
        assert!(policy.validate("éééééééé").is_ok());
    }

    #[test]
    fn temporary_passwords_satisfy_default_policy() {
        let a = generate_temporary_password();
        let b = generate_temporary_password();
        assert_ne!(a, b);
        assert!(PasswordPolicy::default().validate(&a).is_ok());
    }
}
