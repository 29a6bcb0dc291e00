//! Password hashing and verification
//!
//! Argon2id with a per-hash random salt. Hashing is deliberately slow and
//! memory-hard; never compare hashes directly.

use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand_core::OsRng;
use thiserror::Error;

/// Password hashing errors
#[derive(Error, Debug)]
pub enum PasswordError {
    #[error("Password hashing failed: {0}")]
    HashingFailed(String),

    /// The stored hash is not a value this module produced. Callers must
    /// treat this as verification failure, not a crash.
    #[error("Stored password hash has an invalid format")]
    InvalidHashFormat,
}

/// Hash a password with a fresh random salt.
///
/// Two calls with the same input produce different hashes; both verify.
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| PasswordError::HashingFailed(e.to_string()))
}

/// Verify a password against a stored hash.
///
/// Returns `Ok(false)` on mismatch and `Err(InvalidHashFormat)` when the
/// stored value cannot be parsed as a PHC hash string.
pub fn verify_password(password: &str, stored_hash: &str) -> Result<bool, PasswordError> {
    let parsed = PasswordHash::new(stored_hash).map_err(|_| PasswordError::InvalidHashFormat)?;

    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(_) => Err(PasswordError::InvalidHashFormat),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("correct horse").unwrap();
        assert!(verify_password("correct horse", &hash).unwrap());
        assert!(!verify_password("wrong horse", &hash).unwrap());
    }

    #[test]
    fn test_hash_is_salted() {
        let first = hash_password("same input").unwrap();
        let second = hash_password("same input").unwrap();

        assert_ne!(first, second);
        assert!(verify_password("same input", &first).unwrap());
        assert!(verify_password("same input", &second).unwrap());
    }

    #[test]
    fn test_malformed_hash_is_recoverable() {
        let result = verify_password("anything", "not-a-phc-string");
        assert!(matches!(result, Err(PasswordError::InvalidHashFormat)));
    }
}
