//! Signed session token encoding and decoding
//!
//! Tokens are compact JWTs carrying `{sub, iat, exp, type}`. The purpose tag
//! is embedded in the signed payload, so a refresh or reset token can never
//! be replayed where an access token is expected, regardless of which
//! endpoint receives it. Each purpose signs with its own secret.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::Config;

/// Token-related errors
#[derive(Error, Debug)]
pub enum TokenError {
    #[error("Token encoding failed: {0}")]
    EncodingFailed(String),

    #[error("Token has expired")]
    Expired,

    #[error("Invalid token: {0}")]
    Invalid(String),

    #[error("Wrong token type: expected {expected}, got {actual}")]
    WrongPurpose {
        expected: &'static str,
        actual: String,
    },
}

/// What a token is allowed to be used for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenPurpose {
    Access,
    Refresh,
    PasswordReset,
}

impl TokenPurpose {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenPurpose::Access => "access",
            TokenPurpose::Refresh => "refresh",
            TokenPurpose::PasswordReset => "password_reset",
        }
    }
}

/// Signed token claims
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (the user's email)
    pub sub: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration (Unix timestamp)
    pub exp: i64,
    /// Purpose tag (access, refresh, password_reset)
    #[serde(rename = "type")]
    pub purpose: String,
}

struct PurposeKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

/// Issues and verifies signed tokens. One keypair of HS256 material per
/// purpose; the reset keyspace is isolated from the session keyspace.
pub struct TokenCodec {
    access: PurposeKeys,
    refresh: PurposeKeys,
    reset: PurposeKeys,
}

impl TokenCodec {
    pub fn new(config: &Config) -> Self {
        Self::with_secrets(
            &config.access_token_secret,
            &config.refresh_token_secret,
            &config.reset_token_secret,
            Duration::seconds(config.access_token_ttl_seconds),
            Duration::days(config.refresh_token_ttl_days),
            Duration::minutes(config.reset_token_ttl_minutes),
        )
    }

    pub fn with_secrets(
        access_secret: &str,
        refresh_secret: &str,
        reset_secret: &str,
        access_ttl: Duration,
        refresh_ttl: Duration,
        reset_ttl: Duration,
    ) -> Self {
        let keys = |secret: &str, ttl| PurposeKeys {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        };

        Self {
            access: keys(access_secret, access_ttl),
            refresh: keys(refresh_secret, refresh_ttl),
            reset: keys(reset_secret, reset_ttl),
        }
    }

    fn keys(&self, purpose: TokenPurpose) -> &PurposeKeys {
        match purpose {
            TokenPurpose::Access => &self.access,
            TokenPurpose::Refresh => &self.refresh,
            TokenPurpose::PasswordReset => &self.reset,
        }
    }

    /// Issue a signed token for `subject` with the configured TTL for the
    /// given purpose.
    pub fn issue(&self, subject: &str, purpose: TokenPurpose) -> Result<String, TokenError> {
        let keys = self.keys(purpose);
        let now = Utc::now();

        let claims = Claims {
            sub: subject.to_string(),
            iat: now.timestamp(),
            exp: (now + keys.ttl).timestamp(),
            purpose: purpose.as_str().to_string(),
        };

        encode(&jsonwebtoken::Header::default(), &claims, &keys.encoding)
            .map_err(|e| TokenError::EncodingFailed(e.to_string()))
    }

    /// Verify a token and require its embedded purpose tag to match.
    ///
    /// Expiry is exact (no leeway). Signature, structure, and purpose
    /// failures are distinct internally but must all surface to clients as
    /// the same unauthorized error.
    pub fn verify(&self, token: &str, expected: TokenPurpose) -> Result<Claims, TokenError> {
        let keys = self.keys(expected);

        let mut validation = Validation::default();
        validation.validate_exp = true;
        validation.leeway = 0;

        let data = decode::<Claims>(token, &keys.decoding, &validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid(e.to_string()),
            }
        })?;

        if data.claims.purpose != expected.as_str() {
            return Err(TokenError::WrongPurpose {
                expected: expected.as_str(),
                actual: data.claims.purpose,
            });
        }

        Ok(data.claims)
    }

    /// Seconds until the token's `exp`, if it is still in the future.
    pub fn remaining_ttl(claims: &Claims) -> Option<u64> {
        let remaining = claims.exp - Utc::now().timestamp();
        (remaining > 0).then_some(remaining as u64)
    }
}
