//! Data models for the MarketLens backend

use serde::{Deserialize, Serialize};
use sqlx::types::chrono::{DateTime, Utc};
use validator::Validate;

/// User identity record, owned by the persistence layer.
///
/// Serialized form doubles as the cached profile snapshot in the session
/// store, so the password hash travels with it; it never leaves the server
/// (API responses use [`UserResponse`]).
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub full_name: Option<String>,
    pub hashed_password: String,
    pub is_active: bool,
    pub is_superuser: bool,
    pub created_at: DateTime<Utc>,
}

/// User response (sanitized for API)
#[derive(Debug, Serialize, Clone)]
pub struct UserResponse {
    pub id: i64,
    pub email: String,
    pub full_name: Option<String>,
    pub is_active: bool,
    pub is_superuser: bool,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            full_name: user.full_name,
            is_active: user.is_active,
            is_superuser: user.is_superuser,
            created_at: user.created_at,
        }
    }
}

// ============================================================================
// Request/Response DTOs
// ============================================================================

/// Registration request
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email)]
    pub email: String,
    pub password: String,
    pub full_name: Option<String>,
}

/// Login request
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,
    pub password: String,
}

/// Token pair issued on login and refresh
#[derive(Debug, Serialize)]
pub struct TokenPairResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
}

impl TokenPairResponse {
    pub fn bearer(access_token: String, refresh_token: String) -> Self {
        Self {
            access_token,
            refresh_token,
            token_type: "bearer".to_string(),
        }
    }
}

/// Refresh token request
#[derive(Debug, Deserialize)]
pub struct RefreshTokenRequest {
    pub refresh_token: String,
}

/// Request a password-reset email
#[derive(Debug, Deserialize, Validate)]
pub struct PasswordResetRequest {
    #[validate(email)]
    pub email: String,
}

/// Confirm a password reset with the emailed token
#[derive(Debug, Deserialize)]
pub struct PasswordResetConfirm {
    pub token: String,
    pub new_password: String,
}

/// Generic message response
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user() -> User {
        User {
            id: 7,
            email: "a@x.com".to_string(),
            full_name: Some("Ada".to_string()),
            hashed_password: "$argon2id$stub".to_string(),
            is_active: true,
            is_superuser: false,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_user_response_drops_password_hash() {
        let user = sample_user();
        let response = UserResponse::from(user);
        let json = serde_json::to_value(&response).unwrap();

        assert_eq!(json["email"], "a@x.com");
        assert!(json.get("hashed_password").is_none());
    }

    #[test]
    fn test_user_snapshot_round_trip() {
        let user = sample_user();
        let json = serde_json::to_string(&user).unwrap();
        let back: User = serde_json::from_str(&json).unwrap();

        assert_eq!(back.id, user.id);
        assert_eq!(back.email, user.email);
        assert_eq!(back.hashed_password, user.hashed_password);
    }

    #[test]
    fn test_register_request_email_validation() {
        let ok = RegisterRequest {
            email: "a@x.com".to_string(),
            password: "longenough1".to_string(),
            full_name: None,
        };
        assert!(ok.validate().is_ok());

        let bad = RegisterRequest {
            email: "not-an-email".to_string(),
            password: "longenough1".to_string(),
            full_name: None,
        };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_token_pair_is_bearer() {
        let pair = TokenPairResponse::bearer("a".to_string(), "r".to_string());
        assert_eq!(pair.token_type, "bearer");
        assert_eq!(pair.access_token, "a");
        assert_eq!(pair.refresh_token, "r");
    }
}
