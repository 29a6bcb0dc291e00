//! Authentication Lifecycle Tests
//!
//! These tests validate the token codec, credential hashing, session key
//! layout, and request validation rules from outside the crate, the way the
//! handlers consume them.

use chrono::Duration;
use validator::Validate;

use marketlens_server::auth::{
    hash_password, verify_password, TokenCodec, TokenError, TokenPurpose,
};
use marketlens_server::models::{LoginRequest, RegisterRequest, TokenPairResponse, User};
use marketlens_server::session::keys;

fn codec() -> TokenCodec {
    TokenCodec::with_secrets(
        "test-access-secret",
        "test-refresh-secret",
        "test-reset-secret",
        Duration::seconds(900),
        Duration::days(7),
        Duration::minutes(30),
    )
}

// ============================================================================
// Token Purpose Isolation Tests
// ============================================================================

#[test]
fn test_access_token_full_round_trip() {
    let codec = codec();

    let token = codec.issue("trader@example.com", TokenPurpose::Access).unwrap();
    let claims = codec.verify(&token, TokenPurpose::Access).unwrap();

    assert_eq!(claims.sub, "trader@example.com");
    assert_eq!(claims.purpose, "access");
    assert!(TokenCodec::remaining_ttl(&claims).unwrap() <= 900);
}

#[test]
fn test_each_purpose_verifies_only_as_itself() {
    let codec = codec();
    let purposes = [
        TokenPurpose::Access,
        TokenPurpose::Refresh,
        TokenPurpose::PasswordReset,
    ];

    for issued_as in purposes {
        let token = codec.issue("trader@example.com", issued_as).unwrap();
        for expected in purposes {
            let result = codec.verify(&token, expected);
            assert_eq!(result.is_ok(), issued_as == expected);
        }
    }
}

#[test]
fn test_codecs_with_different_secrets_reject_each_other() {
    let issuing = codec();
    let other = TokenCodec::with_secrets(
        "rotated-access-secret",
        "test-refresh-secret",
        "test-reset-secret",
        Duration::seconds(900),
        Duration::days(7),
        Duration::minutes(30),
    );

    let token = issuing.issue("trader@example.com", TokenPurpose::Access).unwrap();
    assert!(matches!(
        other.verify(&token, TokenPurpose::Access),
        Err(TokenError::Invalid(_))
    ));
}

#[test]
fn test_expired_token_is_reported_as_expired() {
    let codec = TokenCodec::with_secrets(
        "test-access-secret",
        "test-refresh-secret",
        "test-reset-secret",
        Duration::seconds(-5),
        Duration::days(7),
        Duration::minutes(30),
    );

    let token = codec.issue("trader@example.com", TokenPurpose::Access).unwrap();
    assert!(matches!(
        codec.verify(&token, TokenPurpose::Access),
        Err(TokenError::Expired)
    ));
}

// ============================================================================
// Credential Hashing Tests
// ============================================================================

#[test]
fn test_password_hash_verifies_and_rejects() {
    let hash = hash_password("correct horse battery").unwrap();

    assert!(verify_password("correct horse battery", &hash).unwrap());
    assert!(!verify_password("wrong horse battery", &hash).unwrap());
}

#[test]
fn test_password_hashes_are_salted() {
    let a = hash_password("same-password").unwrap();
    let b = hash_password("same-password").unwrap();

    assert_ne!(a, b);
    assert!(verify_password("same-password", &a).unwrap());
    assert!(verify_password("same-password", &b).unwrap());
}

#[test]
fn test_corrupt_hash_is_recoverable_error() {
    // A damaged stored hash must surface as an error, not a panic and not
    // a silent "wrong password".
    assert!(verify_password("anything", "not-a-phc-string").is_err());
}

// ============================================================================
// Session Key Layout Tests
// ============================================================================

#[test]
fn test_session_key_namespaces() {
    assert_eq!(keys::access_token(42), "access_token:42");
    assert_eq!(keys::refresh_token(42), "refresh_token:42");
    assert_eq!(
        keys::refresh_token_user("tok.abc"),
        "refresh_token_user:tok.abc"
    );
    assert_eq!(keys::blacklist("tok.abc"), "blacklist:tok.abc");
    assert_eq!(keys::user("a@x.com"), "user:a@x.com");
}

#[test]
fn test_session_keys_do_not_collide_across_namespaces() {
    // The same raw value under different namespaces must map to
    // different keys.
    let token = "shared-value";
    assert_ne!(keys::blacklist(token), keys::refresh_token_user(token));
}

// ============================================================================
// Request Validation and Response Shape Tests
// ============================================================================

#[test]
fn test_register_request_email_validation() {
    let valid = RegisterRequest {
        email: "trader@example.com".to_string(),
        password: "longenough".to_string(),
        full_name: Some("Pat Trader".to_string()),
    };
    assert!(valid.validate().is_ok());

    let invalid = RegisterRequest {
        email: "not-an-email".to_string(),
        password: "longenough".to_string(),
        full_name: None,
    };
    assert!(invalid.validate().is_err());
}

#[test]
fn test_login_request_email_validation() {
    let invalid = LoginRequest {
        email: "@@".to_string(),
        password: "whatever".to_string(),
    };
    assert!(invalid.validate().is_err());
}

#[test]
fn test_token_pair_response_is_bearer() {
    let pair = TokenPairResponse::bearer("acc".to_string(), "ref".to_string());
    assert_eq!(pair.token_type, "bearer");
    assert_eq!(pair.access_token, "acc");
    assert_eq!(pair.refresh_token, "ref");
}

#[test]
fn test_user_response_never_carries_password_hash() {
    let user = User {
        id: 7,
        email: "trader@example.com".to_string(),
        full_name: None,
        hashed_password: "$argon2id$secret".to_string(),
        is_active: true,
        is_superuser: false,
        created_at: chrono::Utc::now(),
    };

    let response = marketlens_server::models::UserResponse::from(user);
    let json = serde_json::to_string(&response).unwrap();

    assert!(!json.contains("argon2"));
    assert!(!json.contains("hashed_password"));
}
