//! Session store key naming
//!
//! One place for every key family so the cache namespace stays predictable.

/// Current access token for a user
pub fn access_token(user_id: i64) -> String {
    format!("access_token:{}", user_id)
}

/// Current refresh token for a user
pub fn refresh_token(user_id: i64) -> String {
    format!("refresh_token:{}", user_id)
}

/// Reverse mapping: refresh token value -> owning user's email
pub fn refresh_token_user(token: &str) -> String {
    format!("refresh_token_user:{}", token)
}

/// Revocation marker for a logged-out token
pub fn blacklist(token: &str) -> String {
    format!("blacklist:{}", token)
}

/// Cached user profile snapshot
pub fn user(email: &str) -> String {
    format!("user:{}", email)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_formats() {
        assert_eq!(access_token(42), "access_token:42");
        assert_eq!(refresh_token(42), "refresh_token:42");
        assert_eq!(refresh_token_user("tok"), "refresh_token_user:tok");
        assert_eq!(blacklist("tok"), "blacklist:tok");
        assert_eq!(user("a@x.com"), "user:a@x.com");
    }
}
