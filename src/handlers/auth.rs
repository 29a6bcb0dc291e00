//! Authentication HTTP handlers
//!
//! Endpoints for registration, login, token refresh, logout, and password
//! reset. Handlers stay thin: validate the payload, call the auth service,
//! map domain errors onto API errors.

use axum::{extract::State, http::StatusCode, Json};
use validator::Validate;

use crate::error::ApiError;
use crate::middleware::{ActiveUser, CurrentUser};
use crate::models::{
    LoginRequest, MessageResponse, PasswordResetConfirm, PasswordResetRequest, RefreshTokenRequest,
    RegisterRequest, TokenPairResponse, UserResponse,
};
use crate::state::AppState;

/// POST /auth/register - Create a new user account
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    req.validate()?;

    let user = state
        .auth_service
        .register(&req.email, &req.password, req.full_name.as_deref())
        .await?;

    Ok((StatusCode::CREATED, Json(user.into())))
}

/// POST /auth/login - Authenticate and issue an access/refresh token pair
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<TokenPairResponse>, ApiError> {
    req.validate()?;

    let (access_token, refresh_token) =
        state.auth_service.login(&req.email, &req.password).await?;

    Ok(Json(TokenPairResponse::bearer(access_token, refresh_token)))
}

/// POST /auth/refresh - Rotate a refresh token into a new pair
pub async fn refresh_token(
    State(state): State<AppState>,
    Json(req): Json<RefreshTokenRequest>,
) -> Result<Json<TokenPairResponse>, ApiError> {
    let (access_token, refresh_token) = state.auth_service.refresh(&req.refresh_token).await?;

    Ok(Json(TokenPairResponse::bearer(access_token, refresh_token)))
}

/// POST /auth/logout - Revoke the current session
pub async fn logout(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<StatusCode, ApiError> {
    state
        .auth_service
        .logout(&current.user, &current.token)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

/// GET /auth/me - Get the current authenticated user
pub async fn me(ActiveUser(current): ActiveUser) -> Json<UserResponse> {
    Json(current.user.into())
}

/// POST /auth/password-reset/request - Email a password-reset link
pub async fn request_password_reset(
    State(state): State<AppState>,
    Json(req): Json<PasswordResetRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    req.validate()?;

    let token = state.auth_service.request_password_reset(&req.email).await?;
    state.mailer.send_password_reset(&req.email, &token).await?;

    Ok(Json(MessageResponse::new("Password reset email sent")))
}

/// POST /auth/password-reset/confirm - Set a new password with a reset token
pub async fn confirm_password_reset(
    State(state): State<AppState>,
    Json(req): Json<PasswordResetConfirm>,
) -> Result<Json<MessageResponse>, ApiError> {
    state
        .auth_service
        .confirm_password_reset(&req.token, &req.new_password)
        .await?;

    Ok(Json(MessageResponse::new("Password has been reset")))
}
