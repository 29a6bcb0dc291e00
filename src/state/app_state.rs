//! Application state shared across handlers

use std::sync::Arc;

use axum::extract::FromRef;

use crate::auth::{AuthService, TokenCodec};
use crate::email::Mailer;
use crate::session::SessionStore;
use crate::users::UserRepository;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub auth_service: Arc<AuthService>,
    pub token_codec: Arc<TokenCodec>,
    pub sessions: SessionStore,
    pub users: UserRepository,
    pub mailer: Arc<Mailer>,
}

impl AppState {
    pub fn new(
        auth_service: Arc<AuthService>,
        token_codec: Arc<TokenCodec>,
        sessions: SessionStore,
        users: UserRepository,
        mailer: Arc<Mailer>,
    ) -> Self {
        Self {
            auth_service,
            token_codec,
            sessions,
            users,
            mailer,
        }
    }
}

impl FromRef<AppState> for Arc<AuthService> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.auth_service.clone()
    }
}

impl FromRef<AppState> for Arc<TokenCodec> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.token_codec.clone()
    }
}

impl FromRef<AppState> for SessionStore {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.sessions.clone()
    }
}

impl FromRef<AppState> for UserRepository {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.users.clone()
    }
}

impl FromRef<AppState> for Arc<Mailer> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.mailer.clone()
    }
}
