pub mod token;

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

use crate::api::error::ApiError;
use crate::metrics::Metrics;
use crate::storage::{Storage, StorageError};

pub use token::{Claims, TokenService, ADMINISTRATOR_ROLE};

pub const AUTH_HEADER: &str = "x-authorization";

const MIN_USERNAME_LEN: usize = 3;
const MIN_PASSWORD_LEN: usize = 5;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("missing authorization token")]
    MissingToken,
    #[error("Invalid token")]
    InvalidToken,
    #[error("Invalid permissions")]
    InsufficientRole,
    #[error("invalid username or password")]
    MalformedCredentials,
    #[error("wrong username or password")]
    InvalidCredentials,
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

pub struct AuthService {
    tokens: TokenService,
    storage: Arc<dyn Storage>,
    metrics: Arc<Metrics>,
}

impl AuthService {
    pub fn new(tokens: TokenService, storage: Arc<dyn Storage>, metrics: Arc<Metrics>) -> Self {
        Self {
            tokens,
            storage,
            metrics,
        }
    }

    /// Exchange the administrator's credentials for a bearer token
    pub async fn login(&self, username: &str, password: &str) -> Result<String, AuthError> {
        if username.chars().count() < MIN_USERNAME_LEN
            || password.chars().count() < MIN_PASSWORD_LEN
        {
            return Err(AuthError::MalformedCredentials);
        }

        let Some((nickname, hash)) = self.storage.credentials(username).await? else {
            self.metrics.record_login_failure();
            warn!(%username, "Login attempt for unknown user");
            return Err(AuthError::InvalidCredentials);
        };

        let candidate = password.to_string();
        let matches = tokio::task::spawn_blocking(move || bcrypt::verify(candidate, &hash))
            .await
            .map_err(|e| AuthError::Internal(e.into()))?
            .unwrap_or(false);

        if !matches {
            self.metrics.record_login_failure();
            warn!(%username, "Login attempt with wrong password");
            return Err(AuthError::InvalidCredentials);
        }

        let token = self.tokens.issue(ADMINISTRATOR_ROLE)?;
        info!(user = %nickname, "Administrator logged in");
        Ok(token)
    }

    /// Accept only valid tokens carrying the administrator role
    pub fn authorize(&self, token: &str) -> Result<Claims, AuthError> {
        let claims = self
            .tokens
            .verify(token)
            .map_err(|_| AuthError::InvalidToken)?;

        if claims.role != ADMINISTRATOR_ROLE {
            return Err(AuthError::InsufficientRole);
        }
        Ok(claims)
    }
}

/// `X-Authorization: <token>`, or `Authorization: Bearer <token>`
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    if let Some(token) = headers.get(AUTH_HEADER).and_then(|h| h.to_str().ok()) {
        let token = token.trim();
        let token = token.strip_prefix("Bearer ").unwrap_or(token).trim();
        if !token.is_empty() {
            return Some(token);
        }
    }

    headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.trim().strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

pub async fn auth_middleware(
    State(auth_service): State<Arc<AuthService>>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(request.headers()).ok_or(AuthError::MissingToken)?;
    auth_service.authorize(token)?;
    Ok(next.run(request).await)
}
