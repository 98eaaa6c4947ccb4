use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::error;

use crate::analytics::AnalyticsError;
use crate::auth::AuthError;
use crate::content::ContentError;
use crate::storage::StorageError;

#[derive(Debug)]
pub enum ApiError {
    /// 400 `{"message"}`
    InvalidParameter(String),
    /// 400 `{"error"}`, used by the login endpoint
    InvalidRequest(String),
    /// 401 with no body
    Unauthorized,
    /// 401 `{"error"}`
    InvalidCredentials,
    /// 403 `{"message"}`
    Forbidden(String),
    /// 404 `{"message"}`
    NotFound(String),
    /// 500 with no body; the cause is logged
    Upstream(anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::InvalidParameter(message) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "message": message }))).into_response()
            }
            ApiError::InvalidRequest(message) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response()
            }
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED.into_response(),
            ApiError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "error": "invalid username or password" })),
            )
                .into_response(),
            ApiError::Forbidden(message) => {
                (StatusCode::FORBIDDEN, Json(json!({ "message": message }))).into_response()
            }
            ApiError::NotFound(message) => {
                (StatusCode::NOT_FOUND, Json(json!({ "message": message }))).into_response()
            }
            ApiError::Upstream(err) => {
                error!(error = %format!("{:#}", err), "Request failed");
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        }
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        ApiError::Upstream(err.into())
    }
}

impl From<AnalyticsError> for ApiError {
    fn from(err: AnalyticsError) -> Self {
        match err {
            AnalyticsError::InvalidParameter(message) => ApiError::InvalidParameter(message),
            AnalyticsError::NotFound => ApiError::NotFound(err.to_string()),
            AnalyticsError::Upstream(e) => e.into(),
        }
    }
}

impl From<ContentError> for ApiError {
    fn from(err: ContentError) -> Self {
        match err {
            ContentError::InvalidInput(message) => ApiError::InvalidParameter(message),
            ContentError::NotFound(message) => ApiError::NotFound(message),
            ContentError::Storage(e) => e.into(),
            ContentError::ObjectStore(e) => ApiError::Upstream(e.into()),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingToken => ApiError::Unauthorized,
            AuthError::InvalidToken | AuthError::InsufficientRole => {
                ApiError::Forbidden(err.to_string())
            }
            AuthError::MalformedCredentials => ApiError::InvalidRequest(err.to_string()),
            AuthError::InvalidCredentials => ApiError::InvalidCredentials,
            AuthError::Storage(e) => e.into(),
            AuthError::Internal(e) => ApiError::Upstream(e),
        }
    }
}
