use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;

use crate::api::error::ApiError;
use crate::api::AppState;
use crate::models::{BasicInfo, JobsAndProjects, Skills, Socials};

const HEALTHY: &str = "Healthy";
const UNHEALTHY: &str = "Unhealthy";

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    #[serde(rename = "AppStatus")]
    pub app_status: &'static str,
    #[serde(rename = "Database")]
    pub database: &'static str,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
}

/// Liveness plus a database ping
pub async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.storage.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(HealthResponse {
                app_status: HEALTHY,
                database: HEALTHY,
            }),
        ),
        Err(e) => {
            warn!(error = %e, "Database health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthResponse {
                    app_status: UNHEALTHY,
                    database: UNHEALTHY,
                }),
            )
        }
    }
}

pub async fn metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render_prometheus(),
    )
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, ApiError> {
    let Json(request) =
        payload.map_err(|_| ApiError::InvalidRequest("invalid parameters".to_string()))?;

    let token = state
        .auth
        .login(request.username.trim(), &request.password)
        .await?;
    Ok(Json(LoginResponse { token }))
}

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| ApiError::InvalidParameter(rejection.body_text()))
}

pub async fn get_basic_info(
    State(state): State<Arc<AppState>>,
) -> Result<Json<BasicInfo>, ApiError> {
    Ok(Json(state.content.basic_info().await?))
}

pub async fn update_basic_info(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<BasicInfo>, JsonRejection>,
) -> Result<Json<BasicInfo>, ApiError> {
    let info = body(payload)?;
    Ok(Json(state.content.update_basic_info(&info).await?))
}

pub async fn get_skills(State(state): State<Arc<AppState>>) -> Result<Json<Skills>, ApiError> {
    Ok(Json(state.content.skills().await?))
}

pub async fn update_skills(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<Skills>, JsonRejection>,
) -> Result<Json<Skills>, ApiError> {
    let skills = body(payload)?;
    Ok(Json(state.content.update_skills(&skills).await?))
}

pub async fn get_jobs_and_projects(
    State(state): State<Arc<AppState>>,
) -> Result<Json<JobsAndProjects>, ApiError> {
    Ok(Json(state.content.jobs_and_projects().await?))
}

pub async fn update_jobs_and_projects(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<JobsAndProjects>, JsonRejection>,
) -> Result<Json<JobsAndProjects>, ApiError> {
    let content = body(payload)?;
    Ok(Json(state.content.update_jobs_and_projects(&content).await?))
}

pub async fn get_socials(State(state): State<Arc<AppState>>) -> Result<Json<Socials>, ApiError> {
    Ok(Json(state.content.socials().await?))
}

pub async fn update_socials(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<Socials>, JsonRejection>,
) -> Result<Json<Socials>, ApiError> {
    let socials = body(payload)?;
    Ok(Json(state.content.update_socials(&socials).await?))
}
