use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderName, HeaderValue, Method},
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::auth::{auth_middleware, AUTH_HEADER};
use crate::config::CorsConfig;

use super::analytics::{count, get_report, track};
use super::files::{
    delete_image, get_object, upload_carousel, upload_cv, upload_job_image, upload_partner,
    upload_project_image,
};
use super::handlers::{
    get_basic_info, get_jobs_and_projects, get_skills, get_socials, health_check, login, metrics,
    update_basic_info, update_jobs_and_projects, update_skills, update_socials,
};
use super::AppState;

pub fn create_router(state: Arc<AppState>, cors: &CorsConfig, upload_max_bytes: usize) -> Router {
    let protected_routes = Router::new()
        .route("/users/basic-info", put(update_basic_info))
        .route("/users/skills", put(update_skills))
        .route(
            "/users/jobs-and-projects",
            put(update_jobs_and_projects),
        )
        .route("/users/socials", put(update_socials))
        .route("/analytics", get(get_report))
        .route("/analytics/count", get(count))
        .route("/files/cv", post(upload_cv))
        .route("/files/project-image", post(upload_project_image))
        .route("/files/job-image", post(upload_job_image))
        .route("/files/partners", post(upload_partner))
        .route("/files/carousel", post(upload_carousel))
        .route("/files/image", delete(delete_image))
        .layer(DefaultBodyLimit::max(upload_max_bytes))
        .route_layer(middleware::from_fn_with_state(
            Arc::clone(&state.auth),
            auth_middleware,
        ));

    Router::new()
        .route("/healths", get(health_check))
        .route("/metrics", get(metrics))
        .route("/users/basic-info", get(get_basic_info))
        .route("/users/skills", get(get_skills))
        .route("/users/jobs-and-projects", get(get_jobs_and_projects))
        .route("/users/socials", get(get_socials))
        .route("/auth/login", post(login))
        .route("/analytics/track", post(track))
        .route("/objects/{*key}", get(get_object))
        .merge(protected_routes)
        .with_state(state)
        .layer(cors_layer(cors))
        .layer(TraceLayer::new_for_http())
}

fn cors_layer(cors: &CorsConfig) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static(AUTH_HEADER),
        ]);

    if cors.allowed_origins.iter().any(|origin| origin == "*") {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = cors
        .allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(%origin, "Ignoring malformed CORS origin");
                None
            }
        })
        .collect();
    layer.allow_origin(origins)
}
