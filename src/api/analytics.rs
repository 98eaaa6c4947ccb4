//! Analytics API handlers

use axum::{
    extract::{rejection::JsonRejection, ConnectInfo, RawQuery, State},
    http::{header, HeaderMap, StatusCode},
    Json,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use url::form_urlencoded;

use crate::analytics::{extract_client_ip, AnalyticsReport, TrackRequest};
use crate::api::error::ApiError;
use crate::api::AppState;

pub const EXACTLY_ONE_PARAM: &str = "You should provide exactly 1 query param to this endpoint";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackBody {
    pub device_type: String,
}

#[derive(Debug, Serialize)]
pub struct CountResponse {
    pub count: i64,
}

/// Split a raw query string into its single `key[=value]` selector.
pub fn single_selector(raw: Option<&str>) -> Result<(String, String), ApiError> {
    let invalid = || ApiError::InvalidParameter(EXACTLY_ONE_PARAM.to_string());

    let mut params = raw.unwrap_or_default().split('&').filter(|p| !p.is_empty());
    let param = params.next().ok_or_else(invalid)?;
    if params.next().is_some() {
        return Err(invalid());
    }

    let (key, value) = param.split_once('=').unwrap_or((param, ""));
    if key.is_empty() || value.contains('=') {
        return Err(invalid());
    }
    let key = decode_component(key);
    if key.is_empty() {
        return Err(invalid());
    }
    Ok((key, decode_component(value)))
}

/// Percent-decode one query component, `+` included.
fn decode_component(raw: &str) -> String {
    form_urlencoded::parse(raw.as_bytes())
        .next()
        .map(|(decoded, _)| decoded.into_owned())
        .unwrap_or_default()
}

/// `GET /analytics?<selector>[=value]`
pub async fn get_report(
    State(state): State<Arc<AppState>>,
    RawQuery(query): RawQuery,
) -> Result<Json<AnalyticsReport>, ApiError> {
    let (key, value) = single_selector(query.as_deref())?;
    Ok(Json(state.analytics.resolve(&key, &value).await?))
}

pub async fn count(State(state): State<Arc<AppState>>) -> Result<Json<CountResponse>, ApiError> {
    let count = state.analytics.count().await?;
    Ok(Json(CountResponse { count }))
}

/// `POST /analytics/track`
pub async fn track(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    payload: Result<Json<TrackBody>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    let Json(body) = payload.map_err(|_| {
        ApiError::InvalidParameter("the request body should contain a deviceType".to_string())
    })?;

    let header_value = |name: header::HeaderName| {
        headers
            .get(name)
            .and_then(|h| h.to_str().ok())
            .map(str::to_string)
    };

    let request = TrackRequest {
        client_ip: extract_client_ip(&headers, addr.ip(), &state.client_ip),
        referer: header_value(header::REFERER),
        user_agent: header_value(header::USER_AGENT),
        device_type: body.device_type,
    };

    state.analytics.track(request).await?;
    Ok(StatusCode::CREATED)
}
