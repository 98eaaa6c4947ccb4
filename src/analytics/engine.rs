use crate::analytics::clock::Clock;
use crate::analytics::geoip::GeoLookup;
use crate::analytics::models::{
    BrowserCount, CountryCount, DeviceCount, NewVisit, TrackOutcome,
};
use crate::analytics::report::AnalyticsReport;
use crate::analytics::user_agent::browser_name;
use crate::analytics::window::ReportWindow;
use crate::metrics::Metrics;
use crate::storage::{Storage, StorageError};
use chrono::{NaiveDateTime, Timelike};
use std::net::IpAddr;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum AnalyticsError {
    #[error("{0}")]
    InvalidParameter(String),
    #[error("no analytics found")]
    NotFound,
    #[error(transparent)]
    Upstream(StorageError),
}

impl From<StorageError> for AnalyticsError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound => AnalyticsError::NotFound,
            other => AnalyticsError::Upstream(other),
        }
    }
}

/// Request metadata captured by the tracking endpoint
#[derive(Debug, Clone)]
pub struct TrackRequest {
    pub client_ip: IpAddr,
    pub referer: Option<String>,
    pub user_agent: Option<String>,
    pub device_type: String,
}

pub struct AnalyticsEngine {
    storage: Arc<dyn Storage>,
    geo: Arc<dyn GeoLookup>,
    clock: Arc<dyn Clock>,
    metrics: Arc<Metrics>,
}

impl AnalyticsEngine {
    pub fn new(
        storage: Arc<dyn Storage>,
        geo: Arc<dyn GeoLookup>,
        clock: Arc<dyn Clock>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            storage,
            geo,
            clock,
            metrics,
        }
    }

    /// Report for the window named by a `/analytics` selector.
    pub async fn resolve(&self, key: &str, value: &str) -> Result<AnalyticsReport, AnalyticsError> {
        let window = ReportWindow::parse(key, value)?;
        self.report(window).await
    }

    pub async fn report(&self, window: ReportWindow) -> Result<AnalyticsReport, AnalyticsError> {
        let (start, end) = window.bounds(self.clock.today());
        debug!(?window, %start, %end, "Building analytics report");

        match self.storage.visits_between(start, end).await.map_err(AnalyticsError::from) {
            Ok(visits) => Ok(AnalyticsReport::from_visits(visits)),
            Err(AnalyticsError::NotFound) => Ok(AnalyticsReport::default()),
            Err(e) => Err(e),
        }
    }

    /// Visits recorded today (UTC)
    pub async fn count(&self) -> Result<i64, AnalyticsError> {
        match self.storage.count_visits_on(self.clock.today()).await.map_err(AnalyticsError::from) {
            Err(AnalyticsError::NotFound) => Ok(0),
            other => other,
        }
    }

    /// Record a visit unless this IP was already seen today.
    pub async fn track(&self, request: TrackRequest) -> Result<TrackOutcome, AnalyticsError> {
        let device_type = request.device_type.trim();
        if device_type.is_empty() {
            return Err(AnalyticsError::InvalidParameter(
                "deviceType is required".to_string(),
            ));
        }

        let visit = NewVisit {
            timestamp: truncate_to_seconds(self.clock.now().naive_utc()),
            device_type: device_type.to_string(),
            geo: self.geo.lookup(request.client_ip),
            ip_address: request.client_ip.to_string(),
            referer: request.referer.filter(|r| !r.is_empty()),
            browser: request.user_agent.as_deref().and_then(browser_name),
        };

        let inserted = self.storage.insert_visit_if_absent(&visit).await?;
        if inserted {
            self.metrics.record_visit();
            info!(
                ip = %visit.ip_address,
                country = %visit.geo.country_code,
                device = %visit.device_type,
                "Recorded visit"
            );
            Ok(TrackOutcome::Recorded)
        } else {
            self.metrics.record_duplicate_visit();
            debug!(ip = %visit.ip_address, day = %visit.visit_day(), "Visit already recorded today");
            Ok(TrackOutcome::Duplicate)
        }
    }

    pub async fn by_country(&self) -> Result<Vec<CountryCount>, AnalyticsError> {
        or_empty(self.storage.visits_by_country().await)
    }

    pub async fn by_browser(&self) -> Result<Vec<BrowserCount>, AnalyticsError> {
        or_empty(self.storage.visits_by_browser().await)
    }

    pub async fn by_device(&self) -> Result<Vec<DeviceCount>, AnalyticsError> {
        or_empty(self.storage.visits_by_device().await)
    }
}

fn or_empty<T>(result: Result<Vec<T>, StorageError>) -> Result<Vec<T>, AnalyticsError> {
    match result.map_err(AnalyticsError::from) {
        Err(AnalyticsError::NotFound) => Ok(Vec::new()),
        other => other,
    }
}

fn truncate_to_seconds(at: NaiveDateTime) -> NaiveDateTime {
    at.with_nanosecond(0).unwrap_or(at)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn timestamps_drop_sub_second_precision() {
        let at = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_milli_opt(8, 15, 30, 999)
            .unwrap();
        let truncated = truncate_to_seconds(at);
        assert_eq!(truncated.nanosecond(), 0);
        assert_eq!(truncated.second(), 30);
    }

    #[test]
    fn missing_rows_are_not_upstream_failures() {
        assert!(matches!(
            AnalyticsError::from(StorageError::NotFound),
            AnalyticsError::NotFound
        ));
        assert!(matches!(
            AnalyticsError::from(StorageError::Timeout),
            AnalyticsError::Upstream(StorageError::Timeout)
        ));
    }
}
