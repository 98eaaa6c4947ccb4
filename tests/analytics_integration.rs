//! Integration tests for the analytics engine
//!
//! Visits are tracked through `AnalyticsEngine` against an in-memory SQLite
//! database with a `MockClock`, so deduplication and report windows can be
//! checked against fixed calendar dates.

use chrono::{Duration, TimeZone, Utc};
use folio::analytics::{
    AnalyticsEngine, AnalyticsError, GeoLocation, GeoLookup, MockClock, ReportWindow,
    TrackOutcome, TrackRequest,
};
use folio::metrics::Metrics;
use folio::storage::{SqliteStorage, Storage};
use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;

const FIREFOX_UA: &str =
    "Mozilla/5.0 (X11; Linux x86_64; rv:121.0) Gecko/20100101 Firefox/121.0";
const CHROME_UA: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Fixed IP to country table
struct StaticGeo(HashMap<IpAddr, GeoLocation>);

impl StaticGeo {
    fn new() -> Self {
        let mut table = HashMap::new();
        for (ip, name, code) in [
            ("81.2.69.1", "United Kingdom", "GB"),
            ("81.2.69.2", "United Kingdom", "GB"),
            ("89.160.20.1", "Sweden", "SE"),
            ("2.125.160.1", "Germany", "DE"),
        ] {
            table.insert(
                ip.parse().unwrap(),
                GeoLocation {
                    country_name: name.to_string(),
                    country_code: code.to_string(),
                },
            );
        }
        Self(table)
    }
}

impl GeoLookup for StaticGeo {
    fn lookup(&self, ip: IpAddr) -> GeoLocation {
        self.0.get(&ip).cloned().unwrap_or_default()
    }
}

struct Harness {
    engine: AnalyticsEngine,
    clock: Arc<MockClock>,
    metrics: Arc<Metrics>,
}

/// Engine over a single-connection in-memory database, starting 2024-05-15 10:00 UTC
async fn create_engine() -> Harness {
    let storage = SqliteStorage::new("sqlite::memory:", 1).await.unwrap();
    storage.init().await.unwrap();
    let storage: Arc<dyn Storage> = Arc::new(storage);

    let clock = Arc::new(MockClock::new(
        Utc.with_ymd_and_hms(2024, 5, 15, 10, 0, 0).unwrap(),
    ));
    let metrics = Arc::new(Metrics::default());
    let engine = AnalyticsEngine::new(
        storage,
        Arc::new(StaticGeo::new()),
        clock.clone(),
        metrics.clone(),
    );

    Harness {
        engine,
        clock,
        metrics,
    }
}

fn visit(ip: &str, device: &str, user_agent: Option<&str>) -> TrackRequest {
    TrackRequest {
        client_ip: ip.parse().unwrap(),
        referer: Some("https://example.com/".to_string()),
        user_agent: user_agent.map(str::to_string),
        device_type: device.to_string(),
    }
}

#[tokio::test]
async fn test_same_ip_is_recorded_once_per_day() {
    let h = create_engine().await;

    let first = h.engine.track(visit("81.2.69.1", "desktop", None)).await.unwrap();
    let second = h.engine.track(visit("81.2.69.1", "mobile", None)).await.unwrap();
    assert_eq!(first, TrackOutcome::Recorded);
    assert_eq!(second, TrackOutcome::Duplicate);
    assert_eq!(h.engine.count().await.unwrap(), 1);

    // Next calendar day the same address counts again
    h.clock.advance(Duration::hours(14));
    let next_day = h.engine.track(visit("81.2.69.1", "desktop", None)).await.unwrap();
    assert_eq!(next_day, TrackOutcome::Recorded);
    assert_eq!(h.engine.count().await.unwrap(), 1);

    let metrics = h.metrics.render_prometheus();
    assert!(metrics.contains("folio_visits_recorded_total 2"));
    assert!(metrics.contains("folio_visits_deduplicated_total 1"));
}

#[tokio::test]
async fn test_track_requires_device_type() {
    let h = create_engine().await;

    let result = h.engine.track(visit("81.2.69.1", "  ", None)).await;
    assert!(matches!(result, Err(AnalyticsError::InvalidParameter(_))));
    assert_eq!(h.engine.count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_today_report_aggregates_visits() {
    let h = create_engine().await;

    h.engine
        .track(visit("81.2.69.1", "desktop", Some(FIREFOX_UA)))
        .await
        .unwrap();
    h.clock.advance(Duration::minutes(5));
    h.engine
        .track(visit("81.2.69.2", "mobile", Some(CHROME_UA)))
        .await
        .unwrap();
    h.clock.advance(Duration::minutes(5));
    h.engine
        .track(visit("89.160.20.1", "desktop", Some(FIREFOX_UA)))
        .await
        .unwrap();
    h.clock.advance(Duration::minutes(5));
    h.engine.track(visit("10.0.0.7", "tablet", None)).await.unwrap();

    let report = h.engine.resolve("today", "").await.unwrap();
    assert_eq!(report.total_visitations_count, 4);
    assert_eq!(report.results.len(), 4);
    assert_eq!(report.most_popular_country, "United Kingdom");
    assert_eq!(report.most_popular_device, "desktop");

    // Oldest first
    assert_eq!(report.results[0].ip_address, "81.2.69.1");
    assert_eq!(report.results[3].ip_address, "10.0.0.7");
    assert_eq!(report.results[3].origin_country, GeoLocation::UNKNOWN);

    let countries: Vec<(&str, i64)> = report
        .visitations_by_country
        .iter()
        .map(|c| (c.code.as_str(), c.count))
        .collect();
    assert_eq!(countries, vec![("GB", 2), ("SE", 1), ("unknown", 1)]);

    let browsers: Vec<(&str, i64)> = report
        .visitations_by_browser
        .iter()
        .map(|b| (b.browser.as_str(), b.count))
        .collect();
    assert_eq!(browsers, vec![("Firefox", 2), ("Chrome", 1)]);

    let device_total: i64 = report.visitations_by_device.iter().map(|d| d.count).sum();
    assert_eq!(device_total, 4);
}

#[tokio::test]
async fn test_windows_select_by_calendar_day() {
    let h = create_engine().await;

    // 2024-05-10
    h.clock.set(Utc.with_ymd_and_hms(2024, 5, 10, 9, 0, 0).unwrap());
    h.engine.track(visit("81.2.69.1", "desktop", None)).await.unwrap();
    // 2024-05-14
    h.clock.set(Utc.with_ymd_and_hms(2024, 5, 14, 23, 59, 59).unwrap());
    h.engine.track(visit("89.160.20.1", "mobile", None)).await.unwrap();
    // 2024-02-01
    h.clock.set(Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap());
    h.engine.track(visit("2.125.160.1", "desktop", None)).await.unwrap();

    h.clock.set(Utc.with_ymd_and_hms(2024, 5, 15, 12, 0, 0).unwrap());

    let today = h.engine.report(ReportWindow::Today).await.unwrap();
    assert_eq!(today.total_visitations_count, 0);
    assert!(today.results.is_empty());
    assert_eq!(today.most_popular_country, "");

    let yesterday = h.engine.report(ReportWindow::Yesterday).await.unwrap();
    assert_eq!(yesterday.total_visitations_count, 1);
    assert_eq!(yesterday.results[0].country_code, "SE");

    let week = h.engine.report(ReportWindow::Last7Days).await.unwrap();
    assert_eq!(week.total_visitations_count, 2);

    let quarter_two = h.engine.resolve("quarter", "2").await.unwrap();
    assert_eq!(quarter_two.total_visitations_count, 2);

    let quarter_one = h.engine.resolve("quarter", "1").await.unwrap();
    assert_eq!(quarter_one.total_visitations_count, 1);
    assert_eq!(quarter_one.most_popular_country, "Germany");

    let year = h.engine.report(ReportWindow::LastYear).await.unwrap();
    assert_eq!(year.total_visitations_count, 3);
}

#[tokio::test]
async fn test_invalid_selectors_are_rejected() {
    let h = create_engine().await;

    for (key, value) in [("quarter", "5"), ("quarter", ""), ("lastWeek", "")] {
        let result = h.engine.resolve(key, value).await;
        assert!(
            matches!(result, Err(AnalyticsError::InvalidParameter(_))),
            "{key}={value} should be rejected"
        );
    }
}

#[tokio::test]
async fn test_groupings_on_empty_database() {
    let h = create_engine().await;

    assert!(h.engine.by_country().await.unwrap().is_empty());
    assert!(h.engine.by_browser().await.unwrap().is_empty());
    assert!(h.engine.by_device().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_all_time_groupings() {
    let h = create_engine().await;

    h.engine
        .track(visit("89.160.20.1", "mobile", Some(CHROME_UA)))
        .await
        .unwrap();
    h.engine
        .track(visit("81.2.69.1", "desktop", Some(FIREFOX_UA)))
        .await
        .unwrap();
    h.clock.advance(Duration::days(1));
    h.engine
        .track(visit("81.2.69.1", "desktop", Some(FIREFOX_UA)))
        .await
        .unwrap();

    let countries = h.engine.by_country().await.unwrap();
    assert_eq!(countries[0].code, "GB");
    assert_eq!(countries[0].count, 2);
    assert_eq!(countries[1].code, "SE");

    let browsers = h.engine.by_browser().await.unwrap();
    assert_eq!(browsers[0].browser, "Firefox");
    assert_eq!(browsers[0].count, 2);

    let devices = h.engine.by_device().await.unwrap();
    assert_eq!(devices[0].device, "desktop");
    assert_eq!(devices[0].count, 2);
    assert_eq!(devices[1].device, "mobile");
}
