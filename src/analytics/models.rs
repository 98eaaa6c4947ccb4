//! Data models for visit analytics

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Country name and ISO code resolved from a client IP
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeoLocation {
    pub country_name: String,
    pub country_code: String,
}

impl GeoLocation {
    pub const UNKNOWN: &'static str = "unknown";

    pub fn unknown() -> Self {
        Self {
            country_name: Self::UNKNOWN.to_string(),
            country_code: Self::UNKNOWN.to_string(),
        }
    }
}

impl Default for GeoLocation {
    fn default() -> Self {
        Self::unknown()
    }
}

/// One recorded visit, as stored in the `analytics` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct VisitEvent {
    #[serde(rename = "date")]
    #[sqlx(rename = "date_time")]
    pub timestamp: NaiveDateTime,
    pub device_type: String,
    pub origin_country: String,
    pub country_code: String,
    pub ip_address: String,
    pub referer: Option<String>,
    pub browser: Option<String>,
}

/// A visit about to be inserted
#[derive(Debug, Clone)]
pub struct NewVisit {
    /// Second-granularity UTC timestamp
    pub timestamp: NaiveDateTime,
    pub device_type: String,
    pub geo: GeoLocation,
    pub ip_address: String,
    pub referer: Option<String>,
    pub browser: Option<String>,
}

impl NewVisit {
    /// The calendar day the visit is deduplicated on
    pub fn visit_day(&self) -> NaiveDate {
        self.timestamp.date()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct CountryCount {
    pub country: String,
    pub code: String,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct BrowserCount {
    pub browser: String,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct DeviceCount {
    pub device: String,
    pub count: i64,
}

/// Whether a tracking call wrote a new row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackOutcome {
    Recorded,
    /// The IP already has a visit on this day
    Duplicate,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn visit_event_serializes_with_public_keys() {
        let event = VisitEvent {
            timestamp: NaiveDate::from_ymd_opt(2024, 5, 1)
                .unwrap()
                .and_hms_opt(10, 30, 0)
                .unwrap(),
            device_type: "mobile".into(),
            origin_country: "Bulgaria".into(),
            country_code: "BG".into(),
            ip_address: "203.0.113.7".into(),
            referer: None,
            browser: Some("Firefox".into()),
        };

        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["date"], "2024-05-01T10:30:00");
        assert_eq!(value["deviceType"], "mobile");
        assert_eq!(value["originCountry"], "Bulgaria");
        assert_eq!(value["countryCode"], "BG");
        assert_eq!(value["ipAddress"], "203.0.113.7");
        assert!(value["referer"].is_null());
        assert_eq!(value["browser"], "Firefox");
    }
}
