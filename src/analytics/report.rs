//! Aggregation of a window's visits into the report returned by `/analytics`.

use crate::analytics::models::{BrowserCount, CountryCount, DeviceCount, VisitEvent};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsReport {
    pub results: Vec<VisitEvent>,
    pub total_visitations_count: usize,
    pub most_popular_country: String,
    pub most_popular_device: String,
    pub visitations_by_country: Vec<CountryCount>,
    pub visitations_by_browser: Vec<BrowserCount>,
    pub visitations_by_device: Vec<DeviceCount>,
}

impl AnalyticsReport {
    /// Builds the report from visits already ordered oldest first.
    pub fn from_visits(results: Vec<VisitEvent>) -> Self {
        let by_country = tally(
            results
                .iter()
                .map(|v| (v.origin_country.clone(), v.country_code.clone())),
        );
        let by_device = tally(results.iter().map(|v| v.device_type.clone()));
        let by_browser = tally(
            results
                .iter()
                .filter_map(|v| v.browser.clone())
                .filter(|b| !b.is_empty()),
        );

        let most_popular_country = by_country
            .first()
            .map(|((country, _), _)| country.clone())
            .unwrap_or_default();
        let most_popular_device = by_device
            .first()
            .map(|(device, _)| device.clone())
            .unwrap_or_default();

        Self {
            total_visitations_count: results.len(),
            results,
            most_popular_country,
            most_popular_device,
            visitations_by_country: by_country
                .into_iter()
                .map(|((country, code), count)| CountryCount {
                    country,
                    code,
                    count,
                })
                .collect(),
            visitations_by_browser: by_browser
                .into_iter()
                .map(|(browser, count)| BrowserCount { browser, count })
                .collect(),
            visitations_by_device: by_device
                .into_iter()
                .map(|(device, count)| DeviceCount { device, count })
                .collect(),
        }
    }
}

/// Counts occurrences, most frequent first; equal counts keep first-seen order.
fn tally<K: PartialEq>(items: impl Iterator<Item = K>) -> Vec<(K, i64)> {
    let mut counts: Vec<(K, i64)> = Vec::new();
    for item in items {
        match counts.iter_mut().find(|(key, _)| *key == item) {
            Some((_, count)) => *count += 1,
            None => counts.push((item, 1)),
        }
    }
    // sort_by is stable
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn visit(minute: u32, country: &str, device: &str, browser: Option<&str>) -> VisitEvent {
        VisitEvent {
            timestamp: NaiveDate::from_ymd_opt(2024, 1, 10)
                .unwrap()
                .and_hms_opt(12, minute, 0)
                .unwrap(),
            device_type: device.to_string(),
            origin_country: country.to_string(),
            country_code: country[..2].to_uppercase(),
            ip_address: format!("10.0.0.{minute}"),
            referer: None,
            browser: browser.map(str::to_string),
        }
    }

    #[test]
    fn empty_window_yields_empty_report() {
        let report = AnalyticsReport::from_visits(Vec::new());
        assert_eq!(report.total_visitations_count, 0);
        assert_eq!(report.most_popular_country, "");
        assert_eq!(report.most_popular_device, "");

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["results"], serde_json::json!([]));
        assert_eq!(json["visitationsByCountry"], serde_json::json!([]));
    }

    #[test]
    fn groupings_are_descending_and_sum_to_total() {
        let report = AnalyticsReport::from_visits(vec![
            visit(1, "Germany", "desktop", Some("Chrome")),
            visit(2, "France", "mobile", Some("Firefox")),
            visit(3, "France", "mobile", None),
            visit(4, "France", "desktop", Some("Chrome")),
            visit(5, "Germany", "mobile", Some("")),
        ]);

        assert_eq!(report.total_visitations_count, 5);
        assert_eq!(report.most_popular_country, "France");
        assert_eq!(report.most_popular_device, "mobile");

        let countries: Vec<_> = report
            .visitations_by_country
            .iter()
            .map(|c| (c.country.as_str(), c.code.as_str(), c.count))
            .collect();
        assert_eq!(countries, vec![("France", "FR", 3), ("Germany", "GE", 2)]);

        let device_total: i64 = report.visitations_by_device.iter().map(|d| d.count).sum();
        assert_eq!(device_total, 5);

        // Null and empty browsers are not grouped
        let browsers: Vec<_> = report
            .visitations_by_browser
            .iter()
            .map(|b| (b.browser.as_str(), b.count))
            .collect();
        assert_eq!(browsers, vec![("Chrome", 2), ("Firefox", 1)]);
    }

    #[test]
    fn ties_go_to_the_first_value_seen() {
        let report = AnalyticsReport::from_visits(vec![
            visit(1, "Spain", "tablet", None),
            visit(2, "Italy", "desktop", None),
        ]);

        assert_eq!(report.most_popular_country, "Spain");
        assert_eq!(report.most_popular_device, "tablet");
        assert_eq!(report.visitations_by_country[1].country, "Italy");
    }
}
