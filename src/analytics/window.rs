//! Report windows selected by the `/analytics` query parameter.

use crate::analytics::AnalyticsError;
use chrono::{Datelike, Days, Months, NaiveDate};

pub const UNKNOWN_SELECTOR: &str = "no param was found matching your criteria";
pub const INVALID_QUARTER: &str =
    "the provided quarter param should be in format quarter=number where number is from 1 to 4";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportWindow {
    Today,
    Yesterday,
    /// `[today - 7 days, today + 7 days]`
    Last7Days,
    /// `[today - 1 month, today + 1 month]`
    Last30Days,
    /// `[today - 3 months, today + 3 months]`
    Last90Days,
    /// `[today - 12 months, today + 12 months]`
    LastYear,
    /// Calendar quarter 1..=4 of the current year
    Quarter(u8),
}

impl ReportWindow {
    /// Maps a selector key and its (possibly empty) value onto a window.
    pub fn parse(key: &str, value: &str) -> Result<Self, AnalyticsError> {
        let window = match key {
            "today" => ReportWindow::Today,
            "yesterday" => ReportWindow::Yesterday,
            "last7days" => ReportWindow::Last7Days,
            "last30days" => ReportWindow::Last30Days,
            "last90days" => ReportWindow::Last90Days,
            "lastYear" => ReportWindow::LastYear,
            "quarter" => match value.trim().parse::<u8>() {
                Ok(q @ 1..=4) => ReportWindow::Quarter(q),
                _ => return Err(AnalyticsError::InvalidParameter(INVALID_QUARTER.to_string())),
            },
            _ => return Err(AnalyticsError::InvalidParameter(UNKNOWN_SELECTOR.to_string())),
        };
        Ok(window)
    }

    /// Inclusive day range relative to `today`.
    pub fn bounds(self, today: NaiveDate) -> (NaiveDate, NaiveDate) {
        match self {
            ReportWindow::Today => (today, today),
            ReportWindow::Yesterday => {
                let day = today.pred_opt().unwrap_or(today);
                (day, day)
            }
            ReportWindow::Last7Days => (
                today.checked_sub_days(Days::new(7)).unwrap_or(NaiveDate::MIN),
                today.checked_add_days(Days::new(7)).unwrap_or(NaiveDate::MAX),
            ),
            ReportWindow::Last30Days => symmetric_months(today, 1),
            ReportWindow::Last90Days => symmetric_months(today, 3),
            ReportWindow::LastYear => symmetric_months(today, 12),
            ReportWindow::Quarter(q) => quarter_bounds(today.year(), q),
        }
    }
}

fn symmetric_months(today: NaiveDate, months: u32) -> (NaiveDate, NaiveDate) {
    (
        today
            .checked_sub_months(Months::new(months))
            .unwrap_or(NaiveDate::MIN),
        today
            .checked_add_months(Months::new(months))
            .unwrap_or(NaiveDate::MAX),
    )
}

fn quarter_bounds(year: i32, quarter: u8) -> (NaiveDate, NaiveDate) {
    let first_month = u32::from(quarter.clamp(1, 4) - 1) * 3 + 1;
    let start = NaiveDate::from_ymd_opt(year, first_month, 1).unwrap_or(NaiveDate::MIN);
    // Day before the first day of the next quarter
    let end = start
        .checked_add_months(Months::new(3))
        .and_then(|next| next.pred_opt())
        .unwrap_or(NaiveDate::MAX);
    (start, end)
}
