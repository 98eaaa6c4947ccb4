//! Visit analytics
//!
//! Tracking records at most one visit per client IP per UTC day; reports
//! aggregate the visits that fall inside a [`ReportWindow`].

pub mod clock;
pub mod engine;
pub mod geoip;
pub mod ip_extractor;
pub mod models;
pub mod report;
pub mod user_agent;
pub mod window;

pub use clock::{Clock, MockClock, SystemClock};
pub use engine::{AnalyticsEngine, AnalyticsError, TrackRequest};
pub use geoip::{GeoIpService, GeoLookup};
pub use ip_extractor::extract_client_ip;
pub use models::{GeoLocation, TrackOutcome, VisitEvent};
pub use report::AnalyticsReport;
pub use window::ReportWindow;
