pub mod analytics;
pub mod error;
pub mod files;
pub mod handlers;
pub mod routes;

use std::sync::Arc;

use crate::analytics::AnalyticsEngine;
use crate::auth::AuthService;
use crate::config::AnalyticsConfig;
use crate::content::ContentService;
use crate::metrics::Metrics;
use crate::object_store::MemoryObjectStore;
use crate::storage::Storage;

pub use error::ApiError;
pub use routes::create_router;

/// Shared state handed to every handler
pub struct AppState {
    pub storage: Arc<dyn Storage>,
    pub analytics: Arc<AnalyticsEngine>,
    pub content: Arc<ContentService>,
    pub auth: Arc<AuthService>,
    pub metrics: Arc<Metrics>,
    /// Proxy trust settings used to recover the visitor's address
    pub client_ip: AnalyticsConfig,
    /// Set when uploads live in memory; `GET /objects/*` serves them
    pub local_objects: Option<MemoryObjectStore>,
}
