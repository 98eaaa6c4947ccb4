use crate::analytics::models::{BrowserCount, CountryCount, DeviceCount, NewVisit, VisitEvent};
use crate::models::{BasicInfo, JobsAndProjects, Skills, Socials};
use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("record not found")]
    NotFound,
    #[error("storage operation timed out")]
    Timeout,
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl StorageError {
    /// Errors worth another attempt: I/O, pool exhaustion, timeouts and lock contention.
    pub fn is_transient(&self) -> bool {
        match self {
            StorageError::Timeout => true,
            StorageError::Database(sqlx::Error::Io(_))
            | StorageError::Database(sqlx::Error::PoolTimedOut) => true,
            StorageError::Database(sqlx::Error::Database(db)) => {
                let code = db.code().unwrap_or_default();
                let message = db.message().to_ascii_lowercase();
                // SQLITE_BUSY / SQLITE_LOCKED, serialization_failure / deadlock_detected
                matches!(&*code, "5" | "6" | "40001" | "40P01")
                    || message.contains("database is locked")
            }
            _ => false,
        }
    }
}

pub type StorageResult<T> = Result<T, StorageError>;

/// JSON-array columns of the profile record that uploads append to or patch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileCollection {
    Partners,
    Carousel,
    Jobs,
    Projects,
}

impl ProfileCollection {
    pub fn column(self) -> &'static str {
        match self {
            ProfileCollection::Partners => "partners",
            ProfileCollection::Carousel => "carousel",
            ProfileCollection::Jobs => "jobs",
            ProfileCollection::Projects => "projects",
        }
    }
}

/// Transformation applied to a collection inside a transaction.
/// Returning `None` aborts without writing.
pub type CollectionPatch<'a> = &'a (dyn Fn(Vec<Value>) -> Option<Vec<Value>> + Send + Sync);

#[async_trait]
pub trait Storage: Send + Sync {
    /// Create tables and the singleton profile row
    async fn init(&self) -> Result<()>;

    async fn ping(&self) -> StorageResult<()>;

    /// Insert a visit unless the IP already has one on the same day.
    /// Returns `true` when a row was written.
    async fn insert_visit_if_absent(&self, visit: &NewVisit) -> StorageResult<bool>;

    /// Visits whose day falls in `[start, end]`, oldest first
    async fn visits_between(&self, start: NaiveDate, end: NaiveDate)
        -> StorageResult<Vec<VisitEvent>>;

    async fn count_visits_on(&self, day: NaiveDate) -> StorageResult<i64>;

    async fn visits_by_country(&self) -> StorageResult<Vec<CountryCount>>;

    async fn visits_by_browser(&self) -> StorageResult<Vec<BrowserCount>>;

    async fn visits_by_device(&self) -> StorageResult<Vec<DeviceCount>>;

    async fn basic_info(&self) -> StorageResult<BasicInfo>;

    async fn update_basic_info(&self, info: &BasicInfo) -> StorageResult<BasicInfo>;

    async fn skills(&self) -> StorageResult<Skills>;

    async fn update_skills(&self, skills: &Skills) -> StorageResult<Skills>;

    async fn jobs_and_projects(&self) -> StorageResult<JobsAndProjects>;

    async fn update_jobs_and_projects(
        &self,
        content: &JobsAndProjects,
    ) -> StorageResult<JobsAndProjects>;

    async fn socials(&self) -> StorageResult<Socials>;

    async fn update_socials(&self, socials: &Socials) -> StorageResult<Socials>;

    async fn set_cv_link(&self, link: &str) -> StorageResult<()>;

    async fn collection(&self, kind: ProfileCollection) -> StorageResult<Vec<Value>>;

    /// Load, transform and store one collection on a single transaction.
    /// Returns the stored array, or `None` when the patch declined to write.
    async fn patch_collection(
        &self,
        kind: ProfileCollection,
        patch: CollectionPatch<'_>,
    ) -> StorageResult<Option<Vec<Value>>>;

    /// Nickname and bcrypt hash for a login name
    async fn credentials(&self, username: &str) -> StorageResult<Option<(String, String)>>;

    async fn set_credentials(&self, username: &str, password_hash: &str) -> StorageResult<()>;
}
