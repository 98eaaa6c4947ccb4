use crate::analytics::models::{BrowserCount, CountryCount, DeviceCount, NewVisit, VisitEvent};
use crate::models::{BasicInfo, JobsAndProjects, Skills, Socials};
use crate::retry::{retry, RetryPolicy};
use crate::storage::{
    CollectionPatch, ProfileCollection, Storage, StorageError, StorageResult,
};
use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

const ATTEMPT_TIMEOUT: Duration = Duration::from_secs(2);
const PING_TIMEOUT: Duration = Duration::from_secs(3);

/// Storage wrapper that bounds every call with a timeout and retries transient
/// failures with exponential backoff
pub struct RetryingStorage {
    inner: Arc<dyn Storage>,
    policy: RetryPolicy,
    attempt_timeout: Duration,
}

impl RetryingStorage {
    pub fn new(inner: Arc<dyn Storage>, policy: RetryPolicy) -> Self {
        Self {
            inner,
            policy,
            attempt_timeout: ATTEMPT_TIMEOUT,
        }
    }

    pub fn with_attempt_timeout(mut self, attempt_timeout: Duration) -> Self {
        self.attempt_timeout = attempt_timeout;
        self
    }

    async fn run<T, F, Fut>(&self, operation: &'static str, mut call: F) -> StorageResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = StorageResult<T>>,
    {
        let timeout = self.attempt_timeout;
        retry(
            &self.policy,
            operation,
            || {
                let attempt = call();
                async move {
                    tokio::time::timeout(timeout, attempt)
                        .await
                        .unwrap_or(Err(StorageError::Timeout))
                }
            },
            StorageError::is_transient,
        )
        .await
    }
}

#[async_trait]
impl Storage for RetryingStorage {
    async fn init(&self) -> Result<()> {
        self.inner.init().await
    }

    async fn ping(&self) -> StorageResult<()> {
        tokio::time::timeout(PING_TIMEOUT, self.inner.ping())
            .await
            .unwrap_or(Err(StorageError::Timeout))
    }

    async fn insert_visit_if_absent(&self, visit: &NewVisit) -> StorageResult<bool> {
        self.run("insert_visit_if_absent", || {
            self.inner.insert_visit_if_absent(visit)
        })
        .await
    }

    async fn visits_between(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> StorageResult<Vec<VisitEvent>> {
        self.run("visits_between", || self.inner.visits_between(start, end))
            .await
    }

    async fn count_visits_on(&self, day: NaiveDate) -> StorageResult<i64> {
        self.run("count_visits_on", || self.inner.count_visits_on(day))
            .await
    }

    async fn visits_by_country(&self) -> StorageResult<Vec<CountryCount>> {
        self.run("visits_by_country", || self.inner.visits_by_country())
            .await
    }

    async fn visits_by_browser(&self) -> StorageResult<Vec<BrowserCount>> {
        self.run("visits_by_browser", || self.inner.visits_by_browser())
            .await
    }

    async fn visits_by_device(&self) -> StorageResult<Vec<DeviceCount>> {
        self.run("visits_by_device", || self.inner.visits_by_device())
            .await
    }

    async fn basic_info(&self) -> StorageResult<BasicInfo> {
        self.run("basic_info", || self.inner.basic_info()).await
    }

    async fn update_basic_info(&self, info: &BasicInfo) -> StorageResult<BasicInfo> {
        self.run("update_basic_info", || self.inner.update_basic_info(info))
            .await
    }

    async fn skills(&self) -> StorageResult<Skills> {
        self.run("skills", || self.inner.skills()).await
    }

    async fn update_skills(&self, skills: &Skills) -> StorageResult<Skills> {
        self.run("update_skills", || self.inner.update_skills(skills))
            .await
    }

    async fn jobs_and_projects(&self) -> StorageResult<JobsAndProjects> {
        self.run("jobs_and_projects", || self.inner.jobs_and_projects())
            .await
    }

    async fn update_jobs_and_projects(
        &self,
        content: &JobsAndProjects,
    ) -> StorageResult<JobsAndProjects> {
        self.run("update_jobs_and_projects", || {
            self.inner.update_jobs_and_projects(content)
        })
        .await
    }

    async fn socials(&self) -> StorageResult<Socials> {
        self.run("socials", || self.inner.socials()).await
    }

    async fn update_socials(&self, socials: &Socials) -> StorageResult<Socials> {
        self.run("update_socials", || self.inner.update_socials(socials))
            .await
    }

    async fn set_cv_link(&self, link: &str) -> StorageResult<()> {
        self.run("set_cv_link", || self.inner.set_cv_link(link)).await
    }

    async fn collection(&self, kind: ProfileCollection) -> StorageResult<Vec<Value>> {
        self.run("collection", || self.inner.collection(kind)).await
    }

    async fn patch_collection(
        &self,
        kind: ProfileCollection,
        patch: CollectionPatch<'_>,
    ) -> StorageResult<Option<Vec<Value>>> {
        self.run("patch_collection", || {
            self.inner.patch_collection(kind, patch)
        })
        .await
    }

    async fn credentials(&self, username: &str) -> StorageResult<Option<(String, String)>> {
        self.run("credentials", || self.inner.credentials(username))
            .await
    }

    async fn set_credentials(&self, username: &str, password_hash: &str) -> StorageResult<()> {
        self.run("set_credentials", || {
            self.inner.set_credentials(username, password_hash)
        })
        .await
    }
}
