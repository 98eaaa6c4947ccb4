use crate::analytics::models::{BrowserCount, CountryCount, DeviceCount, NewVisit, VisitEvent};
use crate::models::{BasicInfo, JobsAndProjects, Skills, Socials};
use crate::storage::{
    CollectionPatch, ProfileCollection, Storage, StorageError, StorageResult,
};
use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::Value;
use sqlx::postgres::PgPoolOptions;
use sqlx::types::Json;
use sqlx::PgPool;
use std::sync::Arc;

pub struct PostgresStorage {
    pool: Arc<PgPool>,
}

impl PostgresStorage {
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self {
            pool: Arc::new(pool),
        })
    }
}

#[async_trait]
impl Storage for PostgresStorage {
    async fn init(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS analytics (
                id BIGSERIAL PRIMARY KEY,
                date_time TIMESTAMP NOT NULL,
                visit_day DATE NOT NULL,
                device_type TEXT NOT NULL,
                origin_country TEXT NOT NULL,
                country_code TEXT NOT NULL,
                ip_address TEXT NOT NULL,
                referer TEXT,
                browser TEXT,
                UNIQUE (ip_address, visit_day)
            )
            "#,
        )
        .execute(self.pool.as_ref())
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_analytics_visit_day ON analytics(visit_day)")
            .execute(self.pool.as_ref())
            .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                nickname TEXT,
                password TEXT,
                email TEXT NOT NULL DEFAULT '',
                cv_link TEXT NOT NULL DEFAULT '',
                about_me TEXT NOT NULL DEFAULT '',
                partners JSONB NOT NULL DEFAULT '[]',
                carousel JSONB NOT NULL DEFAULT '[]',
                tech_stack JSONB NOT NULL DEFAULT '[]',
                soft_skills JSONB NOT NULL DEFAULT '[]',
                hobbies JSONB NOT NULL DEFAULT '[]',
                jobs JSONB NOT NULL DEFAULT '[]',
                projects JSONB NOT NULL DEFAULT '[]',
                social_media JSONB NOT NULL DEFAULT '[]'
            )
            "#,
        )
        .execute(self.pool.as_ref())
        .await?;

        sqlx::query("INSERT INTO users (id) VALUES (1) ON CONFLICT (id) DO NOTHING")
            .execute(self.pool.as_ref())
            .await?;

        Ok(())
    }

    async fn ping(&self) -> StorageResult<()> {
        sqlx::query("SELECT 1").execute(self.pool.as_ref()).await?;
        Ok(())
    }

    async fn insert_visit_if_absent(&self, visit: &NewVisit) -> StorageResult<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO analytics
                (date_time, visit_day, device_type, origin_country, country_code, ip_address, referer, browser)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (ip_address, visit_day) DO NOTHING
            "#,
        )
        .bind(visit.timestamp)
        .bind(visit.visit_day())
        .bind(&visit.device_type)
        .bind(&visit.geo.country_name)
        .bind(&visit.geo.country_code)
        .bind(&visit.ip_address)
        .bind(visit.referer.as_deref())
        .bind(visit.browser.as_deref())
        .execute(self.pool.as_ref())
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn visits_between(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> StorageResult<Vec<VisitEvent>> {
        let visits = sqlx::query_as::<_, VisitEvent>(
            r#"
            SELECT date_time, device_type, origin_country, country_code, ip_address, referer, browser
            FROM analytics
            WHERE visit_day BETWEEN $1 AND $2
            ORDER BY date_time ASC, id ASC
            "#,
        )
        .bind(start)
        .bind(end)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(visits)
    }

    async fn count_visits_on(&self, day: NaiveDate) -> StorageResult<i64> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM analytics WHERE visit_day = $1")
            .bind(day)
            .fetch_one(self.pool.as_ref())
            .await?;

        Ok(count.0)
    }

    async fn visits_by_country(&self) -> StorageResult<Vec<CountryCount>> {
        let rows = sqlx::query_as::<_, CountryCount>(
            r#"
            SELECT origin_country AS country, country_code AS code, COUNT(*) AS count
            FROM analytics
            GROUP BY origin_country, country_code
            ORDER BY count DESC, MIN(id) ASC
            "#,
        )
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(rows)
    }

    async fn visits_by_browser(&self) -> StorageResult<Vec<BrowserCount>> {
        let rows = sqlx::query_as::<_, BrowserCount>(
            r#"
            SELECT browser, COUNT(*) AS count
            FROM analytics
            WHERE browser IS NOT NULL AND browser <> ''
            GROUP BY browser
            ORDER BY count DESC, MIN(id) ASC
            "#,
        )
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(rows)
    }

    async fn visits_by_device(&self) -> StorageResult<Vec<DeviceCount>> {
        let rows = sqlx::query_as::<_, DeviceCount>(
            r#"
            SELECT device_type AS device, COUNT(*) AS count
            FROM analytics
            GROUP BY device_type
            ORDER BY count DESC, MIN(id) ASC
            "#,
        )
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(rows)
    }

    async fn basic_info(&self) -> StorageResult<BasicInfo> {
        sqlx::query_as::<_, BasicInfo>(
            "SELECT email, cv_link, about_me, partners, carousel FROM users WHERE id = 1",
        )
        .fetch_optional(self.pool.as_ref())
        .await?
        .ok_or(StorageError::NotFound)
    }

    async fn update_basic_info(&self, info: &BasicInfo) -> StorageResult<BasicInfo> {
        sqlx::query_as::<_, BasicInfo>(
            r#"
            UPDATE users
            SET email = $1, cv_link = $2, about_me = $3, partners = $4, carousel = $5
            WHERE id = 1
            RETURNING email, cv_link, about_me, partners, carousel
            "#,
        )
        .bind(&info.email)
        .bind(&info.cv_link)
        .bind(&info.about_me)
        .bind(Json(&info.partners))
        .bind(Json(&info.carousel))
        .fetch_optional(self.pool.as_ref())
        .await?
        .ok_or(StorageError::NotFound)
    }

    async fn skills(&self) -> StorageResult<Skills> {
        sqlx::query_as::<_, Skills>(
            "SELECT tech_stack, soft_skills, hobbies FROM users WHERE id = 1",
        )
        .fetch_optional(self.pool.as_ref())
        .await?
        .ok_or(StorageError::NotFound)
    }

    async fn update_skills(&self, skills: &Skills) -> StorageResult<Skills> {
        sqlx::query_as::<_, Skills>(
            r#"
            UPDATE users
            SET tech_stack = $1, soft_skills = $2, hobbies = $3
            WHERE id = 1
            RETURNING tech_stack, soft_skills, hobbies
            "#,
        )
        .bind(Json(&skills.tech_stack))
        .bind(Json(&skills.soft_skills))
        .bind(Json(&skills.hobbies))
        .fetch_optional(self.pool.as_ref())
        .await?
        .ok_or(StorageError::NotFound)
    }

    async fn jobs_and_projects(&self) -> StorageResult<JobsAndProjects> {
        sqlx::query_as::<_, JobsAndProjects>("SELECT jobs, projects FROM users WHERE id = 1")
            .fetch_optional(self.pool.as_ref())
            .await?
            .ok_or(StorageError::NotFound)
    }

    async fn update_jobs_and_projects(
        &self,
        content: &JobsAndProjects,
    ) -> StorageResult<JobsAndProjects> {
        sqlx::query_as::<_, JobsAndProjects>(
            r#"
            UPDATE users
            SET jobs = $1, projects = $2
            WHERE id = 1
            RETURNING jobs, projects
            "#,
        )
        .bind(Json(&content.jobs))
        .bind(Json(&content.projects))
        .fetch_optional(self.pool.as_ref())
        .await?
        .ok_or(StorageError::NotFound)
    }

    async fn socials(&self) -> StorageResult<Socials> {
        sqlx::query_as::<_, Socials>("SELECT social_media FROM users WHERE id = 1")
            .fetch_optional(self.pool.as_ref())
            .await?
            .ok_or(StorageError::NotFound)
    }

    async fn update_socials(&self, socials: &Socials) -> StorageResult<Socials> {
        sqlx::query_as::<_, Socials>(
            "UPDATE users SET social_media = $1 WHERE id = 1 RETURNING social_media",
        )
        .bind(Json(&socials.social_media))
        .fetch_optional(self.pool.as_ref())
        .await?
        .ok_or(StorageError::NotFound)
    }

    async fn set_cv_link(&self, link: &str) -> StorageResult<()> {
        let result = sqlx::query("UPDATE users SET cv_link = $1 WHERE id = 1")
            .bind(link)
            .execute(self.pool.as_ref())
            .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }

    async fn collection(&self, kind: ProfileCollection) -> StorageResult<Vec<Value>> {
        let query = format!("SELECT {} FROM users WHERE id = 1", kind.column());
        let items = sqlx::query_scalar::<_, Json<Vec<Value>>>(&query)
            .fetch_optional(self.pool.as_ref())
            .await?
            .ok_or(StorageError::NotFound)?;

        Ok(items.0)
    }

    async fn patch_collection(
        &self,
        kind: ProfileCollection,
        patch: CollectionPatch<'_>,
    ) -> StorageResult<Option<Vec<Value>>> {
        let mut tx = self.pool.begin().await?;

        let select = format!(
            "SELECT {} FROM users WHERE id = 1 FOR UPDATE",
            kind.column()
        );
        let current = sqlx::query_scalar::<_, Json<Vec<Value>>>(&select)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(StorageError::NotFound)?;

        let Some(patched) = patch(current.0) else {
            tx.rollback().await?;
            return Ok(None);
        };

        let update = format!("UPDATE users SET {} = $1 WHERE id = 1", kind.column());
        sqlx::query(&update)
            .bind(Json(&patched))
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(Some(patched))
    }

    async fn credentials(&self, username: &str) -> StorageResult<Option<(String, String)>> {
        let row = sqlx::query_as::<_, (String, String)>(
            r#"
            SELECT nickname, password
            FROM users
            WHERE nickname = $1 AND password IS NOT NULL
            "#,
        )
        .bind(username)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(row)
    }

    async fn set_credentials(&self, username: &str, password_hash: &str) -> StorageResult<()> {
        let result = sqlx::query("UPDATE users SET nickname = $1, password = $2 WHERE id = 1")
            .bind(username)
            .bind(password_hash)
            .execute(self.pool.as_ref())
            .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }
}
