use crate::content::patch;
use crate::metrics::Metrics;
use crate::models::{BasicInfo, JobsAndProjects, Partner, Skills, Socials};
use crate::object_store::{ObjectStore, ObjectStoreError};
use crate::storage::{ProfileCollection, Storage, StorageError};
use image::ImageReader;
use serde_json::{json, Value};
use std::io::Cursor;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

pub const CV_KEY: &str = "cv";
pub const PDF_CONTENT_TYPE: &str = "application/pdf";

#[derive(Debug, Error)]
pub enum ContentError {
    #[error("{0}")]
    InvalidInput(String),
    #[error("{0}")]
    NotFound(String),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    ObjectStore(#[from] ObjectStoreError),
}

/// Job or project entry an uploaded image belongs to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageTarget {
    Project { title: String },
    Job { company: String },
}

impl ImageTarget {
    fn collection(&self) -> ProfileCollection {
        match self {
            ImageTarget::Project { .. } => ProfileCollection::Projects,
            ImageTarget::Job { .. } => ProfileCollection::Jobs,
        }
    }

    fn match_field(&self) -> &'static str {
        match self {
            ImageTarget::Project { .. } => "title",
            ImageTarget::Job { .. } => "company",
        }
    }

    fn match_value(&self) -> &str {
        match self {
            ImageTarget::Project { title } => title,
            ImageTarget::Job { company } => company,
        }
    }

    /// Spaces stay in the key; a literal `+` would read back as a space from
    /// the stored URL, so it becomes `-`.
    fn object_key(&self) -> String {
        let prefix = match self {
            ImageTarget::Project { .. } => "project",
            ImageTarget::Job { .. } => "job",
        };
        format!(
            "{}-{}-{}",
            prefix,
            self.match_value().replace('+', "-"),
            Uuid::new_v4()
        )
    }
}

pub struct ContentService {
    storage: Arc<dyn Storage>,
    objects: Arc<dyn ObjectStore>,
    metrics: Arc<Metrics>,
}

impl ContentService {
    pub fn new(
        storage: Arc<dyn Storage>,
        objects: Arc<dyn ObjectStore>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            storage,
            objects,
            metrics,
        }
    }

    pub async fn basic_info(&self) -> Result<BasicInfo, ContentError> {
        or_default(self.storage.basic_info().await)
    }

    pub async fn update_basic_info(&self, info: &BasicInfo) -> Result<BasicInfo, ContentError> {
        Ok(self.storage.update_basic_info(info).await?)
    }

    pub async fn skills(&self) -> Result<Skills, ContentError> {
        or_default(self.storage.skills().await)
    }

    pub async fn update_skills(&self, skills: &Skills) -> Result<Skills, ContentError> {
        Ok(self.storage.update_skills(skills).await?)
    }

    pub async fn jobs_and_projects(&self) -> Result<JobsAndProjects, ContentError> {
        or_default(self.storage.jobs_and_projects().await)
    }

    pub async fn update_jobs_and_projects(
        &self,
        content: &JobsAndProjects,
    ) -> Result<JobsAndProjects, ContentError> {
        Ok(self.storage.update_jobs_and_projects(content).await?)
    }

    pub async fn socials(&self) -> Result<Socials, ContentError> {
        or_default(self.storage.socials().await)
    }

    pub async fn update_socials(&self, socials: &Socials) -> Result<Socials, ContentError> {
        Ok(self.storage.update_socials(socials).await?)
    }

    /// Store the CV at its fixed key and point `cvLink` at it.
    pub async fn upload_cv(&self, bytes: Vec<u8>) -> Result<String, ContentError> {
        let url = self.upload(CV_KEY, bytes, PDF_CONTENT_TYPE).await?;
        self.storage.set_cv_link(&url).await?;
        info!(%url, "CV uploaded");
        Ok(url)
    }

    /// Upload an image and make it the only image of the matching job or project.
    /// Returns the entry's `imgUrl` as stored.
    pub async fn attach_image(
        &self,
        target: &ImageTarget,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<Value, ContentError> {
        let field = target.match_field();
        let value = target.match_value();
        if value.trim().is_empty() {
            return Err(ContentError::InvalidInput(format!(
                "the '{}' field is required",
                field
            )));
        }

        let kind = target.collection();
        let not_found = || {
            ContentError::NotFound(format!(
                "no {} found with {} '{}'",
                kind.column(),
                field,
                value
            ))
        };

        let current = self.storage.collection(kind).await?;
        if !patch::contains(&current, field, value) {
            return Err(not_found());
        }

        let url = self.upload(&target.object_key(), bytes, content_type).await?;

        let apply = |items: Vec<Value>| patch::attach_image(items, field, value, &url);
        let Some(stored) = self.storage.patch_collection(kind, &apply).await? else {
            // Entry vanished between the check and the write
            self.discard(&url).await;
            return Err(not_found());
        };

        info!(collection = kind.column(), %value, %url, "Image attached");
        Ok(patch::images_for(&stored, field, value).unwrap_or(Value::Array(Vec::new())))
    }

    /// Upload a partner logo and append it with its pixel dimensions.
    /// Returns the whole `partners` array.
    pub async fn upload_partner(
        &self,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<Vec<Value>, ContentError> {
        let (width, height) = image_dimensions(&bytes)?;
        let url = self
            .upload(&format!("partner-{}", Uuid::new_v4()), bytes, content_type)
            .await?;

        let partner = Partner {
            img_url: url,
            width,
            height,
        };
        let entry = serde_json::to_value(&partner)
            .map_err(|e| ContentError::Storage(StorageError::Other(e.into())))?;

        let append = |items: Vec<Value>| Some(patch::append_unique(items, &entry));
        let partners = self
            .storage
            .patch_collection(ProfileCollection::Partners, &append)
            .await?
            .unwrap_or_default();

        info!(url = %partner.img_url, width, height, "Partner image uploaded");
        Ok(partners)
    }

    /// Upload a carousel image and return every carousel image URL.
    pub async fn upload_carousel(
        &self,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<Vec<Value>, ContentError> {
        let url = self
            .upload(&format!("carousel-{}", Uuid::new_v4()), bytes, content_type)
            .await?;

        let entry = json!({ "imgURL": url });
        let append = |items: Vec<Value>| Some(patch::append_unique(items, &entry));
        let carousel = self
            .storage
            .patch_collection(ProfileCollection::Carousel, &append)
            .await?
            .unwrap_or_default();

        info!(%url, "Carousel image uploaded");
        Ok(carousel
            .iter()
            .filter_map(|item| item.get(patch::ENTRY_URL_FIELD).cloned())
            .collect())
    }

    pub async fn delete_image(&self, image_url: &str) -> Result<(), ContentError> {
        if image_url.trim().is_empty() {
            return Err(ContentError::InvalidInput("imageURL is required".to_string()));
        }
        self.objects.delete(image_url).await?;
        info!(url = %image_url, "Image deleted");
        Ok(())
    }

    async fn upload(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, ContentError> {
        match self.objects.put(key, bytes, content_type).await {
            Ok(url) => {
                self.metrics.record_upload();
                Ok(url)
            }
            Err(e) => {
                self.metrics.record_upload_failure();
                Err(e.into())
            }
        }
    }

    async fn discard(&self, url: &str) {
        if let Err(e) = self.objects.delete(url).await {
            warn!(%url, error = %e, "Failed to remove orphaned upload");
        }
    }
}

fn or_default<T: Default>(result: Result<T, StorageError>) -> Result<T, ContentError> {
    match result {
        Err(StorageError::NotFound) => Ok(T::default()),
        other => Ok(other?),
    }
}

/// Pixel width and height of an encoded image
pub fn image_dimensions(bytes: &[u8]) -> Result<(u32, u32), ContentError> {
    ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| ContentError::InvalidInput(format!("unreadable image: {}", e)))?
        .into_dimensions()
        .map_err(|e| ContentError::InvalidInput(format!("unreadable image: {}", e)))
}
