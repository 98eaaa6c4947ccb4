//! Upload endpoints under `/files`

use axum::{
    extract::{multipart::MultipartError, rejection::JsonRejection, Multipart, Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;

use crate::api::error::ApiError;
use crate::api::AppState;
use crate::content::service::PDF_CONTENT_TYPE;
use crate::content::ImageTarget;
use crate::object_store::{key_from_url, ObjectStore};

pub const IMAGE_CONTENT_TYPES: [&str; 5] = [
    "image/jpeg",
    "image/jpg",
    "image/png",
    "image/gif",
    "image/webp",
];

const MISSING_FILE: &str = "the provided file should be with the name 'file'.";
const NOT_A_PDF: &str = "provided file can only be of type pdf";
const NOT_AN_IMAGE: &str = "provided file can only be an image of type jpeg, jpg, png, gif or webp";

#[derive(Debug)]
pub struct UploadedFile {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

#[derive(Debug, Deserialize)]
pub struct DeleteImageRequest {
    #[serde(rename = "imageURL")]
    pub image_url: String,
}

struct UploadForm {
    file: Option<UploadedFile>,
    fields: HashMap<String, String>,
}

impl UploadForm {
    async fn read(mut multipart: Multipart) -> Result<Self, ApiError> {
        let mut file = None;
        let mut fields = HashMap::new();

        while let Some(field) = multipart.next_field().await.map_err(bad_multipart)? {
            let name = field.name().unwrap_or_default().to_string();
            if name == "file" {
                let content_type = field.content_type().unwrap_or_default().to_string();
                let bytes = field.bytes().await.map_err(bad_multipart)?.to_vec();
                file = Some(UploadedFile {
                    bytes,
                    content_type,
                });
            } else {
                let text = field.text().await.map_err(bad_multipart)?;
                fields.insert(name, text);
            }
        }

        Ok(Self { file, fields })
    }

    fn file(&mut self) -> Result<UploadedFile, ApiError> {
        self.file
            .take()
            .ok_or_else(|| ApiError::InvalidParameter(MISSING_FILE.to_string()))
    }

    fn image(&mut self) -> Result<UploadedFile, ApiError> {
        let file = self.file()?;
        if !IMAGE_CONTENT_TYPES.contains(&file.content_type.to_ascii_lowercase().as_str()) {
            return Err(ApiError::InvalidParameter(NOT_AN_IMAGE.to_string()));
        }
        Ok(file)
    }

    fn required_field(&mut self, name: &str) -> Result<String, ApiError> {
        self.fields
            .remove(name)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .ok_or_else(|| ApiError::InvalidParameter(format!("the '{}' field is required", name)))
    }
}

fn bad_multipart(err: MultipartError) -> ApiError {
    ApiError::InvalidParameter(err.body_text())
}

/// `POST /files/cv`
pub async fn upload_cv(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let file = UploadForm::read(multipart).await?.file()?;
    if file.content_type != PDF_CONTENT_TYPE {
        return Err(ApiError::InvalidParameter(NOT_A_PDF.to_string()));
    }

    let link = state.content.upload_cv(file.bytes).await?;
    Ok((StatusCode::CREATED, Json(json!({ "cvLink": link }))))
}

/// `POST /files/project-image` with `file` and `title`
pub async fn upload_project_image(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let mut form = UploadForm::read(multipart).await?;
    let file = form.image()?;
    let target = ImageTarget::Project {
        title: form.required_field("title")?,
    };

    let images = state
        .content
        .attach_image(&target, file.bytes, &file.content_type)
        .await?;
    Ok((StatusCode::CREATED, Json(json!({ "imgUrl": images }))))
}

/// `POST /files/job-image` with `file` and `company`
pub async fn upload_job_image(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let mut form = UploadForm::read(multipart).await?;
    let file = form.image()?;
    let target = ImageTarget::Job {
        company: form.required_field("company")?,
    };

    let images = state
        .content
        .attach_image(&target, file.bytes, &file.content_type)
        .await?;
    Ok((StatusCode::CREATED, Json(json!({ "imgUrl": images }))))
}

/// `POST /files/partners`
pub async fn upload_partner(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let file = UploadForm::read(multipart).await?.image()?;
    let partners = state
        .content
        .upload_partner(file.bytes, &file.content_type)
        .await?;
    Ok((StatusCode::CREATED, Json(json!({ "partners": partners }))))
}

/// `POST /files/carousel`
pub async fn upload_carousel(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let file = UploadForm::read(multipart).await?.image()?;
    let carousel = state
        .content
        .upload_carousel(file.bytes, &file.content_type)
        .await?;
    Ok((StatusCode::CREATED, Json(json!({ "carousel": carousel }))))
}

/// `DELETE /files/image` with `{"imageURL": ...}`
pub async fn delete_image(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<DeleteImageRequest>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    let Json(request) = payload.map_err(|rejection| {
        ApiError::InvalidParameter(rejection.body_text())
    })?;

    state.content.delete_image(&request.image_url).await?;
    Ok(StatusCode::OK)
}

/// `GET /objects/{*key}`, serving uploads held by the in-memory store
pub async fn get_object(
    State(state): State<Arc<AppState>>,
    Path(path): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let not_found = || ApiError::NotFound("object not found".to_string());
    let store = state.local_objects.as_ref().ok_or_else(not_found)?;
    let object = store
        .get(&key_from_url(store.base_url(), &path))
        .ok_or_else(not_found)?;

    Ok(([(header::CONTENT_TYPE, object.content_type)], object.bytes))
}
