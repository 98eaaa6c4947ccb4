//! Integration tests for profile content and file uploads
//!
//! Service-level tests drive `ContentService` directly; the multipart tests
//! at the bottom go through the router so field names, content-type checks
//! and response shapes are covered too.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use chrono::Utc;
use folio::analytics::{AnalyticsEngine, GeoIpService, MockClock};
use folio::api::{create_router, AppState};
use folio::auth::{AuthService, TokenService, ADMINISTRATOR_ROLE, AUTH_HEADER};
use folio::config::{AnalyticsConfig, CorsConfig};
use folio::content::{ContentError, ContentService, ImageTarget};
use folio::metrics::Metrics;
use folio::models::JobsAndProjects;
use folio::object_store::MemoryObjectStore;
use folio::storage::{SqliteStorage, Storage};
use serde_json::{json, Value};
use std::io::Cursor;
use std::sync::Arc;
use tower::ServiceExt;

const CDN: &str = "https://cdn.example.com/folio";
const JWT_SECRET: &str = "content-test-secret";
const BOUNDARY: &str = "folio-test-boundary";

struct Harness {
    storage: Arc<dyn Storage>,
    objects: MemoryObjectStore,
    content: Arc<ContentService>,
    metrics: Arc<Metrics>,
}

async fn create_harness() -> Harness {
    let storage = SqliteStorage::new("sqlite::memory:", 1).await.unwrap();
    storage.init().await.unwrap();
    let storage: Arc<dyn Storage> = Arc::new(storage);

    let objects = MemoryObjectStore::new(CDN);
    let metrics = Arc::new(Metrics::default());
    let content = Arc::new(ContentService::new(
        storage.clone(),
        Arc::new(objects.clone()),
        metrics.clone(),
    ));

    Harness {
        storage,
        objects,
        content,
        metrics,
    }
}

fn create_app(h: &Harness) -> Router {
    let metrics = h.metrics.clone();
    let state = Arc::new(AppState {
        storage: h.storage.clone(),
        analytics: Arc::new(AnalyticsEngine::new(
            h.storage.clone(),
            Arc::new(GeoIpService::default()),
            Arc::new(MockClock::new(Utc::now())),
            metrics.clone(),
        )),
        content: h.content.clone(),
        auth: Arc::new(AuthService::new(
            TokenService::new(JWT_SECRET, 3600),
            h.storage.clone(),
            metrics.clone(),
        )),
        metrics,
        client_ip: AnalyticsConfig::default(),
        local_objects: Some(h.objects.clone()),
    });
    let cors = CorsConfig {
        allowed_origins: vec!["https://portfolio.example.com".to_string()],
    };
    create_router(state, &cors, 1024 * 1024)
}

async fn seed_jobs_and_projects(storage: &Arc<dyn Storage>) {
    storage
        .update_jobs_and_projects(&JobsAndProjects {
            jobs: vec![
                json!({ "company": "Acme", "role": "Engineer", "imgUrl": [] }),
                json!({ "company": "Globex", "role": "Lead", "imgUrl": ["https://old/globex.png"] }),
            ],
            projects: vec![
                json!({ "title": "Alpha", "imgUrl": ["https://old/alpha.png"] }),
                json!({ "title": "Beta", "stack": ["rust", "sqlx"], "imgUrl": [] }),
                json!({ "title": "Gamma", "imgUrl": [] }),
                json!({ "title": "Portfolio Site", "imgUrl": [] }),
            ],
        })
        .await
        .unwrap();
}

/// Tiny valid PNG of the given size
fn png(width: u32, height: u32) -> Vec<u8> {
    let mut bytes = Vec::new();
    image::RgbImage::new(width, height)
        .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
        .unwrap();
    bytes
}

fn key_of(url: &str) -> &str {
    url.strip_prefix(CDN).unwrap().trim_start_matches('/')
}

#[tokio::test]
async fn test_attach_image_patches_only_the_matching_project() {
    let h = create_harness().await;
    seed_jobs_and_projects(&h.storage).await;
    let before = h.storage.jobs_and_projects().await.unwrap();

    let img_url = h
        .content
        .attach_image(
            &ImageTarget::Project {
                title: "Beta".to_string(),
            },
            png(2, 2),
            "image/png",
        )
        .await
        .unwrap();

    let urls = img_url.as_array().unwrap();
    assert_eq!(urls.len(), 1);
    let url = urls[0].as_str().unwrap();
    assert!(url.starts_with(&format!("{}/project-Beta-", CDN)));
    assert!(h.objects.get(key_of(url)).is_some());

    let after = h.storage.jobs_and_projects().await.unwrap();
    let projects = &after.projects;
    assert_eq!(projects.len(), 4);
    assert_eq!(projects[0], before.projects[0]);
    assert_eq!(projects[2], before.projects[2]);
    assert_eq!(projects[1]["imgUrl"], img_url);
    assert_eq!(projects[1]["stack"], json!(["rust", "sqlx"]));
    assert_eq!(after.jobs, before.jobs);
}

#[tokio::test]
async fn test_attach_image_replaces_previous_job_images() {
    let h = create_harness().await;
    seed_jobs_and_projects(&h.storage).await;

    let img_url = h
        .content
        .attach_image(
            &ImageTarget::Job {
                company: "Globex".to_string(),
            },
            png(4, 4),
            "image/png",
        )
        .await
        .unwrap();

    let after = h.storage.jobs_and_projects().await.unwrap();
    assert_eq!(after.jobs[1]["imgUrl"], img_url);
    assert_eq!(after.jobs[1]["imgUrl"].as_array().unwrap().len(), 1);
    assert_eq!(after.jobs[0]["imgUrl"], json!([]));
}

#[tokio::test]
async fn test_attach_image_to_unknown_entry_uploads_nothing() {
    let h = create_harness().await;
    seed_jobs_and_projects(&h.storage).await;
    let before = h.storage.jobs_and_projects().await.unwrap();

    let result = h
        .content
        .attach_image(
            &ImageTarget::Project {
                title: "Delta".to_string(),
            },
            png(2, 2),
            "image/png",
        )
        .await;

    assert!(matches!(result, Err(ContentError::NotFound(_))));
    assert!(h.objects.is_empty());
    assert_eq!(h.storage.jobs_and_projects().await.unwrap(), before);
}

#[tokio::test]
async fn test_partner_upload_records_dimensions() {
    let h = create_harness().await;

    let first = h.content.upload_partner(png(12, 7), "image/png").await.unwrap();
    assert_eq!(first.len(), 1);
    assert_eq!(first[0]["width"], 12);
    assert_eq!(first[0]["height"], 7);

    let second = h.content.upload_partner(png(3, 30), "image/png").await.unwrap();
    assert_eq!(second.len(), 2);
    assert_eq!(second[0], first[0]);
    assert_eq!(second[1]["width"], 3);
    assert_eq!(second[1]["height"], 30);

    let url = second[1]["imgURL"].as_str().unwrap();
    let stored = h.objects.get(key_of(url)).unwrap();
    assert_eq!(stored.content_type, "image/png");

    let info = h.storage.basic_info().await.unwrap();
    assert_eq!(info.partners, second);
}

#[tokio::test]
async fn test_partner_upload_rejects_undecodable_images() {
    let h = create_harness().await;

    let result = h
        .content
        .upload_partner(b"definitely not a png".to_vec(), "image/png")
        .await;

    assert!(matches!(result, Err(ContentError::InvalidInput(_))));
    assert!(h.objects.is_empty());
}

#[tokio::test]
async fn test_carousel_upload_returns_every_url() {
    let h = create_harness().await;

    h.content.upload_carousel(png(1, 1), "image/png").await.unwrap();
    let carousel = h.content.upload_carousel(png(1, 1), "image/png").await.unwrap();

    assert_eq!(carousel.len(), 2);
    assert!(carousel
        .iter()
        .all(|url| url.as_str().unwrap().starts_with(&format!("{}/carousel-", CDN))));
    assert_eq!(h.objects.len(), 2);
}

#[tokio::test]
async fn test_cv_upload_sets_link_and_overwrites() {
    let h = create_harness().await;

    let first = h.content.upload_cv(b"%PDF-1.4 one".to_vec()).await.unwrap();
    let second = h.content.upload_cv(b"%PDF-1.4 two".to_vec()).await.unwrap();

    assert_eq!(first, format!("{}/cv", CDN));
    assert_eq!(first, second);
    assert_eq!(h.objects.len(), 1);
    assert_eq!(h.objects.get("cv").unwrap().bytes, b"%PDF-1.4 two".to_vec());
    assert_eq!(h.storage.basic_info().await.unwrap().cv_link, second);
    assert!(h.metrics.render_prometheus().contains("folio_uploads_total 2"));
}

#[tokio::test]
async fn test_delete_image_removes_object() {
    let h = create_harness().await;

    let carousel = h.content.upload_carousel(png(1, 1), "image/png").await.unwrap();
    let url = carousel[0].as_str().unwrap();
    h.content.delete_image(url).await.unwrap();
    assert!(h.objects.is_empty());

    let result = h.content.delete_image("  ").await;
    assert!(matches!(result, Err(ContentError::InvalidInput(_))));
}

#[tokio::test]
async fn test_image_for_title_with_spaces_deletes_by_stored_url() {
    let h = create_harness().await;
    seed_jobs_and_projects(&h.storage).await;

    let img_url = h
        .content
        .attach_image(
            &ImageTarget::Project {
                title: "Portfolio Site".to_string(),
            },
            png(2, 2),
            "image/png",
        )
        .await
        .unwrap();

    let stored = h.storage.jobs_and_projects().await.unwrap();
    assert_eq!(stored.projects[3]["imgUrl"], img_url);
    let url = img_url[0].as_str().unwrap().to_string();
    assert_eq!(img_url, json!([url]));
    assert!(url.starts_with(&format!("{}/project-Portfolio+Site-", CDN)));
    assert!(!url.contains(' '));
    assert_eq!(h.objects.len(), 1);

    h.content.delete_image(&url).await.unwrap();
    assert!(h.objects.is_empty());
}

/// One multipart part: field name, optional (filename, content type), bytes
type Part<'a> = (&'a str, Option<(&'a str, &'a str)>, &'a [u8]);

fn multipart_request(uri: &str, parts: &[Part<'_>]) -> Request<Body> {
    let mut body = Vec::new();
    for (name, file, data) in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match file {
            Some((filename, content_type)) => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                        name, filename, content_type
                    )
                    .as_bytes(),
                );
            }
            None => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name)
                        .as_bytes(),
                );
            }
        }
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());

    let token = TokenService::new(JWT_SECRET, 3600)
        .issue(ADMINISTRATOR_ROLE)
        .unwrap();
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .header(AUTH_HEADER, token)
        .body(Body::from(body))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_cv_endpoint_accepts_only_pdf() {
    let h = create_harness().await;
    let app = create_app(&h);

    let response = app
        .clone()
        .oneshot(multipart_request(
            "/files/cv",
            &[("file", Some(("cv.pdf", "application/pdf")), b"%PDF-1.7".as_slice())],
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(body_json(response).await, json!({ "cvLink": format!("{}/cv", CDN) }));

    let response = app
        .clone()
        .oneshot(multipart_request(
            "/files/cv",
            &[("file", Some(("cv.txt", "text/plain")), b"hello".as_slice())],
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await,
        json!({ "message": "provided file can only be of type pdf" })
    );

    let response = app
        .oneshot(multipart_request(
            "/files/cv",
            &[("document", Some(("cv.pdf", "application/pdf")), b"%PDF-1.7".as_slice())],
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await,
        json!({ "message": "the provided file should be with the name 'file'." })
    );
}

#[tokio::test]
async fn test_project_image_endpoint() {
    let h = create_harness().await;
    seed_jobs_and_projects(&h.storage).await;
    let app = create_app(&h);
    let image = png(2, 2);

    let response = app
        .clone()
        .oneshot(multipart_request(
            "/files/project-image",
            &[
                ("title", None, b"Gamma".as_slice()),
                ("file", Some(("shot.png", "image/png")), image.as_slice()),
            ],
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    let stored = h.storage.jobs_and_projects().await.unwrap();
    assert_eq!(stored.projects[2]["imgUrl"], body["imgUrl"]);

    let response = app
        .clone()
        .oneshot(multipart_request(
            "/files/project-image",
            &[
                ("title", None, b"Nope".as_slice()),
                ("file", Some(("shot.png", "image/png")), image.as_slice()),
            ],
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .oneshot(multipart_request(
            "/files/project-image",
            &[
                ("title", None, b"Gamma".as_slice()),
                ("file", Some(("shot.bmp", "image/bmp")), image.as_slice()),
            ],
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_upload_endpoints_require_a_token() {
    let h = create_harness().await;
    let app = create_app(&h);

    let mut request = multipart_request(
        "/files/carousel",
        &[("file", Some(("a.png", "image/png")), png(1, 1).as_slice())],
    );
    request.headers_mut().remove(AUTH_HEADER);

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(h.objects.is_empty());
}

#[tokio::test]
async fn test_partner_and_carousel_endpoints() {
    let h = create_harness().await;
    let app = create_app(&h);

    let response = app
        .clone()
        .oneshot(multipart_request(
            "/files/partners",
            &[("file", Some(("logo.png", "image/png")), png(5, 9).as_slice())],
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    assert_eq!(body["partners"][0]["width"], 5);
    assert_eq!(body["partners"][0]["height"], 9);

    let response = app
        .clone()
        .oneshot(multipart_request(
            "/files/carousel",
            &[("file", Some(("slide.png", "image/png")), png(1, 1).as_slice())],
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    let url = body["carousel"][0].as_str().unwrap().to_string();

    let token = TokenService::new(JWT_SECRET, 3600)
        .issue(ADMINISTRATOR_ROLE)
        .unwrap();
    let response = app
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/files/image")
                .header(header::CONTENT_TYPE, "application/json")
                .header(AUTH_HEADER, token)
                .body(Body::from(json!({ "imageURL": url }).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(h.objects.len(), 1);
}

#[tokio::test]
async fn test_in_memory_uploads_are_served() {
    let h = create_harness().await;
    seed_jobs_and_projects(&h.storage).await;
    let app = create_app(&h);

    let img_url = h
        .content
        .attach_image(
            &ImageTarget::Project {
                title: "Portfolio Site".to_string(),
            },
            png(3, 3),
            "image/png",
        )
        .await
        .unwrap();
    let url = img_url[0].as_str().unwrap();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/objects/{}", key_of(url)))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "image/png");
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(bytes.to_vec(), png(3, 3));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/objects/carousel-missing")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
