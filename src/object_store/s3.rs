use crate::config::S3Config;
use crate::object_store::sigv4::{self, CanonicalRequest, Credentials};
use crate::object_store::{key_from_url, ObjectStore, ObjectStoreError, TRANSFER_TIMEOUT};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, Method};
use tracing::{debug, error};

/// S3-compatible store speaking the REST API directly.
///
/// Without a custom endpoint requests go to the AWS virtual-host address
/// `https://{bucket}.s3.{region}.amazonaws.com/{key}`; with one they use
/// path-style addressing `{endpoint}/{bucket}/{key}`.
pub struct S3ObjectStore {
    client: Client,
    config: S3Config,
    public_base_url: String,
}

struct Target {
    url: String,
    host: String,
    canonical_uri: String,
}

impl S3ObjectStore {
    pub fn new(config: S3Config, public_base_url: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(TRANSFER_TIMEOUT)
            .build()
            .context("Failed to build S3 HTTP client")?;

        Ok(Self {
            client,
            config,
            public_base_url,
        })
    }

    fn object_key(&self, key: &str) -> String {
        let prefix = self.config.key_prefix.trim_matches('/');
        if prefix.is_empty() {
            key.to_string()
        } else {
            format!("{}/{}", prefix, key)
        }
    }

    fn target(&self, object_key: &str) -> Target {
        let encoded = sigv4::encode_key(object_key);
        match self.config.endpoint.as_deref() {
            Some(endpoint) => {
                let endpoint = endpoint.trim_end_matches('/');
                let host = endpoint
                    .split_once("://")
                    .map(|(_, rest)| rest)
                    .unwrap_or(endpoint)
                    .to_string();
                let canonical_uri = format!("/{}/{}", self.config.bucket, encoded);
                Target {
                    url: format!("{}{}", endpoint, canonical_uri),
                    host,
                    canonical_uri,
                }
            }
            None => {
                let host = format!("{}.s3.{}.amazonaws.com", self.config.bucket, self.config.region);
                let canonical_uri = format!("/{}", encoded);
                Target {
                    url: format!("https://{}{}", host, canonical_uri),
                    host,
                    canonical_uri,
                }
            }
        }
    }

    fn signed_request(
        &self,
        method: Method,
        object_key: &str,
        body: Vec<u8>,
        content_type: Option<&str>,
    ) -> Result<reqwest::RequestBuilder> {
        let target = self.target(object_key);
        let now = Utc::now();
        let amz_date = sigv4::amz_date(now);
        let payload_sha256 = sigv4::hex_sha256(&body);

        let mut headers: Vec<(&str, &str)> = vec![
            ("host", target.host.as_str()),
            ("x-amz-content-sha256", payload_sha256.as_str()),
            ("x-amz-date", amz_date.as_str()),
        ];
        if let Some(content_type) = content_type {
            headers.push(("content-type", content_type));
        }
        if method == Method::PUT {
            if let Some(acl) = self.config.acl.as_deref() {
                headers.push(("x-amz-acl", acl));
            }
        }

        let authorization = sigv4::authorization(
            &CanonicalRequest {
                method: method.as_str(),
                uri: &target.canonical_uri,
                query: "",
                headers: &headers,
                payload_sha256: &payload_sha256,
            },
            &Credentials {
                access_key_id: &self.config.access_key_id,
                secret_access_key: &self.config.secret_access_key,
                region: &self.config.region,
                service: "s3",
            },
            now,
        )?;

        let mut builder = self
            .client
            .request(method, &target.url)
            .header("authorization", authorization);
        // reqwest derives Host from the URL
        for (name, value) in headers.iter().filter(|(name, _)| *name != "host") {
            builder = builder.header(*name, *value);
        }
        Ok(builder.body(body))
    }
}

fn transfer_error(err: reqwest::Error, wrap: fn(String) -> ObjectStoreError) -> ObjectStoreError {
    if err.is_timeout() {
        ObjectStoreError::Timeout
    } else {
        wrap(err.to_string())
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn put(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, ObjectStoreError> {
        let object_key = self.object_key(key);
        let size = bytes.len();

        let request = self
            .signed_request(Method::PUT, &object_key, bytes, Some(content_type))
            .map_err(|e| ObjectStoreError::UploadFailed(e.to_string()))?;

        let response = request
            .send()
            .await
            .map_err(|e| transfer_error(e, ObjectStoreError::UploadFailed))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            error!(%status, key = %object_key, body = %text, "S3 rejected upload");
            return Err(ObjectStoreError::UploadFailed(format!(
                "S3 returned {}",
                status
            )));
        }

        debug!(key = %object_key, size, "Uploaded object");
        Ok(self.public_url(key))
    }

    async fn delete(&self, url_or_key: &str) -> Result<(), ObjectStoreError> {
        let object_key = self.object_key(&key_from_url(&self.public_base_url, url_or_key));

        let request = self
            .signed_request(Method::DELETE, &object_key, Vec::new(), None)
            .map_err(|e| ObjectStoreError::DeleteFailed(e.to_string()))?;

        let response = request
            .send()
            .await
            .map_err(|e| transfer_error(e, ObjectStoreError::DeleteFailed))?;

        if !response.status().is_success() {
            let status = response.status();
            error!(%status, key = %object_key, "S3 rejected delete");
            return Err(ObjectStoreError::DeleteFailed(format!(
                "S3 returned {}",
                status
            )));
        }

        debug!(key = %object_key, "Deleted object");
        Ok(())
    }

    fn base_url(&self) -> &str {
        &self.public_base_url
    }
}
