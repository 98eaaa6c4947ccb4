//! Object storage for uploaded files

pub mod memory;
pub mod s3;
pub mod sigv4;

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

pub use memory::MemoryObjectStore;
pub use s3::S3ObjectStore;

/// Budget for a single upload or delete; failures are not retried
pub const TRANSFER_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Error)]
pub enum ObjectStoreError {
    #[error("upload failed: {0}")]
    UploadFailed(String),
    #[error("delete failed: {0}")]
    DeleteFailed(String),
    #[error("object store request timed out")]
    Timeout,
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store `bytes` under `key` and return the object's public URL
    async fn put(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, ObjectStoreError>;

    /// Delete by public URL or by bare key
    async fn delete(&self, url_or_key: &str) -> Result<(), ObjectStoreError>;

    fn base_url(&self) -> &str;

    fn public_url(&self, key: &str) -> String {
        format!("{}/{}", self.base_url().trim_end_matches('/'), key)
    }
}

/// Key part of a public URL; input that does not start with `base_url` is taken as a key.
///
/// Stored image URLs carry `+` for every space in the key, the way S3 reads a
/// public path, so `+` maps back to a space here.
pub fn key_from_url(base_url: &str, url_or_key: &str) -> String {
    let base = base_url.trim_end_matches('/');
    url_or_key
        .strip_prefix(base)
        .and_then(|rest| rest.strip_prefix('/'))
        .unwrap_or(url_or_key)
        .replace('+', " ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_base_url_from_public_links() {
        let base = "https://cdn.example.com/folio/";
        assert_eq!(
            key_from_url(base, "https://cdn.example.com/folio/partner-123"),
            "partner-123"
        );
        assert_eq!(key_from_url(base, "carousel-9"), "carousel-9");
        assert_eq!(
            key_from_url(base, "https://elsewhere.example.com/x"),
            "https://elsewhere.example.com/x"
        );
    }

    #[test]
    fn plus_in_a_public_link_is_a_space_in_the_key() {
        let base = "https://cdn.example.com/folio";
        assert_eq!(
            key_from_url(base, "https://cdn.example.com/folio/project-Portfolio+Site-1"),
            "project-Portfolio Site-1"
        );
        assert_eq!(key_from_url(base, "job-Big Co-2"), "job-Big Co-2");
    }
}
