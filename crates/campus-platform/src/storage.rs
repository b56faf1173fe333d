//! Content storage service

use crate::{Grant, PlatformResult};
use async_trait::async_trait;

/// Bucket creation flags.
#[derive(Debug, Clone)]
pub struct BucketOptions {
    /// Per-file permission checks instead of bucket-level only.
    pub file_security: bool,
    /// Whether the bucket accepts operations.
    pub enabled: bool,
    /// Encrypt file contents at rest.
    pub encryption: bool,
    /// Scan uploads for malware.
    pub antivirus: bool,
}

impl Default for BucketOptions {
    fn default() -> Self {
        Self {
            file_security: false,
            enabled: true,
            encryption: false,
            antivirus: false,
        }
    }
}

/// Reference to an uploaded file.
#[derive(Debug, Clone)]
pub struct FileRef {
    /// Platform-assigned file id.
    pub id: String,
}

/// Content storage API of the remote platform.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Create a bucket with its grants and file-extension allow-list.
    /// 409 if it already exists.
    async fn create_bucket(
        &self,
        bucket_id: &str,
        name: &str,
        permissions: &[Grant],
        options: &BucketOptions,
        allowed_extensions: &[String],
    ) -> PlatformResult<()>;

    /// Delete a bucket and its files.
    async fn delete_bucket(&self, bucket_id: &str) -> PlatformResult<()>;

    /// Upload a file into a bucket.
    async fn create_file(
        &self,
        bucket_id: &str,
        file_id: &str,
        name: &str,
        contents: Vec<u8>,
    ) -> PlatformResult<FileRef>;

    /// Delete one file.
    async fn delete_file(&self, bucket_id: &str, file_id: &str) -> PlatformResult<()>;
}
