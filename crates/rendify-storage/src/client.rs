//! S3 client implementation.

use std::path::Path;

use aws_config::SdkConfig;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use tracing::{debug, info};

use crate::error::{StorageError, StorageResult};

/// Configuration for the storage client.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Bucket holding both `input/` sources and `output/` renditions
    pub bucket: String,
}

impl StorageConfig {
    /// Create config from environment variables.
    pub fn from_env() -> StorageResult<Self> {
        Ok(Self {
            bucket: std::env::var("S3_BUCKET")
                .map_err(|_| StorageError::config_error("S3_BUCKET not set"))?,
        })
    }
}

/// S3 storage client.
#[derive(Clone)]
pub struct StorageClient {
    client: Client,
    bucket: String,
}

impl StorageClient {
    /// Create a new storage client from a shared SDK config.
    pub fn new(sdk_config: &SdkConfig, config: StorageConfig) -> Self {
        Self {
            client: Client::new(sdk_config),
            bucket: config.bucket,
        }
    }

    /// The bucket this client operates on.
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Upload a file.
    ///
    /// Puts overwrite unconditionally, so re-running a job against the same
    /// deterministic key is safe.
    pub async fn upload_file(
        &self,
        path: impl AsRef<Path>,
        key: &str,
        content_type: &str,
    ) -> StorageResult<()> {
        let path = path.as_ref();
        debug!("Uploading {} to s3://{}/{}", path.display(), self.bucket, key);

        let body = ByteStream::from_path(path)
            .await
            .map_err(|e| StorageError::upload_failed(e.to_string()))?;

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(body)
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| StorageError::upload_failed(e.to_string()))?;

        info!("Uploaded {} to s3://{}/{}", path.display(), self.bucket, key);
        Ok(())
    }

    /// Download an object to a file.
    pub async fn download_file(&self, key: &str, path: impl AsRef<Path>) -> StorageResult<()> {
        let path = path.as_ref();
        debug!("Downloading s3://{}/{} to {}", self.bucket, key, path.display());

        let response = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                if e.to_string().contains("NoSuchKey") {
                    StorageError::not_found(key)
                } else {
                    StorageError::download_failed(e.to_string())
                }
            })?;

        let bytes = response
            .body
            .collect()
            .await
            .map_err(|e| StorageError::download_failed(e.to_string()))?
            .into_bytes();

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                StorageError::download_failed(format!("Failed to create directory: {}", e))
            })?;
        }

        tokio::fs::write(path, bytes)
            .await
            .map_err(|e| StorageError::download_failed(format!("Failed to write file: {}", e)))?;

        info!("Downloaded s3://{}/{} to {}", self.bucket, key, path.display());
        Ok(())
    }
}
