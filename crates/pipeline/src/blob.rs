//! Artifact blob storage.
//!
//! [`BlobStore`] is the upload seam; [`S3BlobStore`] writes finished PNGs
//! to an S3 bucket fronted by a public base URL (CDN or website
//! endpoint). Keys are content-addressed under the owning workspace and
//! quote so redeliveries never collide.

use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use uuid::Uuid;

use quoteframe_core::types::DbId;

/// Errors from blob uploads.
#[derive(Debug, thiserror::Error)]
pub enum BlobError {
    #[error("Blob upload failed: {0}")]
    Upload(String),
}

/// Where finished artifacts go.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Upload PNG bytes; returns the public URL.
    async fn upload(
        &self,
        bytes: &[u8],
        workspace_id: DbId,
        quote_id: DbId,
    ) -> Result<String, BlobError>;
}

/// S3-backed blob store.
pub struct S3BlobStore {
    client: aws_sdk_s3::Client,
    bucket: String,
    /// Public root under which uploaded keys are reachable, no trailing slash.
    public_base_url: String,
}

impl S3BlobStore {
    pub fn new(
        client: aws_sdk_s3::Client,
        bucket: impl Into<String>,
        public_base_url: impl Into<String>,
    ) -> Self {
        let public_base_url = public_base_url.into();
        Self {
            client,
            bucket: bucket.into(),
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Build a store from the ambient AWS environment configuration.
    pub async fn from_env(bucket: impl Into<String>, public_base_url: impl Into<String>) -> Self {
        let config = aws_config::load_from_env().await;
        Self::new(aws_sdk_s3::Client::new(&config), bucket, public_base_url)
    }

    fn object_key(workspace_id: DbId, quote_id: DbId) -> String {
        format!("artifacts/{workspace_id}/{quote_id}/{}.png", Uuid::new_v4())
    }
}

#[async_trait]
impl BlobStore for S3BlobStore {
    async fn upload(
        &self,
        bytes: &[u8],
        workspace_id: DbId,
        quote_id: DbId,
    ) -> Result<String, BlobError> {
        let key = Self::object_key(workspace_id, quote_id);

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .content_type("image/png")
            .body(ByteStream::from(bytes.to_vec()))
            .send()
            .await
            .map_err(|e| BlobError::Upload(e.to_string()))?;

        tracing::debug!(key = %key, size = bytes.len(), "Uploaded artifact");
        Ok(format!("{}/{key}", self.public_base_url))
    }
}
