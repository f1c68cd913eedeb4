//! Media upload pass-through.
//!
//! Cover images, author photos, and e-book files are not stored locally;
//! they stream through to a blob host and only the resulting URL is kept in
//! the catalog tables. The host is opaque behind [`BlobStore`].

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::info;
use ulid::Ulid;

/// Resource class the host should treat the bytes as. E-book files and
/// plain text go up as raw blobs so the host serves them unmodified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Raw,
}

impl MediaKind {
    #[must_use]
    pub fn resource_type(self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Raw => "raw",
        }
    }
}

/// Stored blob handle returned to API clients.
#[derive(Debug, Clone)]
pub struct StoredBlob {
    pub url: String,
    pub public_id: String,
}

/// Blob host abstraction.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Upload bytes into `folder` and return the public URL and host id.
    async fn store(
        &self,
        bytes: Vec<u8>,
        file_name: &str,
        folder: &str,
        kind: MediaKind,
    ) -> Result<StoredBlob>;
}

/// Cloudinary unsigned upload client.
pub struct CloudinaryStore {
    client: Client,
    cloud_name: String,
    upload_preset: String,
}

#[derive(Deserialize)]
struct CloudinaryUploadResponse {
    secure_url: String,
    public_id: String,
}

impl CloudinaryStore {
    /// # Errors
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(cloud_name: String, upload_preset: String, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(crate::APP_USER_AGENT)
            .build()
            .context("Failed to build Cloudinary HTTP client")?;

        Ok(Self {
            client,
            cloud_name,
            upload_preset,
        })
    }

    fn upload_url(&self, kind: MediaKind) -> String {
        format!(
            "https://api.cloudinary.com/v1_1/{}/{}/upload",
            self.cloud_name,
            kind.resource_type()
        )
    }
}

#[async_trait]
impl BlobStore for CloudinaryStore {
    async fn store(
        &self,
        bytes: Vec<u8>,
        file_name: &str,
        folder: &str,
        kind: MediaKind,
    ) -> Result<StoredBlob> {
        let form = Form::new()
            .text("upload_preset", self.upload_preset.clone())
            .text("folder", folder.to_string())
            .part("file", Part::bytes(bytes).file_name(file_name.to_string()));

        let response = self
            .client
            .post(self.upload_url(kind))
            .multipart(form)
            .send()
            .await
            .context("Cloudinary upload request failed")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("Cloudinary upload rejected: {status} - {body}"));
        }

        let upload: CloudinaryUploadResponse = response
            .json()
            .await
            .context("Failed to decode Cloudinary upload response")?;

        Ok(StoredBlob {
            url: upload.secure_url,
            public_id: upload.public_id,
        })
    }
}

/// Local dev store that logs the upload and fabricates a handle.
#[derive(Clone, Debug)]
pub struct LogBlobStore;

#[async_trait]
impl BlobStore for LogBlobStore {
    async fn store(
        &self,
        bytes: Vec<u8>,
        file_name: &str,
        folder: &str,
        kind: MediaKind,
    ) -> Result<StoredBlob> {
        let public_id = format!("{folder}/{}", Ulid::new());
        info!(
            file_name = %file_name,
            folder = %folder,
            kind = kind.resource_type(),
            size = bytes.len(),
            "blob store stub"
        );
        Ok(StoredBlob {
            url: format!("log://{public_id}"),
            public_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn media_kind_maps_to_cloudinary_resource_types() {
        assert_eq!(MediaKind::Image.resource_type(), "image");
        assert_eq!(MediaKind::Raw.resource_type(), "raw");
    }

    #[tokio::test]
    async fn log_store_returns_a_handle() -> Result<()> {
        let blob = LogBlobStore
            .store(vec![1, 2, 3], "cover.png", "ebook_images", MediaKind::Image)
            .await?;
        assert!(blob.url.starts_with("log://ebook_images/"));
        assert!(blob.public_id.starts_with("ebook_images/"));
        Ok(())
    }
}
