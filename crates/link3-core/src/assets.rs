//! Image upload
//!
//! Images go to content-addressed storage before the hub or link that uses
//! them is saved. The uploader returns the content reference to store in
//! `image_ref`. An upload failure never aborts the save; callers keep the
//! previous reference instead.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use thiserror::Error;
use tracing::debug;

/// Errors from the upload pipeline
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AssetError {
    #[error("Image upload is not configured")]
    NotConfigured,

    #[error("Image upload failed: {0}")]
    Upload(String),

    #[error("Upload service returned an empty reference")]
    EmptyReference,
}

/// Turns raw image bytes into a content reference
#[async_trait]
pub trait AssetUploader: Send + Sync {
    async fn upload_image(&self, bytes: Vec<u8>) -> Result<String, AssetError>;
}

/// Uploader used when no upload service is configured
#[derive(Debug, Clone, Copy, Default)]
pub struct NoUploader;

#[async_trait]
impl AssetUploader for NoUploader {
    async fn upload_image(&self, _bytes: Vec<u8>) -> Result<String, AssetError> {
        Err(AssetError::NotConfigured)
    }
}

/// Multipart upload to an HTTP endpoint (`file` form field)
pub struct HttpUploader {
    client: Client,
    url: String,
}

impl HttpUploader {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, AssetError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AssetError::Upload(e.to_string()))?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl AssetUploader for HttpUploader {
    async fn upload_image(&self, bytes: Vec<u8>) -> Result<String, AssetError> {
        debug!("Uploading image ({} bytes) to {}", bytes.len(), self.url);

        let part = Part::bytes(bytes).file_name("image");
        let form = Form::new().part("file", part);

        let response = self
            .client
            .post(&self.url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| AssetError::Upload(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AssetError::Upload(format!("upload service returned {}", status)));
        }

        let body = response
            .text()
            .await
            .map_err(|e| AssetError::Upload(e.to_string()))?;

        // The service answers with the bare reference, sometimes JSON-quoted
        let reference = body.trim().trim_matches('"').to_string();
        if reference.is_empty() {
            return Err(AssetError::EmptyReference);
        }
        Ok(reference)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const CID: &str = "QmUtLVS6EiS93sAFPpPXX8hEM4Gw1T3FTr7YWb2hMM7uhz";

    #[tokio::test]
    async fn test_upload_returns_reference() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/file"))
            .respond_with(ResponseTemplate::new(200).set_body_string(format!("\"{}\"", CID)))
            .mount(&server)
            .await;

        let uploader =
            HttpUploader::new(format!("{}/api/file", server.uri()), Duration::from_secs(2))
                .unwrap();
        let reference = uploader.upload_image(vec![0x89, 0x50, 0x4e, 0x47]).await.unwrap();
        assert_eq!(reference, CID);
    }

    #[tokio::test]
    async fn test_upload_failure_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let uploader = HttpUploader::new(server.uri(), Duration::from_secs(2)).unwrap();
        let err = uploader.upload_image(vec![1, 2, 3]).await.unwrap_err();
        assert!(matches!(err, AssetError::Upload(_)));
    }

    #[tokio::test]
    async fn test_empty_reference() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("  "))
            .mount(&server)
            .await;

        let uploader = HttpUploader::new(server.uri(), Duration::from_secs(2)).unwrap();
        assert_eq!(
            uploader.upload_image(vec![1]).await,
            Err(AssetError::EmptyReference)
        );
    }

    #[tokio::test]
    async fn test_no_uploader() {
        assert_eq!(
            NoUploader.upload_image(vec![1]).await,
            Err(AssetError::NotConfigured)
        );
    }
}
