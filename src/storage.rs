//! Object storage for booking documents
//!
//! Uploaded ID proofs and customer photos are pushed to durable storage
//! before a booking is written; only the returned public URL is kept on
//! the record. Two backends exist: Cloudinary's unsigned upload API and
//! a local directory served by the app itself under `/uploads`.

use std::io;
use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rand::{distr::Alphanumeric, Rng};
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use thiserror::Error;

use crate::config::CloudinaryConfig;
use crate::validation::Attachment;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("storage I/O failed: {0}")]
    Io(#[from] io::Error),

    #[error("storage rejected the upload: {0}")]
    Rejected(String),
}

/// Destination for uploaded files
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Stores `attachment` under `key` and returns its public URL
    async fn upload(&self, key: &str, attachment: &Attachment) -> Result<String, StorageError>;
}

/// What an uploaded document is for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadPurpose {
    IdProof,
    UserPhoto,
}

impl UploadPurpose {
    pub fn as_str(self) -> &'static str {
        match self {
            UploadPurpose::IdProof => "id_proof",
            UploadPurpose::UserPhoto => "user_photo",
        }
    }
}

/// Builds the storage key for a customer's document
///
/// Format: `bookings/<name-slug>_<purpose>_<unix-millis>_<4 random chars>`.
/// The slug keeps only lowercase ASCII alphanumerics, joined by `-`.
pub fn upload_key(full_name: &str, purpose: UploadPurpose, at: DateTime<Utc>) -> String {
    let slug = full_name
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|part| !part.is_empty())
        .map(str::to_ascii_lowercase)
        .collect::<Vec<_>>()
        .join("-");
    let slug = if slug.is_empty() { "customer".to_string() } else { slug };

    let suffix: String = rand::rng()
        .sample_iter(&Alphanumeric)
        .take(4)
        .map(char::from)
        .collect();

    format!(
        "bookings/{}_{}_{}_{}",
        slug,
        purpose.as_str(),
        at.timestamp_millis(),
        suffix.to_ascii_lowercase()
    )
}

/// Uploads through Cloudinary's unsigned upload endpoint
#[derive(Debug, Clone)]
pub struct CloudinaryStorage {
    http: reqwest::Client,
    config: CloudinaryConfig,
}

#[derive(Deserialize)]
struct CloudinaryResponse {
    secure_url: String,
}

impl CloudinaryStorage {
    pub fn new(http: reqwest::Client, config: CloudinaryConfig) -> Self {
        Self { http, config }
    }
}

#[async_trait]
impl ObjectStorage for CloudinaryStorage {
    async fn upload(&self, key: &str, attachment: &Attachment) -> Result<String, StorageError> {
        let url = format!(
            "https://api.cloudinary.com/v1_1/{}/image/upload",
            self.config.cloud_name
        );

        let file = Part::bytes(attachment.bytes.clone())
            .file_name(attachment.file_name.clone())
            .mime_str(&attachment.content_type)?;
        let form = Form::new()
            .text("upload_preset", self.config.upload_preset.clone())
            .text("public_id", key.to_string())
            .part("file", file);

        let response = self.http.post(&url).multipart(form).send().await?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(StorageError::Rejected(format!("{}: {}", status, text)));
        }

        let body: CloudinaryResponse = response.json().await?;
        tracing::debug!(key, url = %body.secure_url, "Uploaded document to Cloudinary");
        Ok(body.secure_url)
    }
}

/// Writes uploads below a local directory
#[derive(Debug, Clone)]
pub struct LocalDiskStorage {
    root: PathBuf,
    public_base_url: String,
}

impl LocalDiskStorage {
    /// `public_base_url` is the externally visible origin of this service
    pub fn new(root: impl Into<PathBuf>, public_base_url: &str) -> Self {
        Self {
            root: root.into(),
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl ObjectStorage for LocalDiskStorage {
    async fn upload(&self, key: &str, attachment: &Attachment) -> Result<String, StorageError> {
        if key.split('/').any(|segment| segment.is_empty() || segment == "..") {
            return Err(StorageError::Rejected(format!("invalid key {:?}", key)));
        }

        let relative = format!("{}.{}", key, attachment.extension());
        let path = self.root.join(&relative);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, &attachment.bytes).await?;

        tracing::debug!(key, path = %path.display(), "Stored document on disk");
        Ok(format!("{}/uploads/{}", self.public_base_url, relative))
    }
}
