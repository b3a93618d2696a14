// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Image uploads to Cloudinary.

use crate::config::CloudinaryConfig;
use crate::error::AppError;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Largest accepted image (5 MB).
pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

const UPLOAD_TIMEOUT: Duration = Duration::from_secs(30);

/// Detect a supported image type from its leading bytes.
pub fn detect_image_type(bytes: &[u8]) -> Option<&'static str> {
    match bytes {
        [0xFF, 0xD8, 0xFF, ..] => Some("image/jpeg"),
        [0x89, b'P', b'N', b'G', ..] => Some("image/png"),
        [b'G', b'I', b'F', b'8', ..] => Some("image/gif"),
        [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => Some("image/webp"),
        _ => None,
    }
}

/// Validate an upload and return its MIME type.
pub fn validate_image(bytes: &[u8]) -> Result<&'static str, AppError> {
    if bytes.is_empty() {
        return Err(AppError::BadRequest("Uploaded file is empty".to_string()));
    }
    if bytes.len() > MAX_IMAGE_BYTES {
        return Err(AppError::BadRequest(
            "File too large. Maximum size is 5MB.".to_string(),
        ));
    }
    detect_image_type(bytes).ok_or_else(|| {
        AppError::BadRequest("Unsupported file type. Allowed: JPEG, PNG, WebP, GIF.".to_string())
    })
}

/// Signature over upload parameters: sorted `key=value` pairs joined by `&`,
/// followed by the API secret, hashed with SHA-256.
pub fn sign_params(params: &[(&str, String)], api_secret: &str) -> String {
    let mut sorted: Vec<&(&str, String)> = params.iter().collect();
    sorted.sort_by(|a, b| a.0.cmp(b.0));

    let to_sign = sorted
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");

    let mut hasher = Sha256::new();
    hasher.update(to_sign.as_bytes());
    hasher.update(api_secret.as_bytes());
    hex::encode(hasher.finalize())
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: String,
}

#[derive(Debug, Deserialize)]
struct UploadErrorResponse {
    error: UploadErrorBody,
}

#[derive(Debug, Deserialize)]
struct UploadErrorBody {
    message: String,
}

/// Client for signed uploads.
pub struct MediaService {
    http_client: reqwest::Client,
    config: Option<CloudinaryConfig>,
}

impl MediaService {
    pub fn new(config: Option<CloudinaryConfig>) -> anyhow::Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(UPLOAD_TIMEOUT)
            .build()?;

        if config.is_none() {
            tracing::warn!("Cloudinary not configured; image uploads are disabled");
        }

        Ok(Self {
            http_client,
            config,
        })
    }

    pub fn is_configured(&self) -> bool {
        self.config.is_some()
    }

    /// Upload a workout image into folder `workouts/{workout_id}` and return
    /// its HTTPS URL.
    pub async fn upload_workout_image(
        &self,
        workout_id: &str,
        bytes: Vec<u8>,
        mime_type: &str,
    ) -> Result<String, AppError> {
        let config = self
            .config
            .as_ref()
            .ok_or_else(|| AppError::MediaHost("Image uploads are not configured".to_string()))?;

        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("System time error: {}", e)))?
            .as_secs()
            .to_string();
        let folder = format!("workouts/{workout_id}");

        let signature = sign_params(
            &[("folder", folder.clone()), ("timestamp", timestamp.clone())],
            &config.api_secret,
        );

        let size = bytes.len();
        let file = reqwest::multipart::Part::bytes(bytes)
            .file_name("upload")
            .mime_str(mime_type)
            .map_err(|e| AppError::BadRequest(format!("Invalid MIME type: {}", e)))?;

        let form = reqwest::multipart::Form::new()
            .text("api_key", config.api_key.clone())
            .text("timestamp", timestamp)
            .text("folder", folder)
            .text("signature", signature)
            .text("signature_algorithm", "sha256")
            .part("file", file);

        let url = format!(
            "https://api.cloudinary.com/v1_1/{}/image/upload",
            config.cloud_name
        );

        let response = self
            .http_client
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| AppError::MediaHost(format!("Upload request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<UploadErrorResponse>()
                .await
                .map(|e| e.error.message)
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(AppError::MediaHost(format!(
                "Upload rejected ({}): {}",
                status, message
            )));
        }

        let uploaded: UploadResponse = response
            .json()
            .await
            .map_err(|e| AppError::MediaHost(format!("Invalid upload response: {}", e)))?;

        tracing::info!(workout_id, size, "Workout image uploaded");
        Ok(uploaded.secure_url)
    }
}
