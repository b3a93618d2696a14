// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Workout image upload.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::routes::workouts::load_owned_workout;
use crate::services::media::{validate_image, MAX_IMAGE_BYTES};
use crate::AppState;
use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    routing::post,
    Extension, Json, Router,
};
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;

/// Room for multipart framing around the file itself.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Name of the multipart field carrying the image.
const FILE_FIELD: &str = "file";

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/workouts/{id}/image", post(upload_image))
        .layer(DefaultBodyLimit::max(MAX_IMAGE_BYTES + MULTIPART_OVERHEAD))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub image_url: String,
}

async fn read_file_field(multipart: &mut Multipart) -> Result<Vec<u8>> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Invalid multipart data: {}", e)))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(format!("Failed to read upload: {}", e)))?;
        return Ok(bytes.to_vec());
    }

    Err(AppError::BadRequest("No file provided".to_string()))
}

async fn upload_image(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(workout_id): Path<String>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>> {
    let bytes = read_file_field(&mut multipart).await?;
    let mime_type = validate_image(&bytes)?;

    let mut workout = load_owned_workout(&state, &user.uid, &workout_id).await?;

    let image_url = state
        .media
        .upload_workout_image(&workout.id, bytes, mime_type)
        .await?;

    workout.image_url = Some(image_url.clone());
    workout.updated_at = Some(Utc::now());
    state.db.set_workout(&workout).await?;

    tracing::info!(uid = %user.uid, workout_id = %workout.id, "Workout image attached");
    Ok(Json(UploadResponse { image_url }))
}
