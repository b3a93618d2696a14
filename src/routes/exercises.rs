// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Exercise library routes. The library is shared by all users.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::Exercise;
use crate::time_utils::format_utc_rfc3339;
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Extension, Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/exercises", get(list_exercises).post(create_exercise))
        .route(
            "/api/exercises/{id}",
            get(get_exercise).put(update_exercise).delete(delete_exercise),
        )
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    muscle_group: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ExerciseRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[serde(alias = "muscleGroup")]
    #[validate(length(min = 1, max = 50))]
    pub muscle_group: String,
    #[serde(default)]
    #[validate(length(max = 50))]
    pub equipment: String,
    #[serde(default)]
    #[validate(length(max = 50))]
    pub difficulty: String,
    #[serde(default)]
    #[validate(length(max = 2000))]
    pub description: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseResponse {
    pub id: String,
    pub name: String,
    pub muscle_group: String,
    pub equipment: String,
    pub difficulty: String,
    pub description: String,
    pub created_by: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

impl From<Exercise> for ExerciseResponse {
    fn from(e: Exercise) -> Self {
        Self {
            id: e.id,
            name: e.name,
            muscle_group: e.muscle_group,
            equipment: e.equipment,
            difficulty: e.difficulty,
            description: e.description,
            created_by: e.created_by,
            created_at: e.created_at.map(format_utc_rfc3339),
            updated_at: e.updated_at.map(format_utc_rfc3339),
        }
    }
}

async fn load_exercise(state: &AppState, exercise_id: &str) -> Result<Exercise> {
    let mut exercise = state
        .db
        .get_exercise(exercise_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Exercise {} not found", exercise_id)))?;
    if exercise.id.is_empty() {
        exercise.id = exercise_id.to_string();
    }
    Ok(exercise)
}

async fn list_exercises(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<ExerciseResponse>>> {
    let muscle_group = params
        .muscle_group
        .as_deref()
        .map(str::trim)
        .filter(|g| !g.is_empty());

    let exercises = state.db.list_exercises(muscle_group).await?;
    Ok(Json(exercises.into_iter().map(ExerciseResponse::from).collect()))
}

async fn get_exercise(
    State(state): State<Arc<AppState>>,
    Path(exercise_id): Path<String>,
) -> Result<Json<ExerciseResponse>> {
    Ok(Json(load_exercise(&state, &exercise_id).await?.into()))
}

async fn create_exercise(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<ExerciseRequest>,
) -> Result<(StatusCode, Json<ExerciseResponse>)> {
    req.validate()?;

    let exercise = Exercise {
        id: uuid::Uuid::new_v4().to_string(),
        name: req.name.trim().to_string(),
        muscle_group: req.muscle_group.trim().to_string(),
        equipment: req.equipment,
        difficulty: req.difficulty,
        description: req.description,
        created_by: Some(user.uid.clone()),
        created_at: Some(Utc::now()),
        updated_by: None,
        updated_at: None,
    };

    state.db.set_exercise(&exercise).await?;
    tracing::info!(uid = %user.uid, exercise_id = %exercise.id, "Exercise created");

    Ok((StatusCode::CREATED, Json(exercise.into())))
}

async fn update_exercise(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(exercise_id): Path<String>,
    Json(req): Json<ExerciseRequest>,
) -> Result<Json<ExerciseResponse>> {
    req.validate()?;

    let current = load_exercise(&state, &exercise_id).await?;
    let updated = Exercise {
        name: req.name.trim().to_string(),
        muscle_group: req.muscle_group.trim().to_string(),
        equipment: req.equipment,
        difficulty: req.difficulty,
        description: req.description,
        updated_by: Some(user.uid.clone()),
        updated_at: Some(Utc::now()),
        ..current
    };

    state.db.set_exercise(&updated).await?;
    tracing::info!(uid = %user.uid, exercise_id = %updated.id, "Exercise updated");

    Ok(Json(updated.into()))
}

async fn delete_exercise(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(exercise_id): Path<String>,
) -> Result<StatusCode> {
    load_exercise(&state, &exercise_id).await?;

    state.db.delete_exercise(&exercise_id).await?;
    tracing::info!(uid = %user.uid, exercise_id = %exercise_id, "Exercise deleted");

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exercise_request_validation() {
        let req: ExerciseRequest = serde_json::from_value(serde_json::json!({
            "name": "Deadlift",
            "muscle_group": "Back"
        }))
        .unwrap();
        assert!(req.validate().is_ok());
        assert!(req.equipment.is_empty());

        let req: ExerciseRequest = serde_json::from_value(serde_json::json!({
            "name": "Deadlift",
            "muscle_group": ""
        }))
        .unwrap();
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_response_uses_camel_case() {
        let exercise = Exercise {
            id: "e1".to_string(),
            name: "Plank".to_string(),
            muscle_group: "Core".to_string(),
            equipment: "Bodyweight".to_string(),
            difficulty: "Easy".to_string(),
            description: String::new(),
            created_by: None,
            created_at: None,
            updated_by: None,
            updated_at: None,
        };

        let json = serde_json::to_value(ExerciseResponse::from(exercise)).unwrap();
        assert_eq!(json["id"], "e1");
        assert_eq!(json["muscleGroup"], "Core");
    }
}
