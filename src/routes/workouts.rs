// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Workout CRUD routes. Every operation is scoped to the signed-in user.

use crate::db::{WorkoutQuery, WorkoutQueryCursor};
use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::workout::normalize_categories;
use crate::models::{Workout, WorkoutExercise, WorkoutSet};
use crate::time_utils::{format_utc_rfc3339, parse_client_date};
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

const DEFAULT_LIMIT: u32 = 50;
const MAX_LIMIT: u32 = 100;
const CURSOR_PARTS: usize = 3;
/// Upper bound on a single workout's duration (minutes in a day).
const MAX_DURATION_MINUTES: u32 = 24 * 60;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/workouts", get(list_workouts).post(create_workout))
        .route(
            "/api/workouts/{id}",
            get(get_workout).put(update_workout).delete(delete_workout),
        )
        .route("/api/workouts/{id}/complete", post(set_completed))
}

// ─── DTOs ────────────────────────────────────────────────────

/// One exercise as submitted by the client.
#[derive(Debug, Deserialize, Validate)]
pub struct ExerciseInput {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[serde(default)]
    pub sets: Vec<WorkoutSet>,
}

impl ExerciseInput {
    fn into_exercise(self) -> WorkoutExercise {
        WorkoutExercise {
            name: self.name.trim().to_string(),
            sets: self.sets,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateWorkoutRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    pub date: String,
    pub category: Option<String>,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    #[validate(nested)]
    pub exercises: Vec<ExerciseInput>,
    #[serde(default)]
    #[validate(range(max = MAX_DURATION_MINUTES))]
    pub duration: u32,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
    #[serde(default)]
    pub completed: bool,
}

/// Partial update: only provided fields change.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateWorkoutRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    pub date: Option<String>,
    pub category: Option<String>,
    pub categories: Option<Vec<String>>,
    #[validate(nested)]
    pub exercises: Option<Vec<ExerciseInput>>,
    #[validate(range(max = MAX_DURATION_MINUTES))]
    pub duration: Option<u32>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
    pub completed: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct CompleteRequest {
    #[serde(default = "default_true")]
    pub completed: bool,
}

fn default_true() -> bool {
    true
}

/// Workout as returned by the API.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkoutResponse {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub date: String,
    pub category: String,
    pub categories: Vec<String>,
    pub exercises: Vec<WorkoutExercise>,
    pub total_sets: u32,
    pub duration: u32,
    pub notes: Option<String>,
    pub completed: bool,
    pub completed_at: Option<String>,
    pub image_url: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

impl From<Workout> for WorkoutResponse {
    fn from(w: Workout) -> Self {
        Self {
            id: w.id,
            user_id: w.user_id,
            name: w.name,
            date: format_utc_rfc3339(w.date),
            category: w.category,
            categories: w.categories,
            exercises: w.exercises,
            total_sets: w.total_sets,
            duration: w.duration,
            notes: w.notes,
            completed: w.completed,
            completed_at: w.completed_at.map(format_utc_rfc3339),
            image_url: w.image_url,
            created_at: w.created_at.map(format_utc_rfc3339),
            updated_at: w.updated_at.map(format_utc_rfc3339),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct WorkoutListResponse {
    pub workouts: Vec<WorkoutResponse>,
    pub limit: u32,
    pub next_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default = "default_limit")]
    limit: u32,
    cursor: Option<String>,
    /// Inclusive lower bound on the workout date
    from: Option<String>,
    /// Inclusive upper bound on the workout date
    to: Option<String>,
}

fn default_limit() -> u32 {
    DEFAULT_LIMIT
}

// ─── Helpers ─────────────────────────────────────────────────

/// Reject access to another user's workout.
pub fn ensure_owner(workout: &Workout, uid: &str) -> Result<()> {
    if workout.is_owned_by(uid) {
        return Ok(());
    }
    tracing::warn!(
        uid = %uid,
        workout_id = %workout.id,
        "Rejected access to workout owned by another user"
    );
    Err(AppError::Forbidden(
        "Workout belongs to another user".to_string(),
    ))
}

/// Load a workout and check that `uid` owns it.
pub async fn load_owned_workout(state: &AppState, uid: &str, workout_id: &str) -> Result<Workout> {
    let mut workout = state
        .db
        .get_workout(workout_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Workout {} not found", workout_id)))?;

    if workout.id.is_empty() {
        workout.id = workout_id.to_string();
    }
    ensure_owner(&workout, uid)?;
    Ok(workout)
}

fn parse_date_field(field: &str, raw: &str) -> Result<DateTime<Utc>> {
    parse_client_date(raw).ok_or_else(|| {
        AppError::BadRequest(format!(
            "Invalid '{}': expected RFC3339, YYYY-MM-DD[THH:MM[:SS]] or Unix milliseconds",
            field
        ))
    })
}

fn check_sets(exercises: &[ExerciseInput]) -> Result<()> {
    let invalid = exercises
        .iter()
        .flat_map(|e| e.sets.iter())
        .any(|s| !s.weight.is_finite() || s.weight < 0.0);
    if invalid {
        return Err(AppError::BadRequest(
            "Set weight must be a non-negative number".to_string(),
        ));
    }
    Ok(())
}

pub(crate) fn parse_cursor(cursor: Option<&str>) -> Result<Option<WorkoutQueryCursor>> {
    cursor
        .map(|raw| {
            let invalid_cursor = || AppError::BadRequest("Invalid 'cursor' parameter".to_string());

            let decoded = URL_SAFE_NO_PAD.decode(raw).map_err(|_| invalid_cursor())?;
            let decoded_str = std::str::from_utf8(&decoded).map_err(|_| invalid_cursor())?;

            let parts: Vec<&str> = decoded_str.splitn(CURSOR_PARTS, ':').collect();
            if parts.len() != CURSOR_PARTS || parts[2].is_empty() {
                return Err(invalid_cursor());
            }

            let seconds = parts[0].parse::<i64>().map_err(|_| invalid_cursor())?;
            let nanos = parts[1].parse::<u32>().map_err(|_| invalid_cursor())?;
            let date = DateTime::from_timestamp(seconds, nanos).ok_or_else(invalid_cursor)?;

            Ok(WorkoutQueryCursor {
                date,
                workout_id: parts[2].to_string(),
            })
        })
        .transpose()
}

pub(crate) fn encode_cursor(cursor: &WorkoutQueryCursor) -> String {
    let payload = format!(
        "{}:{}:{}",
        cursor.date.timestamp(),
        cursor.date.timestamp_subsec_nanos(),
        cursor.workout_id
    );
    URL_SAFE_NO_PAD.encode(payload)
}

// ─── Handlers ────────────────────────────────────────────────

async fn list_workouts(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(params): Query<ListQuery>,
) -> Result<Json<WorkoutListResponse>> {
    if params.limit == 0 {
        return Err(AppError::BadRequest("'limit' must be at least 1".to_string()));
    }
    let limit = params.limit.min(MAX_LIMIT);

    let query = WorkoutQuery {
        from: params
            .from
            .as_deref()
            .map(|raw| parse_date_field("from", raw))
            .transpose()?,
        to: params
            .to
            .as_deref()
            .map(|raw| parse_date_field("to", raw))
            .transpose()?,
        cursor: parse_cursor(params.cursor.as_deref())?,
        // Fetch one extra item to determine if another page is available.
        limit: Some(limit + 1),
    };

    tracing::debug!(
        uid = %user.uid,
        limit,
        has_cursor = query.cursor.is_some(),
        "Listing workouts"
    );

    let mut workouts = state.db.list_workouts(&user.uid, &query).await?;
    workouts.retain(|w| w.is_owned_by(&user.uid));

    let has_more = workouts.len() > limit as usize;
    if has_more {
        workouts.truncate(limit as usize);
    }

    let next_cursor = if has_more {
        workouts.last().map(|w| {
            encode_cursor(&WorkoutQueryCursor {
                date: w.date,
                workout_id: w.id.clone(),
            })
        })
    } else {
        None
    };

    Ok(Json(WorkoutListResponse {
        workouts: workouts.into_iter().map(WorkoutResponse::from).collect(),
        limit,
        next_cursor,
    }))
}

async fn get_workout(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(workout_id): Path<String>,
) -> Result<Json<WorkoutResponse>> {
    let workout = load_owned_workout(&state, &user.uid, &workout_id).await?;
    Ok(Json(workout.into()))
}

async fn create_workout(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<CreateWorkoutRequest>,
) -> Result<(StatusCode, Json<WorkoutResponse>)> {
    req.validate()?;
    check_sets(&req.exercises)?;

    let date = parse_date_field("date", &req.date)?;
    let (category, categories) = normalize_categories(req.category, req.categories);
    let now = Utc::now();

    let mut workout = Workout {
        id: uuid::Uuid::new_v4().to_string(),
        user_id: user.uid.clone(),
        name: req.name.trim().to_string(),
        date,
        category,
        categories,
        exercises: req.exercises.into_iter().map(ExerciseInput::into_exercise).collect(),
        total_sets: 0,
        duration: req.duration,
        notes: req.notes,
        completed: req.completed,
        completed_at: req.completed.then_some(now),
        image_url: None,
        created_at: Some(now),
        updated_at: Some(now),
    };
    workout.recompute_totals();

    state.db.set_workout(&workout).await?;
    tracing::info!(
        uid = %user.uid,
        workout_id = %workout.id,
        total_sets = workout.total_sets,
        "Workout created"
    );

    Ok((StatusCode::CREATED, Json(workout.into())))
}

/// Apply a partial update. Categories are re-derived when either form changes.
pub fn apply_update(workout: &mut Workout, req: UpdateWorkoutRequest, now: DateTime<Utc>) -> Result<()> {
    if let Some(name) = req.name {
        workout.name = name.trim().to_string();
    }
    if let Some(raw) = req.date {
        workout.date = parse_date_field("date", &raw)?;
    }
    if req.category.is_some() || req.categories.is_some() {
        let (category, categories) =
            normalize_categories(req.category, req.categories.unwrap_or_default());
        workout.category = category;
        workout.categories = categories;
    }
    if let Some(exercises) = req.exercises {
        check_sets(&exercises)?;
        workout.exercises = exercises.into_iter().map(ExerciseInput::into_exercise).collect();
    }
    if let Some(duration) = req.duration {
        workout.duration = duration;
    }
    if let Some(notes) = req.notes {
        workout.notes = Some(notes);
    }
    if let Some(completed) = req.completed {
        mark_completed(workout, completed, now);
    }

    workout.recompute_totals();
    workout.updated_at = Some(now);
    Ok(())
}

fn mark_completed(workout: &mut Workout, completed: bool, now: DateTime<Utc>) {
    if completed && !workout.completed {
        workout.completed_at = Some(now);
    } else if !completed {
        workout.completed_at = None;
    }
    workout.completed = completed;
}

async fn update_workout(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(workout_id): Path<String>,
    Json(req): Json<UpdateWorkoutRequest>,
) -> Result<Json<WorkoutResponse>> {
    req.validate()?;

    let mut workout = load_owned_workout(&state, &user.uid, &workout_id).await?;
    apply_update(&mut workout, req, Utc::now())?;

    state.db.set_workout(&workout).await?;
    tracing::info!(uid = %user.uid, workout_id = %workout.id, "Workout updated");

    Ok(Json(workout.into()))
}

async fn delete_workout(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(workout_id): Path<String>,
) -> Result<StatusCode> {
    load_owned_workout(&state, &user.uid, &workout_id).await?;

    state.db.delete_workout(&workout_id).await?;
    tracing::info!(uid = %user.uid, workout_id = %workout_id, "Workout deleted");

    Ok(StatusCode::NO_CONTENT)
}

async fn set_completed(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(workout_id): Path<String>,
    Json(req): Json<CompleteRequest>,
) -> Result<Json<WorkoutResponse>> {
    let mut workout = load_owned_workout(&state, &user.uid, &workout_id).await?;

    let now = Utc::now();
    mark_completed(&mut workout, req.completed, now);
    workout.updated_at = Some(now);

    state.db.set_workout(&workout).await?;
    tracing::info!(
        uid = %user.uid,
        workout_id = %workout.id,
        completed = workout.completed,
        "Workout completion updated"
    );

    Ok(Json(workout.into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn workout(owner: &str) -> Workout {
        let now = Utc::now();
        Workout {
            id: "w1".to_string(),
            user_id: owner.to_string(),
            name: "Push Day".to_string(),
            date: now,
            category: "Chest".to_string(),
            categories: vec!["Chest".to_string()],
            exercises: vec![WorkoutExercise {
                name: "Bench Press".to_string(),
                sets: vec![WorkoutSet { reps: 8, weight: 80.0 }; 3],
            }],
            total_sets: 3,
            duration: 60,
            notes: None,
            completed: false,
            completed_at: None,
            image_url: None,
            created_at: Some(now),
            updated_at: Some(now),
        }
    }

    fn empty_update() -> UpdateWorkoutRequest {
        UpdateWorkoutRequest {
            name: None,
            date: None,
            category: None,
            categories: None,
            exercises: None,
            duration: None,
            notes: None,
            completed: None,
        }
    }

    #[test]
    fn test_cursor_round_trip() {
        let cursor = WorkoutQueryCursor {
            date: DateTime::from_timestamp(1_704_103_200, 123).unwrap(),
            workout_id: "7b1f9c2e-1d2a-4e55-9f0a-3c8a2b1d4e6f".to_string(),
        };

        let encoded = encode_cursor(&cursor);
        let decoded = parse_cursor(Some(&encoded)).unwrap().unwrap();
        assert_eq!(decoded, cursor);
    }

    #[test]
    fn test_cursor_rejects_invalid_input() {
        assert!(matches!(
            parse_cursor(Some("not-base64!")),
            Err(AppError::BadRequest(_))
        ));
        let missing_id = URL_SAFE_NO_PAD.encode("1704103200:0:");
        assert!(parse_cursor(Some(&missing_id)).is_err());
        assert!(parse_cursor(None).unwrap().is_none());
    }

    #[test]
    fn test_ensure_owner() {
        let w = workout("owner");
        assert!(ensure_owner(&w, "owner").is_ok());
        assert!(matches!(ensure_owner(&w, "intruder"), Err(AppError::Forbidden(_))));
        assert!(ensure_owner(&w, "").is_err());
    }

    #[test]
    fn test_update_recomputes_total_sets() {
        let mut w = workout("owner");
        let mut req = empty_update();
        req.exercises = Some(vec![
            ExerciseInput {
                name: "Squat".to_string(),
                sets: vec![WorkoutSet { reps: 5, weight: 100.0 }; 5],
            },
            ExerciseInput {
                name: "Lunge".to_string(),
                sets: vec![WorkoutSet { reps: 10, weight: 20.0 }; 2],
            },
        ]);

        apply_update(&mut w, req, Utc::now()).unwrap();
        assert_eq!(w.total_sets, 7);
        assert_eq!(w.name, "Push Day");
    }

    #[test]
    fn test_update_rejects_bad_date_without_changes() {
        let mut w = workout("owner");
        let original = w.date;
        let mut req = empty_update();
        req.date = Some("next tuesday".to_string());

        assert!(matches!(
            apply_update(&mut w, req, Utc::now()),
            Err(AppError::BadRequest(_))
        ));
        assert_eq!(w.date, original);
    }

    #[test]
    fn test_update_categories_from_string() {
        let mut w = workout("owner");
        let mut req = empty_update();
        req.category = Some("Back, Biceps".to_string());

        apply_update(&mut w, req, Utc::now()).unwrap();
        assert_eq!(w.categories, vec!["Back", "Biceps"]);
        assert_eq!(w.category, "Back, Biceps");
    }

    #[test]
    fn test_mark_completed_sets_and_clears_timestamp() {
        let mut w = workout("owner");
        let now = Utc::now();

        mark_completed(&mut w, true, now);
        assert!(w.completed);
        assert_eq!(w.completed_at, Some(now));

        // Completing again keeps the original timestamp
        mark_completed(&mut w, true, now + chrono::Duration::hours(1));
        assert_eq!(w.completed_at, Some(now));

        mark_completed(&mut w, false, now);
        assert!(!w.completed);
        assert!(w.completed_at.is_none());
    }

    #[test]
    fn test_negative_weight_rejected() {
        let exercises = vec![ExerciseInput {
            name: "Bench".to_string(),
            sets: vec![WorkoutSet { reps: 5, weight: -5.0 }],
        }];
        assert!(check_sets(&exercises).is_err());
    }

    #[test]
    fn test_create_request_validation() {
        let req: CreateWorkoutRequest = serde_json::from_value(serde_json::json!({
            "name": "",
            "date": "2025-05-20"
        }))
        .unwrap();
        assert!(req.validate().is_err());

        let req: CreateWorkoutRequest = serde_json::from_value(serde_json::json!({
            "name": "Leg Day",
            "date": "2025-05-20",
            "exercises": [{ "name": "", "sets": [] }]
        }))
        .unwrap();
        assert!(req.validate().is_err());
    }
}
