// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Admin routes: first-admin bootstrap, user roles, seed data and diagnostics.
//!
//! [`setup_routes`] only need a session; [`routes`] are mounted behind the
//! admin guard in routes/mod.rs.

use crate::error::Result;
use crate::middleware::auth::AuthUser;
use crate::models::{Role, UserRole, WorkoutProgram};
use crate::services::seed::{self, SeedReport};
use crate::time_utils::format_utc_rfc3339;
use crate::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

/// Bootstrap routes, available to any signed-in user.
pub fn setup_routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/admin/setup", get(get_setup).post(request_setup))
}

/// Admin-only routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/admin/reset", post(reset_admins))
        .route("/api/admin/users", get(list_users))
        .route("/api/admin/users/{uid}/role", put(set_user_role))
        .route("/api/admin/seed/exercises", post(seed_exercises))
        .route(
            "/api/admin/import/program/exercises",
            post(import_program_exercises),
        )
        .route("/api/admin/import/program", post(import_program))
        .route("/api/admin/programs", get(list_programs))
        .route("/api/admin/diagnostics", get(diagnostics))
}

// ─── Bootstrap ───────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct SetupStatusResponse {
    pub has_admin: bool,
    pub pending_email: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct SetupRequest {
    #[validate(email)]
    pub email: String,
    #[serde(default)]
    pub force_reset: bool,
}

#[derive(Debug, Serialize)]
pub struct SetupResponse {
    pub pending_email: String,
    pub created_at: Option<String>,
}

async fn get_setup(State(state): State<Arc<AppState>>) -> Result<Json<SetupStatusResponse>> {
    let status = state.roles.setup_status().await?;
    Ok(Json(SetupStatusResponse {
        has_admin: status.has_admin,
        pending_email: status.pending_email,
    }))
}

async fn request_setup(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<SetupRequest>,
) -> Result<Json<SetupResponse>> {
    req.validate()?;

    let setting = state
        .roles
        .request_first_admin(&user.uid, &req.email, req.force_reset)
        .await?;

    Ok(Json(SetupResponse {
        pending_email: setting.email,
        created_at: setting.created_at.map(format_utc_rfc3339),
    }))
}

#[derive(Debug, Serialize)]
pub struct ResetResponse {
    pub demoted: usize,
}

async fn reset_admins(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<ResetResponse>> {
    tracing::warn!(uid = %user.uid, "Admin reset requested");
    let demoted = state.roles.reset_admins().await?;
    Ok(Json(ResetResponse { demoted }))
}

// ─── Users ───────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct UserRoleResponse {
    pub uid: String,
    pub email: String,
    pub display_name: Option<String>,
    pub role: Role,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

impl From<UserRole> for UserRoleResponse {
    fn from(r: UserRole) -> Self {
        Self {
            uid: r.uid,
            email: r.email,
            display_name: r.display_name,
            role: r.role,
            created_at: r.created_at.map(format_utc_rfc3339),
            updated_at: r.updated_at.map(format_utc_rfc3339),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SetRoleRequest {
    pub role: Role,
}

async fn list_users(State(state): State<Arc<AppState>>) -> Result<Json<Vec<UserRoleResponse>>> {
    let users = state.roles.list_users().await?;
    Ok(Json(users.into_iter().map(UserRoleResponse::from).collect()))
}

async fn set_user_role(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(target_uid): Path<String>,
    Json(req): Json<SetRoleRequest>,
) -> Result<Json<UserRoleResponse>> {
    let updated = state.roles.set_role(&target_uid, req.role).await?;
    tracing::info!(
        admin = %user.uid,
        target = %target_uid,
        role = req.role.as_str(),
        "Role changed by admin"
    );
    Ok(Json(updated.into()))
}

// ─── Seed data ───────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct SeedResponse {
    pub added_count: usize,
    pub skipped_count: usize,
    #[serde(flatten)]
    pub report: SeedReport,
}

impl From<SeedReport> for SeedResponse {
    fn from(report: SeedReport) -> Self {
        Self {
            added_count: report.added.len(),
            skipped_count: report.skipped.len(),
            report,
        }
    }
}

async fn seed_exercises(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<SeedResponse>> {
    let library = seed::exercise_library()?;
    let report = seed::seed_exercises(&state.db, library, &user.uid).await?;
    Ok(Json(report.into()))
}

async fn import_program_exercises(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<SeedResponse>> {
    let program = seed::builtin_program()?;
    let report = seed::seed_program_exercises(&state.db, &program, &user.uid).await?;
    Ok(Json(report.into()))
}

// ─── Programs ────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct ProgramResponse {
    pub id: String,
    pub name: String,
    pub description: String,
    pub duration_weeks: u32,
    pub level: String,
    pub goal: String,
    pub phase_count: usize,
    pub total_days: usize,
    pub created_at: Option<String>,
}

impl From<WorkoutProgram> for ProgramResponse {
    fn from(p: WorkoutProgram) -> Self {
        Self {
            phase_count: p.phases.len(),
            total_days: p.total_days(),
            id: p.id,
            name: p.name,
            description: p.description,
            duration_weeks: p.duration_weeks,
            level: p.level,
            goal: p.goal,
            created_at: p.created_at.map(format_utc_rfc3339),
        }
    }
}

async fn import_program(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<(StatusCode, Json<ProgramResponse>)> {
    let program = seed::builtin_program()?;
    let imported = seed::import_program(&state.db, program, &user.uid).await?;
    Ok((StatusCode::CREATED, Json(imported.into())))
}

async fn list_programs(State(state): State<Arc<AppState>>) -> Result<Json<Vec<ProgramResponse>>> {
    let programs = state.db.list_programs().await?;
    Ok(Json(programs.into_iter().map(ProgramResponse::from).collect()))
}

// ─── Diagnostics ─────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct DiagnosticsResponse {
    pub firestore_connected: bool,
    pub firestore_error: Option<String>,
    pub media_configured: bool,
    pub token_verifier: &'static str,
    pub build_id: String,
}

async fn diagnostics(State(state): State<Arc<AppState>>) -> Json<DiagnosticsResponse> {
    let firestore_error = if state.db.is_connected() {
        state.db.ping().await.err().map(|e| e.to_string())
    } else {
        Some("offline mode".to_string())
    };
    if let Some(error) = &firestore_error {
        tracing::warn!(error = %error, "Diagnostics: Firestore unreachable");
    }

    Json(DiagnosticsResponse {
        firestore_connected: firestore_error.is_none(),
        firestore_error,
        media_configured: state.media.is_configured(),
        token_verifier: state.token_verifier.mode_name(),
        build_id: option_env!("BUILD_ID").unwrap_or("unknown").to_string(),
    })
}
