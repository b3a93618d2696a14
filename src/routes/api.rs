// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! API routes for authenticated users: profile and the aggregated views.

use crate::db::WorkoutQuery;
use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::stats::{self, WEEK};
use crate::models::{Role, Workout, WorkoutStats};
use crate::routes::workouts::WorkoutResponse;
use crate::time_utils::{local_date, local_midnight_utc, offset_from_minutes};
use crate::AppState;
use axum::{
    extract::{Query, State},
    routing::get,
    Extension, Json, Router,
};
use chrono::{Datelike, Duration, FixedOffset, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// API routes (require authentication via JWT).
/// The auth middleware is applied in routes/mod.rs for these routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/me", get(get_me))
        .route("/api/dashboard", get(get_dashboard))
        .route("/api/calendar", get(get_calendar))
        .route("/api/stats", get(get_stats))
}

/// Client's UTC offset; every aggregated view accepts it.
#[derive(Debug, Default, Deserialize)]
pub struct OffsetParams {
    #[serde(default)]
    tz_offset_minutes: i32,
}

impl OffsetParams {
    fn offset(&self) -> Result<FixedOffset> {
        offset_from_minutes(self.tz_offset_minutes).ok_or_else(|| {
            AppError::BadRequest("'tz_offset_minutes' must be within ±840".to_string())
        })
    }
}

async fn user_workouts(state: &AppState, uid: &str, query: &WorkoutQuery) -> Result<Vec<Workout>> {
    let mut workouts = state.db.list_workouts(uid, query).await?;
    workouts.retain(|w| w.is_owned_by(uid));
    Ok(workouts)
}

// ─── User Profile ────────────────────────────────────────────

/// Current user response.
#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct UserResponse {
    pub uid: String,
    pub email: String,
    pub display_name: Option<String>,
    pub role: Role,
    /// Display hint only; admin routes re-check the role on every request
    pub is_admin: bool,
}

async fn get_me(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<UserResponse>> {
    let role = state.roles.cached_role(&user.uid).await?;

    Ok(Json(UserResponse {
        uid: user.uid,
        email: user.email,
        display_name: user.display_name,
        role,
        is_admin: role.is_admin(),
    }))
}

// ─── Dashboard ───────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct DaySummary {
    /// Short weekday name ("Mon")
    pub weekday: String,
    /// Date of this weekday in the current week
    pub date: String,
    /// All-time workouts on this weekday
    pub workout_count: u32,
    /// Most frequent category on this weekday
    pub top_category: Option<String>,
    /// Workouts logged on `date`
    pub workouts: Vec<WorkoutResponse>,
}

#[derive(Debug, Serialize)]
pub struct DashboardResponse {
    pub today: String,
    pub week: Vec<DaySummary>,
    pub streak: u32,
    pub totals: stats::PeriodTotals,
    pub total_hours: f64,
}

/// Build the weekly dashboard view.
pub fn build_dashboard(workouts: &[Workout], today: NaiveDate, offset: FixedOffset) -> DashboardResponse {
    let by_weekday = stats::group_by_weekday(workouts, offset);
    let dates = stats::week_dates(today);

    let week = WEEK
        .iter()
        .zip(by_weekday.iter())
        .zip(dates.iter())
        .map(|((weekday, bucket), date)| {
            let counts = stats::category_counts(bucket.iter().copied());
            DaySummary {
                weekday: weekday.to_string(),
                date: date.to_string(),
                workout_count: bucket.len() as u32,
                top_category: stats::most_frequent_category(&counts).map(|(name, _)| name),
                workouts: bucket
                    .iter()
                    .filter(|w| local_date(w.date, offset) == *date)
                    .map(|w| WorkoutResponse::from((*w).clone()))
                    .collect(),
            }
        })
        .collect();

    let mut totals = stats::PeriodTotals::default();
    for workout in workouts {
        totals.add(workout);
    }

    DashboardResponse {
        today: today.to_string(),
        week,
        streak: stats::workout_streak(workouts, today, offset),
        total_hours: totals.hours(),
        totals,
    }
}

async fn get_dashboard(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(params): Query<OffsetParams>,
) -> Result<Json<DashboardResponse>> {
    let offset = params.offset()?;
    let today = local_date(Utc::now(), offset);

    let workouts = user_workouts(&state, &user.uid, &WorkoutQuery::default()).await?;
    tracing::debug!(uid = %user.uid, count = workouts.len(), "Building dashboard");

    Ok(Json(build_dashboard(&workouts, today, offset)))
}

// ─── Calendar ────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CalendarParams {
    year: Option<i32>,
    month: Option<u32>,
    /// Single day (YYYY-MM-DD); overrides year/month
    date: Option<String>,
    #[serde(default)]
    tz_offset_minutes: i32,
}

#[derive(Debug, Serialize)]
pub struct CalendarResponse {
    /// Workouts keyed by local date (YYYY-MM-DD)
    pub days: BTreeMap<String, Vec<WorkoutResponse>>,
    pub total: usize,
}

/// Local date range `[start, end)` requested by the calendar.
pub fn calendar_range(
    year: Option<i32>,
    month: Option<u32>,
    date: Option<&str>,
    today: NaiveDate,
) -> Result<(NaiveDate, NaiveDate)> {
    if let Some(raw) = date {
        let day = NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
            .map_err(|_| AppError::BadRequest("Invalid 'date': expected YYYY-MM-DD".to_string()))?;
        return Ok((day, day + Duration::days(1)));
    }

    let year = year.unwrap_or(today.year());
    let month = month.unwrap_or(today.month());
    let start = NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or_else(|| AppError::BadRequest("Invalid 'year' or 'month'".to_string()))?;
    let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    let end = NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .ok_or_else(|| AppError::BadRequest("Invalid 'year' or 'month'".to_string()))?;

    Ok((start, end))
}

/// Group workouts whose local date falls in `[start, end)`.
pub fn build_calendar(
    workouts: &[Workout],
    start: NaiveDate,
    end: NaiveDate,
    offset: FixedOffset,
) -> CalendarResponse {
    let days: BTreeMap<String, Vec<WorkoutResponse>> = stats::group_by_date(workouts, offset)
        .into_iter()
        .filter(|(date, _)| *date >= start && *date < end)
        .map(|(date, items)| {
            (
                date.to_string(),
                items
                    .into_iter()
                    .map(|w| WorkoutResponse::from(w.clone()))
                    .collect(),
            )
        })
        .collect();

    let total = days.values().map(Vec::len).sum();
    CalendarResponse { days, total }
}

async fn get_calendar(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(params): Query<CalendarParams>,
) -> Result<Json<CalendarResponse>> {
    let offset = OffsetParams {
        tz_offset_minutes: params.tz_offset_minutes,
    }
    .offset()?;
    let today = local_date(Utc::now(), offset);
    let (start, end) = calendar_range(params.year, params.month, params.date.as_deref(), today)?;

    let query = WorkoutQuery {
        from: Some(local_midnight_utc(start, offset)),
        to: Some(local_midnight_utc(end, offset) - Duration::microseconds(1)),
        ..Default::default()
    };
    let workouts = user_workouts(&state, &user.uid, &query).await?;

    Ok(Json(build_calendar(&workouts, start, end, offset)))
}

// ─── Stats ───────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub today: String,
    #[serde(flatten)]
    pub stats: WorkoutStats,
    pub total_hours: f64,
}

async fn get_stats(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(params): Query<OffsetParams>,
) -> Result<Json<StatsResponse>> {
    let offset = params.offset()?;
    let today = local_date(Utc::now(), offset);

    let workouts = user_workouts(&state, &user.uid, &WorkoutQuery::default()).await?;
    let stats = stats::compute_stats(&workouts, today, offset);

    tracing::debug!(
        uid = %user.uid,
        workouts = stats.all_time.workouts,
        streak = stats.streak,
        "Computed stats"
    );

    Ok(Json(StatsResponse {
        today: today.to_string(),
        total_hours: stats.all_time.hours(),
        stats,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{WorkoutExercise, WorkoutSet};
    use chrono::TimeZone;

    fn workout(id: &str, date: chrono::DateTime<Utc>, category: &str) -> Workout {
        Workout {
            id: id.to_string(),
            user_id: "u1".to_string(),
            name: format!("Workout {id}"),
            date,
            category: category.to_string(),
            categories: vec![category.to_string()],
            exercises: vec![WorkoutExercise {
                name: "Squat".to_string(),
                sets: vec![WorkoutSet { reps: 5, weight: 100.0 }; 3],
            }],
            total_sets: 3,
            duration: 45,
            notes: None,
            completed: true,
            completed_at: None,
            image_url: None,
            created_at: None,
            updated_at: None,
        }
    }

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    #[test]
    fn test_calendar_range_month() {
        let today = NaiveDate::from_ymd_opt(2025, 5, 20).unwrap();
        let (start, end) = calendar_range(Some(2024), Some(12), None, today).unwrap();
        assert_eq!(start, NaiveDate::from_ymd_opt(2024, 12, 1).unwrap());
        assert_eq!(end, NaiveDate::from_ymd_opt(2025, 1, 1).unwrap());

        let (start, _) = calendar_range(None, None, None, today).unwrap();
        assert_eq!(start, NaiveDate::from_ymd_opt(2025, 5, 1).unwrap());
    }

    #[test]
    fn test_calendar_range_rejects_bad_input() {
        let today = NaiveDate::from_ymd_opt(2025, 5, 20).unwrap();
        assert!(calendar_range(Some(2025), Some(13), None, today).is_err());
        assert!(calendar_range(None, None, Some("20-05-2025"), today).is_err());
    }

    #[test]
    fn test_calendar_single_day() {
        let today = NaiveDate::from_ymd_opt(2025, 5, 20).unwrap();
        let workouts = vec![
            workout("a", Utc.with_ymd_and_hms(2025, 5, 20, 9, 0, 0).unwrap(), "Legs"),
            workout("b", Utc.with_ymd_and_hms(2025, 5, 21, 9, 0, 0).unwrap(), "Back"),
        ];

        let (start, end) = calendar_range(None, None, Some("2025-05-20"), today).unwrap();
        let calendar = build_calendar(&workouts, start, end, utc());
        assert_eq!(calendar.total, 1);
        assert_eq!(calendar.days["2025-05-20"][0].id, "a");
    }

    #[test]
    fn test_calendar_uses_local_dates() {
        // 20:00 UTC on the 31st is June 1st at UTC+7
        let workouts = vec![workout(
            "a",
            Utc.with_ymd_and_hms(2025, 5, 31, 20, 0, 0).unwrap(),
            "Legs",
        )];
        let plus_seven = offset_from_minutes(420).unwrap();
        let may_start = NaiveDate::from_ymd_opt(2025, 5, 1).unwrap();
        let june_start = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();

        assert_eq!(build_calendar(&workouts, may_start, june_start, plus_seven).total, 0);
        assert_eq!(build_calendar(&workouts, may_start, june_start, utc()).total, 1);
    }

    #[test]
    fn test_dashboard_week() {
        // Tuesday
        let today = NaiveDate::from_ymd_opt(2025, 5, 20).unwrap();
        let workouts = vec![
            workout("mon", Utc.with_ymd_and_hms(2025, 5, 19, 8, 0, 0).unwrap(), "Chest"),
            workout("tue", Utc.with_ymd_and_hms(2025, 5, 20, 8, 0, 0).unwrap(), "Legs"),
            workout("old-mon", Utc.with_ymd_and_hms(2025, 5, 12, 8, 0, 0).unwrap(), "Chest"),
        ];

        let dashboard = build_dashboard(&workouts, today, utc());
        assert_eq!(dashboard.week.len(), 7);

        let monday = &dashboard.week[0];
        assert_eq!(monday.weekday, "Mon");
        assert_eq!(monday.date, "2025-05-19");
        assert_eq!(monday.workout_count, 2);
        assert_eq!(monday.top_category.as_deref(), Some("Chest"));
        assert_eq!(monday.workouts.len(), 1);
        assert_eq!(monday.workouts[0].id, "mon");

        assert_eq!(dashboard.week[6].date, "2025-05-25");
        assert!(dashboard.week[6].workouts.is_empty());

        assert_eq!(dashboard.streak, 2);
        assert_eq!(dashboard.totals.workouts, 3);
        assert_eq!(dashboard.totals.sets, 9);
        assert!((dashboard.total_hours - 2.25).abs() < f64::EPSILON);
    }

    #[test]
    fn test_offset_params_bounds() {
        assert!(OffsetParams { tz_offset_minutes: -300 }.offset().is_ok());
        assert!(OffsetParams { tz_offset_minutes: 1000 }.offset().is_err());
    }
}
