// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Built-in exercise library and workout program, and their import.

use crate::db::FirestoreDb;
use crate::error::AppError;
use crate::models::exercise::name_key;
use crate::models::program::extract_exercises;
use crate::models::{Exercise, ExerciseDefinition, WorkoutProgram};
use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashSet;

const EXERCISE_LIBRARY_JSON: &str = include_str!("../../data/exercise_library.json");
const TWELVE_WEEK_PROGRAM_JSON: &str =
    include_str!("../../data/programs/twelve_week_mass_gain.json");

/// The built-in exercise library.
pub fn exercise_library() -> anyhow::Result<Vec<ExerciseDefinition>> {
    serde_json::from_str(EXERCISE_LIBRARY_JSON).context("invalid built-in exercise library")
}

/// The built-in 12-week program.
pub fn builtin_program() -> anyhow::Result<WorkoutProgram> {
    serde_json::from_str(TWELVE_WEEK_PROGRAM_JSON).context("invalid built-in workout program")
}

/// Outcome of a seed run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SeedReport {
    pub added: Vec<String>,
    pub skipped: Vec<String>,
}

/// Split candidates into new exercises and names already in the library.
///
/// Names compare case-insensitively, and duplicates within the candidates are
/// skipped as well.
pub fn plan_exercise_seed(
    existing: &[Exercise],
    candidates: Vec<ExerciseDefinition>,
) -> (Vec<ExerciseDefinition>, Vec<String>) {
    let mut known: HashSet<String> = existing.iter().map(|e| name_key(&e.name)).collect();
    let mut to_insert = Vec::new();
    let mut skipped = Vec::new();

    for candidate in candidates {
        if known.insert(name_key(&candidate.name)) {
            to_insert.push(candidate);
        } else {
            skipped.push(candidate.name);
        }
    }

    (to_insert, skipped)
}

/// Decide whether a program may be imported.
///
/// Returns the document to write, or `Conflict` when a program with the same
/// name already exists.
pub fn plan_program_import(
    existing: Option<&WorkoutProgram>,
    mut program: WorkoutProgram,
    created_by: &str,
    now: DateTime<Utc>,
) -> Result<WorkoutProgram, AppError> {
    if let Some(existing) = existing {
        return Err(AppError::Conflict(format!(
            "Program '{}' already imported (id {})",
            existing.name, existing.id
        )));
    }

    program.id = WorkoutProgram::document_id_for(&program.name);
    program.created_by = Some(created_by.to_string());
    program.created_at = Some(now);
    Ok(program)
}

/// Insert every candidate exercise whose name is not yet in the library.
pub async fn seed_exercises(
    db: &FirestoreDb,
    candidates: Vec<ExerciseDefinition>,
    created_by: &str,
) -> Result<SeedReport, AppError> {
    let existing = db.list_exercises(None).await?;
    let (to_insert, skipped) = plan_exercise_seed(&existing, candidates);

    let now = Utc::now();
    let added: Vec<String> = to_insert.iter().map(|e| e.name.clone()).collect();
    let exercises: Vec<Exercise> = to_insert
        .into_iter()
        .map(|definition| definition.into_exercise(created_by, now))
        .collect();

    if !exercises.is_empty() {
        db.insert_exercises(&exercises).await?;
    }

    tracing::info!(
        added = added.len(),
        skipped = skipped.len(),
        "Exercise seed complete"
    );
    Ok(SeedReport { added, skipped })
}

/// Seed the exercises referenced by a program into the library.
pub async fn seed_program_exercises(
    db: &FirestoreDb,
    program: &WorkoutProgram,
    created_by: &str,
) -> Result<SeedReport, AppError> {
    seed_exercises(db, extract_exercises(program), created_by).await
}

/// Import a program unless one with the same name exists.
///
/// The document id derives from the name, so a concurrent import of the same
/// program fails the create with `Conflict` instead of writing a duplicate.
pub async fn import_program(
    db: &FirestoreDb,
    program: WorkoutProgram,
    created_by: &str,
) -> Result<WorkoutProgram, AppError> {
    let existing = db.find_program_by_name(&program.name).await?;
    let program = plan_program_import(existing.as_ref(), program, created_by, Utc::now())?;

    db.insert_program(&program).await?;
    tracing::info!(program_id = %program.id, name = %program.name, "Program imported");
    Ok(program)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stored(name: &str) -> Exercise {
        ExerciseDefinition {
            name: name.to_string(),
            muscle_group: "Chest".to_string(),
            equipment: "Barbell".to_string(),
            difficulty: "Intermediate".to_string(),
            description: String::new(),
        }
        .into_exercise("seed", Utc::now())
    }

    #[test]
    fn test_builtin_data_parses() {
        let library = exercise_library().unwrap();
        assert!(library.len() > 30);
        assert!(library.iter().all(|e| !e.name.is_empty() && !e.muscle_group.is_empty()));

        let program = builtin_program().unwrap();
        assert_eq!(program.duration_weeks, 12);
        assert_eq!(program.phases.len(), 3);
        assert_eq!(program.total_days(), 15);
        assert!(program.id.is_empty());
    }

    #[test]
    fn test_library_names_are_unique() {
        let library = exercise_library().unwrap();
        let names: HashSet<String> = library.iter().map(|e| name_key(&e.name)).collect();
        assert_eq!(names.len(), library.len());
    }

    #[test]
    fn test_plan_exercise_seed_skips_existing_case_insensitively() {
        let existing = vec![stored("Barbell Bench Press")];
        let candidates = exercise_library().unwrap();
        let total = candidates.len();

        let (to_insert, skipped) = plan_exercise_seed(&existing, candidates);
        assert_eq!(skipped, vec!["Barbell Bench Press".to_string()]);
        assert_eq!(to_insert.len(), total - 1);
    }

    #[test]
    fn test_plan_exercise_seed_is_idempotent() {
        let library = exercise_library().unwrap();
        let existing: Vec<Exercise> = library
            .iter()
            .cloned()
            .map(|d| d.into_exercise("seed", Utc::now()))
            .collect();

        let (to_insert, skipped) = plan_exercise_seed(&existing, library.clone());
        assert!(to_insert.is_empty());
        assert_eq!(skipped.len(), library.len());
    }

    #[test]
    fn test_program_exercises_seed_plan() {
        let program = builtin_program().unwrap();
        let extracted = extract_exercises(&program);
        let (to_insert, skipped) = plan_exercise_seed(&[], extracted.clone());
        assert_eq!(to_insert.len(), extracted.len());
        assert!(skipped.is_empty());
    }

    #[test]
    fn test_program_reimport_is_conflict() {
        let now = Utc::now();
        let program = builtin_program().unwrap();
        let imported = plan_program_import(None, program.clone(), "admin-uid", now).unwrap();
        assert_eq!(imported.id, WorkoutProgram::document_id_for(&program.name));
        assert_eq!(imported.created_by.as_deref(), Some("admin-uid"));
        assert_eq!(imported.created_at, Some(now));

        let err = plan_program_import(Some(&imported), program, "admin-uid", now).unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }
}
