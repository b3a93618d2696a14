// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Workout programs (seed/import data) and exercise extraction.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashSet;

use crate::models::exercise::{name_key, ExerciseDefinition};

/// A multi-week training program: phases → workout days → exercises.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkoutProgram {
    /// Document ID (populated from Firestore on read)
    #[serde(alias = "_firestore_id", default, skip_serializing)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Program length in weeks
    pub duration_weeks: u32,
    /// Beginner, Intermediate, Advanced
    #[serde(default)]
    pub level: String,
    #[serde(default)]
    pub goal: String,
    #[serde(default)]
    pub phases: Vec<ProgramPhase>,
    #[serde(default)]
    pub created_by: Option<String>,
    #[serde(default, with = "firestore::serialize_as_optional_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgramPhase {
    pub id: String,
    pub name: String,
    pub weeks: u32,
    #[serde(default)]
    pub workout_days: Vec<ProgramDay>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgramDay {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub exercises: Vec<ProgramExercise>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgramExercise {
    pub name: String,
    pub sets: u32,
    /// 0 means "as many as possible"
    pub reps: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl WorkoutProgram {
    /// Number of distinct training days across all phases.
    pub fn total_days(&self) -> usize {
        self.phases.iter().map(|p| p.workout_days.len()).sum()
    }

    /// Document id for a program name. Importing the same name twice
    /// targets the same document.
    pub fn document_id_for(name: &str) -> String {
        format!("program-{}", hex::encode(Sha256::digest(name.trim().as_bytes())))
    }
}

/// Derive library entries for every distinct exercise in a program.
///
/// The muscle group comes from the day's focus and the exercise name;
/// equipment and difficulty from keywords in the name. First occurrence wins.
pub fn extract_exercises(program: &WorkoutProgram) -> Vec<ExerciseDefinition> {
    let mut seen = HashSet::new();
    let mut extracted = Vec::new();

    for phase in &program.phases {
        for day in &phase.workout_days {
            for exercise in &day.exercises {
                if !seen.insert(name_key(&exercise.name)) {
                    continue;
                }

                let muscle_group = infer_muscle_group(&day.name, &exercise.name);
                let equipment = infer_equipment(&exercise.name);
                let difficulty = infer_difficulty(&exercise.name);
                let description = format!(
                    "{} exercise using {}.",
                    muscle_group,
                    equipment.to_lowercase()
                );

                extracted.push(ExerciseDefinition {
                    name: exercise.name.clone(),
                    muscle_group: muscle_group.to_string(),
                    equipment: equipment.to_string(),
                    difficulty: difficulty.to_string(),
                    description,
                });
            }
        }
    }

    extracted
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| haystack.contains(n))
}

fn infer_muscle_group(day_name: &str, exercise_name: &str) -> &'static str {
    let day = day_name.to_lowercase();
    let name = exercise_name.to_lowercase();

    if contains_any(&day, &["push", "chest", "shoulder"]) {
        if name.contains("chest") || name.contains("bench") {
            "Chest"
        } else if contains_any(&name, &["shoulder", "lateral raise", "overhead"]) {
            "Shoulders"
        } else if contains_any(&name, &["tricep", "dip"]) {
            "Arms"
        } else {
            "Chest"
        }
    } else if contains_any(&day, &["pull", "back"]) {
        if contains_any(&name, &["curl", "bicep"]) {
            "Arms"
        } else {
            "Back"
        }
    } else if contains_any(&day, &["leg", "glute"]) {
        "Legs"
    } else if day.contains("full body") {
        if name.contains("deadlift") {
            "Back"
        } else if contains_any(&name, &["plank", "ab ", "abs", "rollout"]) {
            "Core"
        } else {
            "Full Body"
        }
    } else {
        "Other"
    }
}

fn infer_equipment(exercise_name: &str) -> &'static str {
    let name = exercise_name.to_lowercase();

    if contains_any(&name, &["barbell", "deadlift", "squat", "clean"]) {
        "Barbell"
    } else if contains_any(&name, &["dumbbell", "hammer", "farmer"]) {
        "Dumbbell"
    } else if contains_any(&name, &["cable", "pushdown", "face pull"]) {
        "Cable"
    } else if contains_any(&name, &["machine", "leg press", "pulldown"]) {
        "Machine"
    } else if contains_any(&name, &["pull-up", "push-up", "plank", "dip", "chin-up"]) {
        "Bodyweight"
    } else {
        "Other"
    }
}

fn infer_difficulty(exercise_name: &str) -> &'static str {
    let name = exercise_name.to_lowercase();

    if contains_any(&name, &["deadlift", "squat", "clean"]) {
        "Hard"
    } else if contains_any(&name, &["raise", "curl", "calf"]) {
        "Easy"
    } else {
        "Intermediate"
    }
}
