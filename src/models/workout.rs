// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Workout model for storage and API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Separator used when joining categories into the display string.
pub const CATEGORY_SEPARATOR: &str = ", ";

/// Stored workout record in Firestore.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workout {
    /// Document ID (populated from Firestore on read, not stored in the body)
    #[serde(alias = "_firestore_id", default, skip_serializing)]
    pub id: String,
    /// Owning user (hosted-auth uid)
    pub user_id: String,
    /// Workout name/title
    pub name: String,
    /// When the workout took place
    #[serde(with = "firestore::serialize_as_timestamp")]
    pub date: DateTime<Utc>,
    /// Display string of categories ("Chest, Back")
    #[serde(default)]
    pub category: String,
    /// Individual categories
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub exercises: Vec<WorkoutExercise>,
    /// Sum of set counts across all exercises
    #[serde(default)]
    pub total_sets: u32,
    /// Duration in minutes
    #[serde(default, deserialize_with = "lenient_u32")]
    pub duration: u32,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub completed: bool,
    #[serde(default, with = "firestore::serialize_as_optional_timestamp")]
    pub completed_at: Option<DateTime<Utc>>,
    /// Hosted image URL
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default, with = "firestore::serialize_as_optional_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, with = "firestore::serialize_as_optional_timestamp")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// One exercise performed within a workout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkoutExercise {
    pub name: String,
    #[serde(default)]
    pub sets: Vec<WorkoutSet>,
}

/// A single set. Legacy documents store both fields as strings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WorkoutSet {
    #[serde(deserialize_with = "lenient_u32")]
    pub reps: u32,
    /// Weight in kilograms
    #[serde(deserialize_with = "lenient_f64")]
    pub weight: f64,
}

impl Workout {
    /// Recompute `total_sets` from the exercise list.
    pub fn recompute_totals(&mut self) {
        self.total_sets = count_sets(&self.exercises);
    }

    /// Total weight moved (reps × weight) across all sets.
    pub fn volume(&self) -> f64 {
        self.exercises
            .iter()
            .flat_map(|e| e.sets.iter())
            .map(|s| f64::from(s.reps) * s.weight)
            .sum()
    }

    /// Category list, falling back to splitting the display string for
    /// documents that only carry `category`.
    pub fn category_list(&self) -> Vec<String> {
        if !self.categories.is_empty() {
            return self.categories.clone();
        }
        split_categories(&self.category)
    }

    /// Whether the given user owns this workout.
    pub fn is_owned_by(&self, uid: &str) -> bool {
        !uid.is_empty() && self.user_id == uid
    }
}

/// Sum of set counts across exercises.
pub fn count_sets(exercises: &[WorkoutExercise]) -> u32 {
    exercises.iter().map(|e| e.sets.len() as u32).sum()
}

/// Split a joined category string into trimmed, non-empty parts.
pub fn split_categories(category: &str) -> Vec<String> {
    category
        .split(',')
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(String::from)
        .collect()
}

/// Reconcile the display string and list so both are populated.
///
/// The list wins when both are given.
pub fn normalize_categories(category: Option<String>, categories: Vec<String>) -> (String, Vec<String>) {
    let categories: Vec<String> = categories
        .into_iter()
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .collect();

    if !categories.is_empty() {
        return (categories.join(CATEGORY_SEPARATOR), categories);
    }

    let category = category.unwrap_or_default();
    let categories = split_categories(&category);
    (categories.join(CATEGORY_SEPARATOR), categories)
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Int(u64),
    Float(f64),
    Text(String),
}

fn lenient_u32<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    match NumberOrString::deserialize(deserializer)? {
        NumberOrString::Int(v) => u32::try_from(v).map_err(D::Error::custom),
        NumberOrString::Float(v) if v >= 0.0 => Ok(v as u32),
        NumberOrString::Float(v) => Err(D::Error::custom(format!("negative value: {v}"))),
        NumberOrString::Text(s) if s.trim().is_empty() => Ok(0),
        NumberOrString::Text(s) => s.trim().parse().map_err(D::Error::custom),
    }
}

fn lenient_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    match NumberOrString::deserialize(deserializer)? {
        NumberOrString::Int(v) => Ok(v as f64),
        NumberOrString::Float(v) => Ok(v),
        NumberOrString::Text(s) if s.trim().is_empty() => Ok(0.0),
        NumberOrString::Text(s) => s.trim().replace(',', ".").parse().map_err(D::Error::custom),
    }
}
