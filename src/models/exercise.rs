// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Exercise library model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Library exercise stored in Firestore. Global, not user-scoped.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Exercise {
    /// Document ID (populated from Firestore on read)
    #[serde(alias = "_firestore_id", default, skip_serializing)]
    pub id: String,
    pub name: String,
    /// Primary muscle group ("Chest", "Back", ...)
    pub muscle_group: String,
    #[serde(default)]
    pub equipment: String,
    #[serde(default)]
    pub difficulty: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub created_by: Option<String>,
    #[serde(default, with = "firestore::serialize_as_optional_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_by: Option<String>,
    #[serde(default, with = "firestore::serialize_as_optional_timestamp")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Exercise definition without storage metadata (seed data, extraction).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseDefinition {
    pub name: String,
    pub muscle_group: String,
    pub equipment: String,
    pub difficulty: String,
    pub description: String,
}

impl ExerciseDefinition {
    /// Turn a definition into a new stored exercise.
    pub fn into_exercise(self, created_by: &str, now: DateTime<Utc>) -> Exercise {
        Exercise {
            id: uuid::Uuid::new_v4().to_string(),
            name: self.name,
            muscle_group: self.muscle_group,
            equipment: self.equipment,
            difficulty: self.difficulty,
            description: self.description,
            created_by: Some(created_by.to_string()),
            created_at: Some(now),
            updated_by: None,
            updated_at: None,
        }
    }
}

/// Case-insensitive key used to detect duplicate exercise names.
pub fn name_key(name: &str) -> String {
    name.trim().to_lowercase()
}
