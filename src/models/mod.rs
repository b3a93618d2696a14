// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Data models for the application.

pub mod exercise;
pub mod program;
pub mod role;
pub mod stats;
pub mod workout;

pub use exercise::{Exercise, ExerciseDefinition};
pub use program::WorkoutProgram;
pub use role::{FirstAdminSetting, Identity, Role, SignInDecision, UserRole};
pub use stats::{PeriodTotals, WorkoutStats};
pub use workout::{Workout, WorkoutExercise, WorkoutSet};
