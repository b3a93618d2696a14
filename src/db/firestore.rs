// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper with typed operations.
//!
//! Provides high-level operations for:
//! - Workouts (user-scoped training logs)
//! - Exercises (global library)
//! - User roles and the first-admin bootstrap record
//! - Imported workout programs

use crate::db::{collections, FIRST_ADMIN_DOC};
use crate::error::AppError;
use crate::models::{Exercise, FirstAdminSetting, Role, UserRole, Workout, WorkoutProgram};
use chrono::{DateTime, Utc};
use firestore::errors::FirestoreError;
use firestore::{
    FirestoreConsistencySelector, FirestoreQueryDirection, FirestoreTimestamp,
    FirestoreWritePrecondition,
};
use futures_util::{stream, StreamExt};

const MAX_CONCURRENT_DB_OPS: usize = 50;
// Firestore limits transactions to 500 writes; keep headroom.
const MAX_TRANSACTION_WRITES: usize = 400;

/// Position after which the next page of workouts starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkoutQueryCursor {
    pub date: DateTime<Utc>,
    pub workout_id: String,
}

/// Filters for listing a user's workouts (newest first).
#[derive(Debug, Clone, Default)]
pub struct WorkoutQuery {
    /// Inclusive lower bound on `date`
    pub from: Option<DateTime<Utc>>,
    /// Inclusive upper bound on `date`
    pub to: Option<DateTime<Utc>>,
    pub cursor: Option<WorkoutQueryCursor>,
    /// Maximum number of results; `None` returns everything
    pub limit: Option<u32>,
}

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: Option<firestore::FirestoreDb>,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a mock Firestore client for testing (offline mode).
    ///
    /// All database operations will return an error if called.
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    /// Whether a real (or emulator) connection is configured.
    pub fn is_connected(&self) -> bool {
        self.client.is_some()
    }

    fn get_client(&self) -> Result<&firestore::FirestoreDb, AppError> {
        self.client
            .as_ref()
            .ok_or_else(|| AppError::Database("Database not connected (offline mode)".to_string()))
    }

    /// Cheap read used by diagnostics to confirm Firestore is reachable.
    pub async fn ping(&self) -> Result<(), AppError> {
        self.get_first_admin_setting().await.map(|_| ())
    }

    // ─── Workout Operations ──────────────────────────────────────

    /// Get a workout by document ID (no ownership check).
    pub async fn get_workout(&self, workout_id: &str) -> Result<Option<Workout>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::WORKOUTS)
            .obj()
            .one(workout_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// List a user's workouts, newest first.
    ///
    /// Workouts sharing the cursor's exact timestamp are fetched separately
    /// and ordered by ID, matching Firestore's implicit tie-break.
    pub async fn list_workouts(
        &self,
        user_id: &str,
        query: &WorkoutQuery,
    ) -> Result<Vec<Workout>, AppError> {
        let mut results = Vec::new();
        let mut upper = query.to;
        let mut exclusive = false;

        if let Some(cursor) = &query.cursor {
            if query.to.is_none_or(|to| to >= cursor.date) {
                let mut same_instant = self
                    .query_workouts(user_id, Some(cursor.date), Some(cursor.date), false, None)
                    .await?;
                same_instant.retain(|w| w.id < cursor.workout_id);
                same_instant.sort_by(|a, b| b.id.cmp(&a.id));
                results.extend(same_instant);

                upper = Some(cursor.date);
                exclusive = true;
            }
        }

        if let Some(limit) = query.limit {
            if results.len() >= limit as usize {
                results.truncate(limit as usize);
                return Ok(results);
            }
        }
        let remaining = query.limit.map(|limit| limit - results.len() as u32);

        let page = self
            .query_workouts(user_id, query.from, upper, exclusive, remaining)
            .await?;
        results.extend(page);

        if let Some(from) = query.from {
            results.retain(|w| w.date >= from);
        }

        Ok(results)
    }

    async fn query_workouts(
        &self,
        user_id: &str,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
        to_exclusive: bool,
        limit: Option<u32>,
    ) -> Result<Vec<Workout>, AppError> {
        let user_id = user_id.to_string();

        let query = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::WORKOUTS)
            .filter(move |q| {
                q.for_all([
                    q.field("userId").eq(user_id.clone()),
                    from.and_then(|from| {
                        q.field("date")
                            .greater_than_or_equal(FirestoreTimestamp(from))
                    }),
                    to.and_then(|to| {
                        if to_exclusive {
                            q.field("date").less_than(FirestoreTimestamp(to))
                        } else {
                            q.field("date").less_than_or_equal(FirestoreTimestamp(to))
                        }
                    }),
                ])
            })
            .order_by([("date", FirestoreQueryDirection::Descending)]);

        let query = match limit {
            Some(limit) => query.limit(limit),
            None => query,
        };

        query
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create or replace a workout.
    pub async fn set_workout(&self, workout: &Workout) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::WORKOUTS)
            .document_id(&workout.id)
            .object(workout)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Delete a workout document.
    pub async fn delete_workout(&self, workout_id: &str) -> Result<(), AppError> {
        self.get_client()?
            .fluent()
            .delete()
            .from(collections::WORKOUTS)
            .document_id(workout_id)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    // ─── Exercise Operations ─────────────────────────────────────

    /// List library exercises ordered by name, optionally by muscle group.
    pub async fn list_exercises(&self, muscle_group: Option<&str>) -> Result<Vec<Exercise>, AppError> {
        let query = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::EXERCISES);

        let mut exercises: Vec<Exercise> = if let Some(group) = muscle_group {
            let group = group.to_string();
            query
                .filter(move |q| q.field("muscleGroup").eq(group.clone()))
                .obj()
                .query()
                .await
        } else {
            query
                .order_by([("name", FirestoreQueryDirection::Ascending)])
                .obj()
                .query()
                .await
        }
        .map_err(|e| AppError::Database(e.to_string()))?;

        // Filtered queries are sorted here to avoid needing a composite index.
        exercises.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(exercises)
    }

    pub async fn get_exercise(&self, exercise_id: &str) -> Result<Option<Exercise>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::EXERCISES)
            .obj()
            .one(exercise_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create or replace an exercise.
    pub async fn set_exercise(&self, exercise: &Exercise) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::EXERCISES)
            .document_id(&exercise.id)
            .object(exercise)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    pub async fn delete_exercise(&self, exercise_id: &str) -> Result<(), AppError> {
        self.get_client()?
            .fluent()
            .delete()
            .from(collections::EXERCISES)
            .document_id(exercise_id)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Store multiple exercises.
    ///
    /// Uses concurrent writes with a limit to avoid overloading Firestore.
    pub async fn insert_exercises(&self, exercises: &[Exercise]) -> Result<(), AppError> {
        let client = self.get_client()?;

        stream::iter(exercises.to_vec())
            .map(|exercise| async move {
                let _: () = client
                    .fluent()
                    .update()
                    .in_col(collections::EXERCISES)
                    .document_id(&exercise.id)
                    .object(&exercise)
                    .execute()
                    .await
                    .map_err(|e| AppError::Database(e.to_string()))?;

                Ok::<_, AppError>(())
            })
            .buffer_unordered(MAX_CONCURRENT_DB_OPS)
            .collect::<Vec<Result<(), AppError>>>()
            .await
            .into_iter()
            .collect::<Result<Vec<()>, AppError>>()?;

        Ok(())
    }

    // ─── Role Operations ─────────────────────────────────────────

    /// Get the role document for a user.
    pub async fn get_user_role(&self, uid: &str) -> Result<Option<UserRole>, AppError> {
        read_user_role(self.get_client()?, uid).await
    }

    /// Create or update a role document (keyed by uid).
    pub async fn set_user_role(&self, role: &UserRole) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::USER_ROLES)
            .document_id(&role.uid)
            .object(role)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// All role documents, ordered by email.
    pub async fn list_user_roles(&self) -> Result<Vec<UserRole>, AppError> {
        let mut roles: Vec<UserRole> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::USER_ROLES)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        roles.sort_by(|a, b| a.email.cmp(&b.email));
        Ok(roles)
    }

    /// Role documents with role `admin`.
    pub async fn list_admins(&self) -> Result<Vec<UserRole>, AppError> {
        read_admins(self.get_client()?).await
    }

    /// Change one role document, deciding from the target's current record
    /// and the number of admins as read inside the same transaction.
    ///
    /// Two concurrent demotions cannot both see the other admin: Firestore
    /// aborts one of them, which surfaces as `Conflict`.
    pub async fn update_user_role_atomic<F>(&self, uid: &str, change: F) -> Result<UserRole, AppError>
    where
        F: FnOnce(&UserRole, usize) -> Result<UserRole, AppError>,
    {
        let client = self.get_client()?;

        let transaction = client
            .begin_transaction()
            .await
            .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;
        let reader = client.clone_with_consistency_selector(FirestoreConsistencySelector::Transaction(
            transaction.transaction_id().clone(),
        ));

        let prepared = async {
            let current = read_user_role(&reader, uid)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("User {} not found", uid)))?;
            let admins = read_admins(&reader).await?;
            change(&current, admins.len())
        }
        .await;

        let updated = match prepared {
            Ok(updated) => updated,
            Err(e) => {
                let _ = transaction.rollback().await;
                return Err(e);
            }
        };

        let mut transaction = transaction;
        client
            .fluent()
            .update()
            .in_col(collections::USER_ROLES)
            .document_id(&updated.uid)
            .object(&updated)
            .add_to_transaction(&mut transaction)
            .map_err(|e| AppError::Database(format!("Failed to add role to transaction: {}", e)))?;

        transaction.commit().await.map_err(commit_error)?;
        Ok(updated)
    }

    // ─── First-Admin Bootstrap ───────────────────────────────────

    pub async fn get_first_admin_setting(&self) -> Result<Option<FirstAdminSetting>, AppError> {
        read_first_admin_setting(self.get_client()?).await
    }

    /// Atomically promote a user to admin and consume the bootstrap record.
    ///
    /// The bootstrap record is re-read inside the transaction and must still
    /// name `role.email`; a record replaced or consumed since the caller read
    /// it fails with `Conflict` and nothing is written.
    pub async fn promote_first_admin_atomic(&self, role: &UserRole) -> Result<(), AppError> {
        let client = self.get_client()?;

        let transaction = client
            .begin_transaction()
            .await
            .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;
        let reader = client.clone_with_consistency_selector(FirestoreConsistencySelector::Transaction(
            transaction.transaction_id().clone(),
        ));

        let claimable = match read_first_admin_setting(&reader).await {
            Ok(Some(setting)) if setting.matches(&role.email) => Ok(()),
            Ok(_) => Err(AppError::Conflict(
                "Bootstrap record no longer names this user".to_string(),
            )),
            Err(e) => Err(e),
        };
        if let Err(e) = claimable {
            let _ = transaction.rollback().await;
            return Err(e);
        }

        let mut transaction = transaction;

        client
            .fluent()
            .update()
            .in_col(collections::USER_ROLES)
            .document_id(&role.uid)
            .object(role)
            .add_to_transaction(&mut transaction)
            .map_err(|e| AppError::Database(format!("Failed to add role to transaction: {}", e)))?;

        client
            .fluent()
            .delete()
            .from(collections::ADMIN_SETTINGS)
            .document_id(FIRST_ADMIN_DOC)
            .precondition(FirestoreWritePrecondition::Exists(true))
            .add_to_transaction(&mut transaction)
            .map_err(|e| {
                AppError::Database(format!("Failed to add bootstrap delete to transaction: {}", e))
            })?;

        transaction.commit().await.map_err(commit_error)?;

        tracing::info!(uid = %role.uid, "First admin promoted atomically");
        Ok(())
    }

    /// Atomically write demoted role documents and replace (or clear) the
    /// bootstrap record.
    pub async fn reset_admins_atomic(
        &self,
        demoted: &[UserRole],
        bootstrap: Option<&FirstAdminSetting>,
    ) -> Result<(), AppError> {
        if demoted.len() + 1 > MAX_TRANSACTION_WRITES {
            return Err(AppError::Conflict(format!(
                "Too many admins to reset in one transaction: {}",
                demoted.len()
            )));
        }

        let client = self.get_client()?;

        let mut transaction = client
            .begin_transaction()
            .await
            .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

        for role in demoted {
            client
                .fluent()
                .update()
                .in_col(collections::USER_ROLES)
                .document_id(&role.uid)
                .object(role)
                .add_to_transaction(&mut transaction)
                .map_err(|e| {
                    AppError::Database(format!("Failed to add demotion to transaction: {}", e))
                })?;
        }

        match bootstrap {
            Some(setting) => {
                client
                    .fluent()
                    .update()
                    .in_col(collections::ADMIN_SETTINGS)
                    .document_id(FIRST_ADMIN_DOC)
                    .object(setting)
                    .add_to_transaction(&mut transaction)
                    .map_err(|e| {
                        AppError::Database(format!(
                            "Failed to add bootstrap record to transaction: {}",
                            e
                        ))
                    })?;
            }
            None => {
                client
                    .fluent()
                    .delete()
                    .from(collections::ADMIN_SETTINGS)
                    .document_id(FIRST_ADMIN_DOC)
                    .add_to_transaction(&mut transaction)
                    .map_err(|e| {
                        AppError::Database(format!(
                            "Failed to add bootstrap delete to transaction: {}",
                            e
                        ))
                    })?;
            }
        }

        transaction
            .commit()
            .await
            .map_err(|e| AppError::Database(format!("Transaction commit failed: {}", e)))?;

        tracing::info!(
            demoted = demoted.len(),
            bootstrap_set = bootstrap.is_some(),
            "Admin roles reset atomically"
        );
        Ok(())
    }

    // ─── Program Operations ──────────────────────────────────────

    /// Find an imported program by exact name.
    pub async fn find_program_by_name(&self, name: &str) -> Result<Option<WorkoutProgram>, AppError> {
        let name = name.to_string();
        let programs: Vec<WorkoutProgram> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::PROGRAMS)
            .filter(move |q| q.field("name").eq(name.clone()))
            .limit(1)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(programs.into_iter().next())
    }

    /// Create a program document. Fails with `Conflict` when the id is taken.
    pub async fn insert_program(&self, program: &WorkoutProgram) -> Result<(), AppError> {
        let _: WorkoutProgram = self
            .get_client()?
            .fluent()
            .insert()
            .into(collections::PROGRAMS)
            .document_id(&program.id)
            .object(program)
            .execute()
            .await
            .map_err(|e| match e {
                FirestoreError::DataConflictError(_) => AppError::Conflict(format!(
                    "Program '{}' already imported (id {})",
                    program.name, program.id
                )),
                e => AppError::Database(e.to_string()),
            })?;
        Ok(())
    }

    /// All imported programs, ordered by name.
    pub async fn list_programs(&self) -> Result<Vec<WorkoutProgram>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .from(collections::PROGRAMS)
            .order_by([("name", FirestoreQueryDirection::Ascending)])
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}

async fn read_user_role(
    client: &firestore::FirestoreDb,
    uid: &str,
) -> Result<Option<UserRole>, AppError> {
    client
        .fluent()
        .select()
        .by_id_in(collections::USER_ROLES)
        .obj()
        .one(uid)
        .await
        .map_err(|e| AppError::Database(e.to_string()))
}

async fn read_admins(client: &firestore::FirestoreDb) -> Result<Vec<UserRole>, AppError> {
    client
        .fluent()
        .select()
        .from(collections::USER_ROLES)
        .filter(|q| q.field("role").eq(Role::Admin.as_str()))
        .obj()
        .query()
        .await
        .map_err(|e| AppError::Database(e.to_string()))
}

async fn read_first_admin_setting(
    client: &firestore::FirestoreDb,
) -> Result<Option<FirstAdminSetting>, AppError> {
    client
        .fluent()
        .select()
        .by_id_in(collections::ADMIN_SETTINGS)
        .obj()
        .one(FIRST_ADMIN_DOC)
        .await
        .map_err(|e| AppError::Database(e.to_string()))
}

/// Aborted commits lost a race with another transaction.
fn commit_error(e: FirestoreError) -> AppError {
    match &e {
        FirestoreError::DatabaseError(db_err) if db_err.public.code == "Aborted" => {
            AppError::Conflict(format!("Concurrent update, retry: {}", e))
        }
        _ => AppError::Database(format!("Transaction commit failed: {}", e)),
    }
}
