//! Database layer (Firestore).

pub mod firestore;

pub use firestore::{FirestoreDb, WorkoutQuery, WorkoutQueryCursor};

/// Collection names as constants.
pub mod collections {
    pub const WORKOUTS: &str = "workouts";
    pub const EXERCISES: &str = "exercises";
    /// Role documents (keyed by uid)
    pub const USER_ROLES: &str = "userRoles";
    pub const ADMIN_SETTINGS: &str = "adminSettings";
    pub const PROGRAMS: &str = "programs";
}

/// Document id of the first-admin bootstrap record in `adminSettings`.
pub const FIRST_ADMIN_DOC: &str = "firstAdmin";
