// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Role resolution, the first-admin bootstrap protocol and the role cache.

use crate::db::FirestoreDb;
use crate::error::AppError;
use crate::models::role::{decide_sign_in, normalize_email};
use crate::models::{FirstAdminSetting, Identity, Role, SignInDecision, UserRole};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Cached role hints keyed by uid.
pub type RoleCache = Arc<DashMap<String, (Role, Instant)>>;

/// Whether anyone has an admin role and who is designated to become one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetupStatus {
    pub has_admin: bool,
    pub pending_email: Option<String>,
}

/// Role business logic on top of Firestore.
pub struct RoleService {
    db: FirestoreDb,
    cache: RoleCache,
    ttl: Duration,
}

impl RoleService {
    pub fn new(db: FirestoreDb, ttl: Duration) -> Self {
        Self {
            db,
            cache: Arc::new(DashMap::new()),
            ttl,
        }
    }

    /// Resolve (and persist) the role of a user who just signed in.
    pub async fn resolve_sign_in(&self, identity: &Identity) -> Result<Role, AppError> {
        let existing = self.db.get_user_role(&identity.uid).await?;
        let bootstrap = self.db.get_first_admin_setting().await?;
        let now = Utc::now();

        let decision = decide_sign_in(identity, existing.as_ref(), bootstrap.as_ref());
        tracing::debug!(uid = %identity.uid, ?decision, "Resolved sign-in role");
        if !identity.email_verified && bootstrap.as_ref().is_some_and(|b| b.matches(&identity.email)) {
            tracing::warn!(
                uid = %identity.uid,
                "Bootstrap email matched an unverified sign-in; not promoting"
            );
        }

        let role = match decision {
            SignInDecision::Keep(_) => decision.resulting_role(),
            SignInDecision::CreateUser => {
                let record = UserRole::new(identity, decision.resulting_role(), None, now);
                self.db.set_user_role(&record).await?;
                tracing::info!(uid = %identity.uid, "Created user role");
                record.role
            }
            SignInDecision::PromoteFirstAdmin => {
                let record = UserRole::new(identity, decision.resulting_role(), existing.as_ref(), now);
                match self.db.promote_first_admin_atomic(&record).await {
                    Ok(()) => record.role,
                    Err(e) => {
                        // The record was consumed or replaced by a concurrent request.
                        tracing::warn!(
                            uid = %identity.uid,
                            error = %e,
                            "First-admin promotion failed; falling back to stored role"
                        );
                        match self.db.get_user_role(&identity.uid).await? {
                            Some(current) => current.role,
                            None => {
                                let record = UserRole::new(identity, Role::User, None, now);
                                self.db.set_user_role(&record).await?;
                                Role::User
                            }
                        }
                    }
                }
            }
        };

        self.remember(&identity.uid, role);
        Ok(role)
    }

    /// Live role check for admin-only operations. Never served from cache.
    pub async fn require_admin(&self, uid: &str) -> Result<UserRole, AppError> {
        match self.db.get_user_role(uid).await? {
            Some(record) if record.role.is_admin() => {
                self.remember(uid, Role::Admin);
                Ok(record)
            }
            Some(record) => {
                self.remember(uid, record.role);
                Err(AppError::Forbidden("Admin role required".to_string()))
            }
            None => Err(AppError::Forbidden("Admin role required".to_string())),
        }
    }

    /// Role hint for display, served from cache while fresh.
    pub async fn cached_role(&self, uid: &str) -> Result<Role, AppError> {
        if let Some(entry) = self.cache.get(uid) {
            let (role, cached_at) = *entry;
            if cached_at.elapsed() < self.ttl {
                return Ok(role);
            }
        }

        let role = self
            .db
            .get_user_role(uid)
            .await?
            .map(|r| r.role)
            .unwrap_or_default();
        self.remember(uid, role);
        Ok(role)
    }

    pub fn invalidate(&self, uid: &str) {
        self.cache.remove(uid);
    }

    fn remember(&self, uid: &str, role: Role) {
        self.cache.insert(uid.to_string(), (role, Instant::now()));
    }

    /// Change a user's role.
    ///
    /// The last-admin check and the write share one transaction.
    pub async fn set_role(&self, target_uid: &str, role: Role) -> Result<UserRole, AppError> {
        let now = Utc::now();
        let updated = self
            .db
            .update_user_role_atomic(target_uid, |current, admin_count| {
                check_role_change(current, role, admin_count)?;
                Ok(with_role(current, role, now))
            })
            .await?;
        self.invalidate(target_uid);

        tracing::info!(uid = %target_uid, role = role.as_str(), "User role updated");
        Ok(updated)
    }

    pub async fn list_users(&self) -> Result<Vec<UserRole>, AppError> {
        self.db.list_user_roles().await
    }

    pub async fn setup_status(&self) -> Result<SetupStatus, AppError> {
        let admins = self.db.list_admins().await?;
        let pending = self.db.get_first_admin_setting().await?;

        Ok(SetupStatus {
            has_admin: !admins.is_empty(),
            pending_email: pending.map(|p| p.email),
        })
    }

    /// Record the email that becomes admin on its next sign-in.
    ///
    /// When admins exist, a forced reset by an admin demotes all of them in
    /// the same transaction.
    pub async fn request_first_admin(
        &self,
        caller_uid: &str,
        email: &str,
        force_reset: bool,
    ) -> Result<FirstAdminSetting, AppError> {
        let email = normalize_email(email);
        if email.is_empty() {
            return Err(AppError::BadRequest("Email is required".to_string()));
        }

        let admins = self.db.list_admins().await?;
        let caller_is_admin = admins.iter().any(|a| a.uid == caller_uid);
        let demote = check_setup_allowed(!admins.is_empty(), caller_is_admin, force_reset)?;

        let now = Utc::now();
        let setting = FirstAdminSetting {
            email,
            created_at: Some(now),
        };
        let demoted = if demote {
            demoted_roles(&admins, now)
        } else {
            Vec::new()
        };

        self.db.reset_admins_atomic(&demoted, Some(&setting)).await?;
        for role in &demoted {
            self.invalidate(&role.uid);
        }

        tracing::info!(
            caller = %caller_uid,
            demoted = demoted.len(),
            "First-admin bootstrap record written"
        );
        Ok(setting)
    }

    /// Demote every admin and clear any pending bootstrap record.
    pub async fn reset_admins(&self) -> Result<usize, AppError> {
        let admins = self.db.list_admins().await?;
        let demoted = demoted_roles(&admins, Utc::now());

        self.db.reset_admins_atomic(&demoted, None).await?;
        for role in &demoted {
            self.invalidate(&role.uid);
        }

        tracing::warn!(demoted = demoted.len(), "All admin roles reset");
        Ok(demoted.len())
    }
}

/// Decide whether a bootstrap request may proceed.
///
/// Returns whether existing admins must be demoted first.
pub fn check_setup_allowed(
    has_admins: bool,
    caller_is_admin: bool,
    force_reset: bool,
) -> Result<bool, AppError> {
    match (has_admins, force_reset, caller_is_admin) {
        (false, _, _) => Ok(false),
        (true, false, _) => Err(AppError::Conflict(
            "An admin already exists; use force_reset to replace".to_string(),
        )),
        (true, true, false) => Err(AppError::Forbidden(
            "Only an admin can force an admin reset".to_string(),
        )),
        (true, true, true) => Ok(true),
    }
}

/// Reject role changes that would leave no admin.
pub fn check_role_change(current: &UserRole, new_role: Role, admin_count: usize) -> Result<(), AppError> {
    if current.role.is_admin() && !new_role.is_admin() && admin_count <= 1 {
        return Err(AppError::Conflict(
            "Cannot demote the last admin".to_string(),
        ));
    }
    Ok(())
}

fn with_role(current: &UserRole, role: Role, now: DateTime<Utc>) -> UserRole {
    UserRole {
        role,
        updated_at: Some(now),
        ..current.clone()
    }
}

fn demoted_roles(admins: &[UserRole], now: DateTime<Utc>) -> Vec<UserRole> {
    admins
        .iter()
        .map(|admin| with_role(admin, Role::User, now))
        .collect()
}
