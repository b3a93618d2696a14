// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! User roles and the first-admin bootstrap record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Access level of a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    #[default]
    User,
}

impl Role {
    pub fn is_admin(self) -> bool {
        matches!(self, Role::Admin)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::User => "user",
        }
    }
}

/// Role document, keyed by uid in `userRoles`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRole {
    pub uid: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub role: Role,
    #[serde(default, with = "firestore::serialize_as_optional_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, with = "firestore::serialize_as_optional_timestamp")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl UserRole {
    /// Build a role document, keeping `created_at` from an existing record.
    pub fn new(
        identity: &Identity,
        role: Role,
        existing: Option<&UserRole>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            uid: identity.uid.clone(),
            email: identity.email.clone(),
            display_name: identity.display_name.clone(),
            role,
            created_at: existing.and_then(|r| r.created_at).or(Some(now)),
            updated_at: Some(now),
        }
    }
}

/// Singleton bootstrap record at `adminSettings/firstAdmin`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FirstAdminSetting {
    pub email: String,
    #[serde(default, with = "firestore::serialize_as_optional_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
}

impl FirstAdminSetting {
    /// Whether this record designates the given email.
    pub fn matches(&self, email: &str) -> bool {
        let designated = normalize_email(&self.email);
        !designated.is_empty() && designated == normalize_email(email)
    }
}

/// Verified identity of a signed-in user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub uid: String,
    pub email: String,
    /// Whether the identity provider has confirmed ownership of `email`.
    pub email_verified: bool,
    pub display_name: Option<String>,
}

/// Outcome of resolving a user's role at sign-in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignInDecision {
    /// The user already has a role document; nothing to write.
    Keep(Role),
    /// First sign-in: create a plain `user` role document.
    CreateUser,
    /// The bootstrap record names this user: promote and consume the record.
    PromoteFirstAdmin,
}

impl SignInDecision {
    /// Role the user ends up with.
    pub fn resulting_role(self) -> Role {
        match self {
            SignInDecision::Keep(role) => role,
            SignInDecision::CreateUser => Role::User,
            SignInDecision::PromoteFirstAdmin => Role::Admin,
        }
    }
}

/// Decide what to write for a user signing in.
///
/// Only a verified email can claim the bootstrap record.
pub fn decide_sign_in(
    identity: &Identity,
    existing: Option<&UserRole>,
    bootstrap: Option<&FirstAdminSetting>,
) -> SignInDecision {
    if identity.email_verified && bootstrap.is_some_and(|b| b.matches(&identity.email)) {
        return SignInDecision::PromoteFirstAdmin;
    }

    match existing {
        Some(role) => SignInDecision::Keep(role.role),
        None => SignInDecision::CreateUser,
    }
}

/// Lowercased, trimmed email for comparisons.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(email: &str) -> Identity {
        Identity {
            uid: "uid-1".to_string(),
            email: email.to_string(),
            email_verified: true,
            display_name: Some("Test User".to_string()),
        }
    }

    fn bootstrap(email: &str) -> FirstAdminSetting {
        FirstAdminSetting {
            email: email.to_string(),
            created_at: None,
        }
    }

    #[test]
    fn test_fresh_user_gets_user_role() {
        let decision = decide_sign_in(&identity("a@example.com"), None, None);
        assert_eq!(decision, SignInDecision::CreateUser);
        assert_eq!(decision.resulting_role(), Role::User);
    }

    #[test]
    fn test_fresh_user_matching_bootstrap_is_promoted() {
        let setting = bootstrap("Owner@Example.com ");
        let decision = decide_sign_in(&identity("owner@example.com"), None, Some(&setting));
        assert_eq!(decision, SignInDecision::PromoteFirstAdmin);
        assert_eq!(decision.resulting_role(), Role::Admin);
    }

    #[test]
    fn test_unverified_email_cannot_claim_bootstrap() {
        let setting = bootstrap("owner@example.com");
        let mut claimant = identity("owner@example.com");
        claimant.email_verified = false;

        let decision = decide_sign_in(&claimant, None, Some(&setting));
        assert_eq!(decision, SignInDecision::CreateUser);
        assert_eq!(decision.resulting_role(), Role::User);

        let existing = UserRole::new(&claimant, Role::User, None, Utc::now());
        let decision = decide_sign_in(&claimant, Some(&existing), Some(&setting));
        assert_eq!(decision, SignInDecision::Keep(Role::User));
    }

    #[test]
    fn test_non_matching_bootstrap_is_ignored() {
        let setting = bootstrap("owner@example.com");
        let decision = decide_sign_in(&identity("someone@example.com"), None, Some(&setting));
        assert_eq!(decision, SignInDecision::CreateUser);
    }

    #[test]
    fn test_existing_user_matching_bootstrap_is_promoted() {
        let now = Utc::now();
        let existing = UserRole::new(&identity("owner@example.com"), Role::User, None, now);
        let setting = bootstrap("owner@example.com");
        let decision = decide_sign_in(
            &identity("owner@example.com"),
            Some(&existing),
            Some(&setting),
        );
        assert_eq!(decision, SignInDecision::PromoteFirstAdmin);
    }

    #[test]
    fn test_existing_role_is_kept() {
        let now = Utc::now();
        let existing = UserRole::new(&identity("a@example.com"), Role::Admin, None, now);
        let decision = decide_sign_in(&identity("a@example.com"), Some(&existing), None);
        assert_eq!(decision, SignInDecision::Keep(Role::Admin));
    }

    #[test]
    fn test_empty_bootstrap_email_never_matches() {
        let setting = bootstrap("   ");
        assert!(!setting.matches(""));
    }

    #[test]
    fn test_role_update_preserves_created_at() {
        let created = chrono::DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let first = UserRole::new(&identity("a@example.com"), Role::User, None, created);
        let later = Utc::now();
        let updated = UserRole::new(&identity("a@example.com"), Role::Admin, Some(&first), later);

        assert_eq!(updated.created_at, Some(created));
        assert_eq!(updated.updated_at, Some(later));
        assert_eq!(updated.role, Role::Admin);
    }

    #[test]
    fn test_role_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Role::Admin).unwrap(), "\"admin\"");
        let role: Role = serde_json::from_str("\"user\"").unwrap();
        assert_eq!(role, Role::User);
    }
}
