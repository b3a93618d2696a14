// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod firebase_auth;
pub mod media;
pub mod roles;
pub mod seed;

pub use firebase_auth::{FirebaseTokenVerifier, TokenError};
pub use media::MediaService;
pub use roles::{RoleService, SetupStatus};
pub use seed::SeedReport;
