// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Gym Tracker: workout logging, exercise library and training stats
//!
//! This crate provides the backend API. Identity comes from Firebase
//! Authentication ID tokens, data lives in Firestore and workout images are
//! hosted on Cloudinary.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::FirestoreDb;
use services::{FirebaseTokenVerifier, MediaService, RoleService};
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: FirestoreDb,
    pub roles: RoleService,
    pub token_verifier: Arc<FirebaseTokenVerifier>,
    pub media: MediaService,
}
