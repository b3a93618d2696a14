// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Gym Tracker API Server
//!
//! Serves workout logging, the exercise library, training statistics and
//! admin tooling on top of Firestore.

use gym_tracker::{
    config::Config,
    db::FirestoreDb,
    services::{FirebaseTokenVerifier, MediaService, RoleService},
    AppState,
};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging for GCP
    init_logging()?;

    // Load configuration from environment
    let config = Config::from_env()?;
    tracing::info!(port = config.port, "Starting Gym Tracker API");

    let db = FirestoreDb::new(&config.gcp_project_id).await?;

    let roles = RoleService::new(
        db.clone(),
        Duration::from_secs(config.role_cache_ttl_secs),
    );
    tracing::info!(ttl_secs = config.role_cache_ttl_secs, "Role cache initialized");

    let token_verifier = Arc::new(FirebaseTokenVerifier::new(&config)?);
    let media = MediaService::new(config.cloudinary.clone())?;

    // Build shared state
    let state = Arc::new(AppState {
        config: config.clone(),
        db,
        roles,
        token_verifier,
        media,
    });

    // Build router
    let app = gym_tracker::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging (GCP-compliant).
fn init_logging() -> Result<(), Box<dyn std::error::Error>> {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("gym_tracker=debug".parse()?)
                .add_directive("info".parse()?),
        )
        .with(format)
        .init();
    Ok(())
}
