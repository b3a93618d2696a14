// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::body::Body;
use axum::http::{header, Request};
use gym_tracker::config::Config;
use gym_tracker::db::FirestoreDb;
use gym_tracker::middleware::auth::create_jwt;
use gym_tracker::models::Identity;
use gym_tracker::routes::create_router;
use gym_tracker::services::{FirebaseTokenVerifier, MediaService, RoleService};
use gym_tracker::AppState;
use jsonwebtoken::{encode, Algorithm, DecodingKey, EncodingKey, Header};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Key ID of the static test signing key.
#[allow(dead_code)]
pub const TEST_KID: &str = "test-kid";

const TEST_PRIVATE_KEY: &[u8] = include_bytes!("../fixtures/test_id_token_private.pem");
const TEST_PUBLIC_KEY: &[u8] = include_bytes!("../fixtures/test_id_token_public.pem");

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Create a mock database connection (offline).
#[allow(dead_code)]
pub fn test_db_offline() -> FirestoreDb {
    FirestoreDb::new_mock()
}

/// Unique suffix for test isolation.
#[allow(dead_code)]
pub fn unique_id() -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    format!("{nanos:x}")
}

fn build_app(config: Config, db: FirestoreDb) -> (axum::Router, Arc<AppState>) {
    let decoding_key =
        DecodingKey::from_rsa_pem(TEST_PUBLIC_KEY).expect("test public key should parse");
    let token_verifier = Arc::new(
        FirebaseTokenVerifier::new_with_static_key(&config, TEST_KID, decoding_key)
            .expect("static verifier should build"),
    );

    let roles = RoleService::new(db.clone(), Duration::from_secs(config.role_cache_ttl_secs));
    let media = MediaService::new(config.cloudinary.clone()).expect("media client should build");

    let state = Arc::new(AppState {
        config,
        db,
        roles,
        token_verifier,
        media,
    });

    (create_router(state.clone()), state)
}

/// Create a test app with offline mock dependencies.
/// Returns the router and the shared state.
#[allow(dead_code)]
pub fn create_test_app() -> (axum::Router, Arc<AppState>) {
    build_app(Config::test_default(), test_db_offline())
}

/// Create an offline test app whose frontend URL decides cookie security.
#[allow(dead_code)]
pub fn create_test_app_with_frontend_url(frontend_url: &str) -> (axum::Router, Arc<AppState>) {
    let mut config = Config::test_default();
    config.frontend_url = frontend_url.to_string();
    build_app(config, test_db_offline())
}

/// Create a test app backed by the Firestore emulator.
#[allow(dead_code)]
pub async fn create_emulator_app() -> (axum::Router, Arc<AppState>) {
    build_app(Config::test_default(), test_db().await)
}

/// Create a session JWT for the given user.
#[allow(dead_code)]
pub fn create_test_jwt(uid: &str, signing_key: &[u8]) -> String {
    let identity = Identity {
        uid: uid.to_string(),
        email: format!("{uid}@example.com"),
        email_verified: true,
        display_name: None,
    };
    create_jwt(&identity, signing_key).unwrap()
}

#[derive(Serialize)]
struct IdTokenClaims {
    iss: String,
    aud: String,
    sub: String,
    iat: u64,
    exp: u64,
    auth_time: u64,
    email: String,
    email_verified: bool,
}

/// Create a Firebase-style ID token signed with the static test key.
#[allow(dead_code)]
pub fn create_test_id_token(project_id: &str, uid: &str, email: &str) -> String {
    create_test_id_token_with_kid(project_id, uid, email, TEST_KID)
}

/// Same as [`create_test_id_token`] with an explicit key ID.
#[allow(dead_code)]
pub fn create_test_id_token_with_kid(project_id: &str, uid: &str, email: &str, kid: &str) -> String {
    sign_id_token(project_id, uid, email, kid, true)
}

/// ID token whose email the provider has not verified.
#[allow(dead_code)]
pub fn create_unverified_id_token(project_id: &str, uid: &str, email: &str) -> String {
    sign_id_token(project_id, uid, email, TEST_KID, false)
}

fn sign_id_token(project_id: &str, uid: &str, email: &str, kid: &str, email_verified: bool) -> String {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs();

    let claims = IdTokenClaims {
        iss: format!("https://securetoken.google.com/{project_id}"),
        aud: project_id.to_string(),
        sub: uid.to_string(),
        iat: now,
        exp: now + 3600,
        auth_time: now,
        email: email.to_string(),
        email_verified,
    };

    let mut header = Header::new(Algorithm::RS256);
    header.kid = Some(kid.to_string());

    encode(
        &header,
        &claims,
        &EncodingKey::from_rsa_pem(TEST_PRIVATE_KEY).expect("test private key should parse"),
    )
    .unwrap()
}

/// Smallest byte prefix the upload check accepts as a PNG.
#[allow(dead_code)]
pub const PNG_BYTES: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];

const MULTIPART_BOUNDARY: &str = "gym-tracker-test-boundary";

/// Authenticated multipart upload with a single field.
#[allow(dead_code)]
pub fn multipart_upload(uri: &str, token: &str, field: &str, bytes: &[u8]) -> Request<Body> {
    let mut body = format!(
        "--{MULTIPART_BOUNDARY}\r\n\
         Content-Disposition: form-data; name=\"{field}\"; filename=\"upload.bin\"\r\n\
         Content-Type: application/octet-stream\r\n\r\n"
    )
    .into_bytes();
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{MULTIPART_BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={MULTIPART_BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}
