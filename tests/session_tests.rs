// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session exchange and logout cookie tests.
//!
//! ID tokens are signed with the static RSA key in `tests/fixtures/`.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    response::Response,
    Router,
};
use gym_tracker::middleware::auth::SESSION_COOKIE;
use serde_json::json;
use tower::ServiceExt;

mod common;

async fn post_session(app: Router, id_token: &str) -> Response {
    app.oneshot(
        Request::builder()
            .method("POST")
            .uri("/auth/session")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json!({ "id_token": id_token }).to_string()))
            .unwrap(),
    )
    .await
    .unwrap()
}

fn set_cookie_headers(response: &Response) -> Vec<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|value| value.to_str().unwrap().to_string())
        .collect()
}

fn find_cookie(headers: &[String], name: &str) -> String {
    headers
        .iter()
        .find(|value| value.starts_with(&format!("{name}=")))
        .cloned()
        .unwrap_or_else(|| panic!("missing Set-Cookie header for {name}: {headers:?}"))
}

#[tokio::test]
async fn test_session_rejects_garbage_token() {
    let (app, _) = common::create_test_app();
    let response = post_session(app, "not-a-jwt").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_session_rejects_empty_token() {
    let (app, _) = common::create_test_app();
    let response = post_session(app, "").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_session_rejects_unknown_kid() {
    let (app, state) = common::create_test_app();
    let token = common::create_test_id_token_with_kid(
        &state.config.firebase_project_id,
        "uid-1",
        "lifter@example.com",
        "rotated-away",
    );

    let response = post_session(app, &token).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_session_rejects_other_project() {
    let (app, _) = common::create_test_app();
    let token = common::create_test_id_token("someone-elses-project", "uid-1", "lifter@example.com");

    let response = post_session(app, &token).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_session_valid_token_reaches_role_lookup() {
    let (app, state) = common::create_test_app();
    let token = common::create_test_id_token(
        &state.config.firebase_project_id,
        "uid-1",
        "lifter@example.com",
    );

    let response = post_session(app, &token).await;
    // Token verification passed; role resolution needs Firestore
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(set_cookie_headers(&response).is_empty());
}

#[tokio::test]
async fn test_logout_cookie_removal_localhost_attributes() {
    let (app, _) = common::create_test_app_with_frontend_url("http://localhost:5173");

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/auth/logout")
                .header(header::COOKIE, format!("{SESSION_COOKIE}=test"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let set_cookies = set_cookie_headers(&response);
    let token_cookie = find_cookie(&set_cookies, SESSION_COOKIE);
    assert!(token_cookie.contains("Max-Age=0"));
    assert!(token_cookie.contains("Path=/"));
    assert!(token_cookie.contains("HttpOnly"));
    assert!(!token_cookie.contains("Secure"));
}

#[tokio::test]
async fn test_logout_cookie_removal_production_attributes() {
    let (app, _) = common::create_test_app_with_frontend_url("https://gym.example.com");

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/auth/logout")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let token_cookie = find_cookie(&set_cookie_headers(&response), SESSION_COOKIE);
    assert!(token_cookie.contains("Max-Age=0"));
    assert!(token_cookie.contains("Secure"));
    assert!(token_cookie.contains("SameSite=Lax"));
}

#[tokio::test]
async fn test_full_session_flow() {
    require_emulator!();

    let (app, state) = common::create_emulator_app().await;
    let uid = format!("session-{}", common::unique_id());
    let token = common::create_test_id_token(
        &state.config.firebase_project_id,
        &uid,
        &format!("{uid}@example.com"),
    );

    let response = post_session(app.clone(), &token).await;
    assert_eq!(response.status(), StatusCode::OK);

    let session_cookie = find_cookie(&set_cookie_headers(&response), SESSION_COOKIE);
    let cookie_pair = session_cookie.split(';').next().unwrap().to_string();

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["user"]["uid"], uid.as_str());
    assert_eq!(json["role"], "user");

    let me = app
        .oneshot(
            Request::builder()
                .uri("/api/me")
                .header(header::COOKIE, cookie_pair)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(me.status(), StatusCode::OK);
}
