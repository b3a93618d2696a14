// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session routes: exchange a Firebase ID token for a session cookie.

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

use crate::error::{AppError, Result};
use crate::middleware::auth::{create_jwt, SESSION_COOKIE, SESSION_TTL_SECS};
use crate::models::Role;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/session", post(create_session))
        .route("/auth/logout", post(logout))
}

#[derive(Debug, Deserialize, Validate)]
pub struct SessionRequest {
    #[validate(length(min = 1))]
    pub id_token: String,
}

#[derive(Debug, Serialize)]
pub struct SessionUser {
    pub uid: String,
    pub email: String,
    pub display_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub user: SessionUser,
    pub role: Role,
    pub is_admin: bool,
    /// Same value as the cookie, for clients that send a Bearer header
    pub token: String,
}

/// Build the session cookie. `secure` is off only for plain-HTTP frontends.
pub fn session_cookie(token: String, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::seconds(SESSION_TTL_SECS as i64))
        .build()
}

fn removal_cookie(secure: bool) -> Cookie<'static> {
    let mut cookie = session_cookie(String::new(), secure);
    cookie.make_removal();
    cookie
}

fn secure_cookies(state: &AppState) -> bool {
    state.config.frontend_url.starts_with("https://")
}

/// Verify an ID token, resolve the user's role and start a session.
async fn create_session(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(req): Json<SessionRequest>,
) -> Result<(CookieJar, Json<SessionResponse>)> {
    req.validate()?;

    let identity = state.token_verifier.verify(req.id_token.trim()).await?;
    let role = state.roles.resolve_sign_in(&identity).await?;

    let token = create_jwt(&identity, &state.config.jwt_signing_key)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("JWT creation failed: {}", e)))?;

    tracing::info!(
        uid = %identity.uid,
        role = role.as_str(),
        "Session created"
    );

    let jar = jar.add(session_cookie(token.clone(), secure_cookies(&state)));
    Ok((
        jar,
        Json(SessionResponse {
            user: SessionUser {
                uid: identity.uid,
                email: identity.email,
                display_name: identity.display_name,
            },
            role,
            is_admin: role.is_admin(),
            token,
        }),
    ))
}

/// Clear the session cookie.
async fn logout(State(state): State<Arc<AppState>>, jar: CookieJar) -> (CookieJar, StatusCode) {
    let jar = jar.add(removal_cookie(secure_cookies(&state)));
    (jar, StatusCode::NO_CONTENT)
}
