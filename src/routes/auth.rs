// ABOUTME: Account routes - register, login, logout, session introspection, password change
// ABOUTME: Login sets the auth_token cookie; remembered sessions persist for 30 days
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Colloquy Contributors

use crate::auth::{hash_password, verify_password, UNAUTHORIZED_MSG};
use crate::errors::{AppError, AppResult};
use crate::resources::ServerResources;
use crate::routes::authenticate;
use crate::security::cookies::{clear_session_cookie, session_cookie};
use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::info;

/// Minimum password length at registration
const MIN_PASSWORD_LEN: usize = 8;

/// Registration request
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    /// Desired username
    pub username: String,
    /// Email address
    pub email: String,
    /// Password
    pub password: String,
    /// Password repeated for confirmation
    #[serde(rename = "confirmPassword")]
    pub confirm_password: String,
}

/// Login request
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    /// Username or email
    pub identifier: String,
    /// Password
    pub password: String,
    /// Keep the session for 30 days
    #[serde(default)]
    pub remember: bool,
}

/// Password change request
#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    /// Current password; optional only while a forced reset is pending
    #[serde(rename = "currentPassword")]
    pub current_password: Option<String>,
    /// Replacement password
    #[serde(rename = "newPassword")]
    pub new_password: Option<String>,
}

/// Envelope returned by register, login, and logout
#[derive(Debug, Serialize)]
pub struct AuthEnvelope {
    /// Whether the operation succeeded
    pub success: bool,
    /// Where the client should navigate next
    pub redirect: &'static str,
    /// Session token, present after login
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

/// Account route handlers
pub struct AuthRoutes;

impl AuthRoutes {
    /// Create all account routes
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route("/api/auth/register", post(Self::register))
            .route("/api/auth/login", post(Self::login))
            .route("/api/auth/logout", post(Self::logout))
            .route("/api/auth/me", get(Self::me))
            .route("/api/auth/change-password", post(Self::change_password))
            .with_state(resources)
    }

    /// Register a new account. Validation runs before any write: password
    /// mismatch and short passwords are 400, taken identifiers are 409.
    async fn register(
        State(resources): State<Arc<ServerResources>>,
        Json(payload): Json<RegisterRequest>,
    ) -> AppResult<Json<AuthEnvelope>> {
        if payload.password != payload.confirm_password {
            return Err(AppError::invalid_input("Passwords do not match"));
        }
        if payload.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AppError::invalid_input(
                "Password must be at least 8 characters",
            ));
        }

        let users = resources.database.users();
        if users
            .identifier_taken(&payload.username, &payload.email)
            .await?
        {
            return Err(AppError::already_exists("Username or email already taken"));
        }

        let password_hash = run_blocking_hash(payload.password).await?;
        let user = users
            .create(&payload.username, &payload.email, &password_hash)
            .await?;
        info!(user_id = %user.id, "Registered user");

        Ok(Json(AuthEnvelope {
            success: true,
            redirect: "/login",
            token: None,
        }))
    }

    /// Log in with a username or email. A missing account and a wrong
    /// password produce the same 401.
    async fn login(
        State(resources): State<Arc<ServerResources>>,
        Json(payload): Json<LoginRequest>,
    ) -> Result<Response, AppError> {
        let user = resources
            .database
            .users()
            .find_by_identifier(&payload.identifier)
            .await?
            .ok_or_else(|| AppError::auth_invalid("Invalid username or password"))?;

        let verified = run_blocking_verify(payload.password, user.password_hash.clone()).await?;
        if !verified {
            return Err(AppError::auth_invalid("Invalid username or password"));
        }

        let token = resources.auth.generate_token(&user, payload.remember)?;
        let cookie = session_cookie(&token, payload.remember);
        info!(user_id = %user.id, remember = payload.remember, "User logged in");

        let body = AuthEnvelope {
            success: true,
            redirect: "/",
            token: Some(token),
        };
        Ok((StatusCode::OK, [(header::SET_COOKIE, cookie)], Json(body)).into_response())
    }

    /// Clear the session cookie
    async fn logout() -> Response {
        let body = AuthEnvelope {
            success: true,
            redirect: "/login",
            token: None,
        };
        (
            StatusCode::OK,
            [(header::SET_COOKIE, clear_session_cookie())],
            Json(body),
        )
            .into_response()
    }

    /// Return the claims of the current session
    async fn me(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
    ) -> AppResult<Json<serde_json::Value>> {
        let claims = authenticate(&headers, &resources)?;
        Ok(Json(json!({
            "user": {
                "sub": claims.sub,
                "username": claims.username,
                "email": claims.email,
            }
        })))
    }

    /// Change the password of the current session's account. The current
    /// password is required unless a forced reset is pending. The session
    /// token is reissued without the remember flag.
    async fn change_password(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Json(payload): Json<ChangePasswordRequest>,
    ) -> Result<Response, AppError> {
        let Some(new_password) = payload.new_password else {
            return Err(AppError::invalid_input("Missing new password"));
        };
        if !password_is_strong(&new_password) {
            return Err(AppError::invalid_input(
                "Password must be at least 8 characters and include uppercase, lowercase, and digits",
            ));
        }

        let claims = authenticate(&headers, &resources)?;
        let users = resources.database.users();
        let user = users
            .find_by_id(&claims.sub)
            .await?
            .ok_or_else(|| AppError::auth_invalid(UNAUTHORIZED_MSG))?;

        if !user.needs_password_reset {
            let Some(current) = payload.current_password else {
                return Err(AppError::invalid_input("Missing current password"));
            };
            let verified = run_blocking_verify(current, user.password_hash.clone()).await?;
            if !verified {
                return Err(AppError::invalid_input("Current password is incorrect"));
            }
        }

        let password_hash = run_blocking_hash(new_password).await?;
        users.update_password(&user.id, &password_hash).await?;
        info!(user_id = %user.id, "Password changed");

        // Reissue the session so the cookie outlives the rotation
        let token = resources.auth.generate_token(&user, false)?;
        let cookie = session_cookie(&token, false);

        Ok((
            StatusCode::OK,
            [(header::SET_COOKIE, cookie)],
            Json(json!({"ok": true})),
        )
            .into_response())
    }
}

/// At least 8 characters with uppercase, lowercase, and a digit
fn password_is_strong(password: &str) -> bool {
    password.chars().count() >= MIN_PASSWORD_LEN
        && password.chars().any(|c| c.is_ascii_uppercase())
        && password.chars().any(|c| c.is_ascii_lowercase())
        && password.chars().any(|c| c.is_ascii_digit())
}

/// Hash on a blocking thread; bcrypt is deliberately slow
async fn run_blocking_hash(password: String) -> AppResult<String> {
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| AppError::internal(format!("Hashing task failed: {e}")))?
}

/// Verify on a blocking thread
async fn run_blocking_verify(password: String, hash: String) -> AppResult<bool> {
    tokio::task::spawn_blocking(move || verify_password(&password, &hash))
        .await
        .map_err(|e| AppError::internal(format!("Verification task failed: {e}")))?
}
