// ABOUTME: JWT session token signing and validation plus password hashing helpers
// ABOUTME: Tokens are HS256 over a shared secret, with expiry only for remembered sessions
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Colloquy Contributors

//! # Authentication and Session Management
//!
//! Sessions are carried by an HS256 JWT. Tokens issued for a "remember me"
//! login expire after 30 days; all other tokens carry no expiry claim and
//! remain valid until the signing secret rotates.

use crate::errors::{AppError, AppResult};
use crate::models::User;
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

/// Lifetime of a remembered session in seconds (30 days)
pub const REMEMBER_SESSION_SECS: i64 = 60 * 60 * 24 * 30;

/// Message returned for every authentication failure.
/// Kept uniform so callers cannot distinguish missing, malformed,
/// tampered, and expired credentials.
pub const UNAUTHORIZED_MSG: &str = "Unauthorized";

/// `JWT` claims for user sessions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User ID
    pub sub: String,
    /// Username at issue time
    pub username: String,
    /// Email at issue time
    pub email: String,
    /// Issued-at timestamp
    pub iat: i64,
    /// Expiration timestamp; absent for non-remembered sessions
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
}

/// Authentication manager for session tokens
pub struct AuthManager {
    secret: String,
}

impl AuthManager {
    /// Create a new authentication manager over the shared signing secret
    #[must_use]
    pub const fn new(secret: String) -> Self {
        Self { secret }
    }

    /// Generate a session token for a user
    ///
    /// # Errors
    ///
    /// Returns an error if token encoding fails
    pub fn generate_token(&self, user: &User, remember: bool) -> AppResult<String> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: user.id.clone(),
            username: user.username.clone(),
            email: user.email.clone(),
            iat: now,
            exp: remember.then(|| now + REMEMBER_SESSION_SECS),
        };

        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| AppError::internal(format!("Failed to sign session token: {e}")))
    }

    /// Validate a session token and return its claims
    ///
    /// # Errors
    ///
    /// Returns a uniform 401 error for any invalid, tampered, or expired token
    pub fn validate_token(&self, token: &str) -> AppResult<Claims> {
        let mut validation = Validation::new(Algorithm::HS256);
        // exp is optional: tokens without it never expire, tokens with a
        // past exp are rejected
        validation.required_spec_claims.clear();

        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &validation,
        )
        .map(|data| data.claims)
        .map_err(|_| AppError::auth_invalid(UNAUTHORIZED_MSG))
    }
}

/// Hash a password with bcrypt
///
/// # Errors
///
/// Returns an error if hashing fails
pub fn hash_password(password: &str) -> AppResult<String> {
    bcrypt::hash(password, bcrypt::DEFAULT_COST)
        .map_err(|e| AppError::internal(format!("Failed to hash password: {e}")))
}

/// Verify a password against a stored bcrypt hash
///
/// # Errors
///
/// Returns an error if the stored hash is malformed
pub fn verify_password(password: &str, hash: &str) -> AppResult<bool> {
    bcrypt::verify(password, hash)
        .map_err(|e| AppError::internal(format!("Failed to verify password: {e}")))
}
