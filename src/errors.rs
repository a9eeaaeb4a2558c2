// ABOUTME: Unified error handling with standard error codes and HTTP response mapping
// ABOUTME: Defines AppError, ErrorCode, and the JSON error body returned by all routes
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Colloquy Contributors

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result alias used throughout the application
pub type AppResult<T> = Result<T, AppError>;

/// Standard error codes used throughout the application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    // Authentication & Authorization
    #[serde(rename = "AUTH_REQUIRED")]
    AuthRequired,
    #[serde(rename = "AUTH_INVALID")]
    AuthInvalid,

    // Validation
    #[serde(rename = "INVALID_INPUT")]
    InvalidInput,
    #[serde(rename = "MISSING_REQUIRED_FIELD")]
    MissingRequiredField,

    // Resource management
    #[serde(rename = "RESOURCE_NOT_FOUND")]
    ResourceNotFound,
    #[serde(rename = "RESOURCE_ALREADY_EXISTS")]
    ResourceAlreadyExists,

    // External services
    #[serde(rename = "EXTERNAL_SERVICE_ERROR")]
    ExternalServiceError,

    // Configuration
    #[serde(rename = "CONFIG_ERROR")]
    ConfigError,

    // Internal errors
    #[serde(rename = "INTERNAL_ERROR")]
    InternalError,
    #[serde(rename = "DATABASE_ERROR")]
    DatabaseError,
    #[serde(rename = "SERIALIZATION_ERROR")]
    SerializationError,
}

impl ErrorCode {
    /// Get the HTTP status code for this error
    #[must_use]
    pub const fn http_status(&self) -> StatusCode {
        match self {
            Self::InvalidInput | Self::MissingRequiredField => StatusCode::BAD_REQUEST,
            Self::AuthRequired | Self::AuthInvalid => StatusCode::UNAUTHORIZED,
            Self::ResourceNotFound => StatusCode::NOT_FOUND,
            Self::ResourceAlreadyExists => StatusCode::CONFLICT,
            Self::ExternalServiceError => StatusCode::BAD_GATEWAY,
            Self::ConfigError
            | Self::InternalError
            | Self::DatabaseError
            | Self::SerializationError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Unified error type for the application
#[derive(Debug, Error)]
#[error("{message}")]
pub struct AppError {
    /// Error code
    pub code: ErrorCode,
    /// Human-readable error message
    pub message: String,
    /// Source error for error chaining
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl AppError {
    /// Create a new `AppError` with the given code and message
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            source: None,
        }
    }

    /// Add a source error for error chaining
    #[must_use]
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Authentication missing or rejected (401)
    pub fn auth_required(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::AuthRequired, message)
    }

    /// Credentials present but invalid (401)
    pub fn auth_invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::AuthInvalid, message)
    }

    /// Request payload failed validation (400)
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidInput, message)
    }

    /// Resource does not exist for this caller (404)
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ResourceNotFound, message)
    }

    /// Resource identifier already taken (409)
    pub fn already_exists(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ResourceAlreadyExists, message)
    }

    /// Upstream provider call failed (502)
    pub fn external_service(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ExternalServiceError, message)
    }

    /// Configuration problem detected at startup (500)
    pub fn config(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ConfigError, message)
    }

    /// Unexpected internal failure (500)
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    /// Database operation failed (500)
    pub fn database(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::DatabaseError, message)
    }

    /// Serialization or deserialization failed (500)
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::SerializationError, message)
    }

    /// Get the HTTP status code for this error
    #[must_use]
    pub const fn http_status(&self) -> StatusCode {
        self.code.http_status()
    }
}

/// JSON body returned for error responses
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error details
    pub error: ErrorDetail,
}

/// Error details within an error response
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// Error code
    pub code: ErrorCode,
    /// Human-readable error message
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.http_status();
        if status.is_server_error() {
            tracing::error!(code = ?self.code, "{}", self.message);
        }
        let body = ErrorResponse {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_codes_map_to_expected_statuses() {
        assert_eq!(
            ErrorCode::AuthRequired.http_status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ErrorCode::ResourceNotFound.http_status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ErrorCode::ResourceAlreadyExists.http_status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ErrorCode::ExternalServiceError.http_status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            ErrorCode::DatabaseError.http_status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn constructors_set_code_and_message() {
        let err = AppError::not_found("Conversation not found");
        assert_eq!(err.code, ErrorCode::ResourceNotFound);
        assert_eq!(err.to_string(), "Conversation not found");
    }
}
