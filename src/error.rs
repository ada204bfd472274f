// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with consistent API responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// No token, or the stored token can no longer be used. The user has to
    /// go through the Strava login again; this is not a system fault.
    #[error("Authentication required")]
    AuthenticationRequired,

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Strava (or another upstream HTTP API) could not be reached, timed out,
    /// or answered with a rate limit / server error. Retried on the next tick.
    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    /// Strava answered, but with a non-retryable error.
    #[error("Strava API error: {0}")]
    StravaApi(String),

    /// The durable store rejected or timed out a read/write.
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// A single upstream record could not be converted.
    #[error("Conversion error: {0}")]
    Conversion(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Error message for Strava rate limiting.
    pub const STRAVA_RATE_LIMIT: &'static str = "Rate limit exceeded";

    /// True if Strava rejected the token we sent (401 or `invalid_grant`).
    pub fn is_strava_token_error(&self) -> bool {
        match self {
            AppError::AuthenticationRequired => true,
            AppError::StravaApi(msg) => {
                msg.contains("invalid_grant")
                    || msg.contains("Unauthorized")
            }
            _ => false,
        }
    }

    /// True for failures that are expected to go away on their own and are
    /// retried by the next scheduled run.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            AppError::UpstreamUnavailable(_) | AppError::Persistence(_)
        )
    }
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, details) = match &self {
            AppError::AuthenticationRequired => {
                (StatusCode::UNAUTHORIZED, "authentication_required", None)
            }
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", Some(msg.clone())),
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, "bad_request", Some(msg.clone()))
            }
            AppError::UpstreamUnavailable(msg) => {
                tracing::warn!(error = %msg, "Upstream unavailable");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "upstream_unavailable",
                    Some(msg.clone()),
                )
            }
            AppError::StravaApi(msg) => {
                (StatusCode::BAD_GATEWAY, "strava_error", Some(msg.clone()))
            }
            AppError::Persistence(msg) => {
                tracing::error!(error = %msg, "Persistence error");
                (StatusCode::SERVICE_UNAVAILABLE, "persistence_error", None)
            }
            AppError::Conversion(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "conversion_error",
                Some(msg.clone()),
            ),
            AppError::Configuration(msg) => {
                tracing::error!(error = %msg, "Configuration error");
                (StatusCode::INTERNAL_SERVER_ERROR, "configuration_error", None)
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", None)
            }
        };

        let body = ErrorResponse {
            error: error.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;
