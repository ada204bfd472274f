// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Login gates.
//!
//! There is a single connected athlete, so "logged in" simply means a usable
//! Strava token is stored. Browser routes bounce to `/login`; API routes
//! answer 401 JSON.

use crate::error::AppError;
use crate::AppState;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use std::sync::Arc;

/// Redirect to `/login` unless a valid token is stored.
pub async fn require_token(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    if !state.strava.tokens().has_valid_token().await {
        tracing::debug!(path = %request.uri().path(), "Not logged in, redirecting");
        return Redirect::to("/login").into_response();
    }
    next.run(request).await
}

/// Reject with 401 JSON unless a valid token is stored.
pub async fn require_token_api(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    if !state.strava.tokens().has_valid_token().await {
        return AppError::AuthenticationRequired.into_response();
    }
    next.run(request).await
}
