// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Strava OAuth authentication routes.

use axum::{
    extract::{Query, State},
    response::Redirect,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::{AppError, Result};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/login", get(auth_start))
        .route("/auth/callback", get(auth_callback))
        .route("/auth/logout", post(logout))
        .route("/auth/refresh", post(refresh_token))
}

fn login_with_error(error: &str) -> Redirect {
    Redirect::to(&format!("/login?error={}", urlencoding::encode(error)))
}

/// Start OAuth flow - redirect to Strava authorization.
async fn auth_start(State(state): State<Arc<AppState>>) -> Result<Redirect> {
    let oauth_state = state.states.generate_and_store()?;
    let auth_url = state.strava.authorize_url(&oauth_state);

    tracing::info!(
        client_id = %state.config.strava_client_id,
        "Starting OAuth flow, redirecting to Strava"
    );
    Ok(Redirect::temporary(&auth_url))
}

#[derive(Deserialize)]
pub struct CallbackParams {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// OAuth callback - check state, exchange code, store token.
async fn auth_callback(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CallbackParams>,
) -> Redirect {
    // User declined, or Strava reported a problem
    if let Some(error) = params.error {
        tracing::warn!(error = %error, "OAuth error from Strava");
        return login_with_error(&error);
    }

    let state_ok = params
        .state
        .as_deref()
        .is_some_and(|s| state.states.validate_and_remove(s));
    if !state_ok {
        tracing::warn!("OAuth callback with unknown or expired state");
        return login_with_error("invalid_state");
    }

    let Some(code) = params.code.filter(|c| !c.is_empty()) else {
        tracing::warn!("OAuth callback without code");
        return login_with_error("missing_code");
    };

    tracing::info!("Exchanging authorization code for token");
    if let Err(e) = state.strava.exchange_code(&code).await {
        tracing::error!(error = %e, "OAuth token exchange failed");
        return login_with_error("exchange_failed");
    }

    // A new login is a good moment to pick up FTP edits.
    state.ftp.reload_or_warn();

    Redirect::to("/dashboard")
}

/// Forget the stored token.
async fn logout(State(state): State<Arc<AppState>>) -> Result<Redirect> {
    state.strava.logout().await?;
    Ok(Redirect::to("/login"))
}

#[derive(Serialize)]
pub struct RefreshResponse {
    pub refreshed: bool,
    pub expires_at: DateTime<Utc>,
}

/// Force a token refresh now.
///
/// Not behind the login gate: an expiring token is exactly what this is for.
/// Only a missing (or rejected) token answers 401.
pub async fn refresh_token(State(state): State<Arc<AppState>>) -> Result<Json<RefreshResponse>> {
    let token = state
        .strava
        .refresh()
        .await?
        .ok_or(AppError::AuthenticationRequired)?;

    Ok(Json(RefreshResponse {
        refreshed: true,
        expires_at: token.expires_at,
    }))
}
