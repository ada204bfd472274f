// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! HTTP route handlers.

pub mod api;
pub mod auth;
pub mod dashboard;

use crate::middleware::{require_token, require_token_api};
use crate::AppState;
use axum::extract::{Query, State};
use axum::http::{header, Method};
use axum::response::Redirect;
use axum::{
    middleware,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct HealthResponse {
    pub status: String,
    pub build_id: String,
}

/// Health check response
async fn health_check() -> Json<HealthResponse> {
    let build_id = option_env!("BUILD_ID").unwrap_or("unknown").to_string();
    Json(HealthResponse {
        status: "ok".to_string(),
        build_id,
    })
}

/// Send the browser wherever it belongs.
async fn index(State(state): State<Arc<AppState>>) -> Redirect {
    if state.strava.tokens().has_valid_token().await {
        Redirect::to("/dashboard")
    } else {
        Redirect::to("/login")
    }
}

#[derive(Deserialize)]
pub struct LoginParams {
    #[serde(default)]
    error: Option<String>,
}

/// What the login page needs to render.
#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct LoginResponse {
    pub login_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

async fn login_page(Query(params): Query<LoginParams>) -> Json<LoginResponse> {
    Json(LoginResponse {
        login_url: "/auth/login".to_string(),
        error: params.error,
    })
}

/// Build the complete router with all routes.
pub fn create_router(state: Arc<AppState>) -> Router {
    // Browser front end runs on localhost during development
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::AllowOrigin::predicate(
            |origin: &axum::http::HeaderValue, _request_parts: &axum::http::request::Parts| {
                let origin_str = origin.to_str().unwrap_or("");
                origin_str.starts_with("http://localhost")
                    || origin_str.starts_with("http://127.0.0.1")
            },
        ))
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT]);

    // Public routes (no login required)
    let public_routes = Router::new()
        .route("/health", get(health_check))
        .route("/", get(index))
        .route("/login", get(login_page))
        .merge(auth::routes());

    // Browser routes: bounce to /login
    let browser_routes = dashboard::routes()
        .route_layer(middleware::from_fn_with_state(state.clone(), require_token));

    // JSON API: 401. Refresh is added after the gate so it stays reachable
    // with an expiring token.
    let api_routes = Router::new().nest(
        "/api/v1",
        api::routes()
            .route_layer(middleware::from_fn_with_state(
                state.clone(),
                require_token_api,
            ))
            .route("/auth/refresh", post(auth::refresh_token)),
    );

    Router::new()
        .merge(public_routes)
        .merge(browser_routes)
        .merge(api_routes)
        .layer(middleware::from_fn(
            crate::middleware::security::add_security_headers,
        ))
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .with_state(state)
}
