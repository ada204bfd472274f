// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! JSON API, dashboard and login gate tests.

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use strava_importer::db::{ActivityStore, MemoryStore};
use tower::ServiceExt;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

mod common;
use common::{
    activity_json, create_test_app, create_test_app_with, expiring_token, parse_time, record,
    valid_token,
};

async fn send(app: &Router, method: Method, uri: &str) -> axum::response::Response {
    app.clone()
        .oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn logged_in_app(strava_url: &str) -> (Router, Arc<MemoryStore>, Arc<strava_importer::AppState>) {
    let store = Arc::new(MemoryStore::with_token(valid_token()));
    let (app, state) = create_test_app_with(store.clone(), strava_url);
    (app, store, state)
}

#[tokio::test]
async fn test_health_is_public() {
    let (app, _) = create_test_app();

    let response = send(&app, Method::GET, "/health").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("x-content-type-options").unwrap(),
        "nosniff"
    );
    assert_eq!(body_json(response).await["status"], "ok");
}

#[tokio::test]
async fn test_login_page_echoes_error() {
    let (app, _) = create_test_app();

    let body = body_json(send(&app, Method::GET, "/login?error=invalid_state").await).await;
    assert_eq!(body["login_url"], "/auth/login");
    assert_eq!(body["error"], "invalid_state");
}

#[tokio::test]
async fn test_api_requires_login() {
    let (app, _) = create_test_app();

    for (method, uri) in [
        (Method::GET, "/api/v1/activities"),
        (Method::GET, "/api/v1/jobs"),
        (Method::POST, "/api/v1/jobs/data_import/run"),
    ] {
        let response = send(&app, method, uri).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{}", uri);
        assert_eq!(body_json(response).await["error"], "authentication_required");
    }
}

#[tokio::test]
async fn test_dashboard_redirects_when_logged_out() {
    let (app, _) = create_test_app();

    let response = send(&app, Method::GET, "/dashboard").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers().get(header::LOCATION).unwrap(), "/login");
}

#[tokio::test]
async fn test_dashboard_shows_latest_activity() {
    let (app, store, _) = logged_in_app(common::UNREACHABLE_URL);
    store
        .write_activity(&record(1, parse_time("2025-06-01T07:00:00Z"), 40.0))
        .await
        .unwrap();
    store
        .write_activity(&record(2, parse_time("2025-06-03T07:00:00Z"), 55.0))
        .await
        .unwrap();

    let body = body_json(send(&app, Method::GET, "/dashboard").await).await;
    assert_eq!(body["loading"], false);
    assert_eq!(body["activity"]["id"], 2);
    assert_eq!(body["activity"]["tss"], 55.0);
}

#[tokio::test]
async fn test_dashboard_empty_store() {
    let (app, _, _) = logged_in_app(common::UNREACHABLE_URL);

    let body = body_json(send(&app, Method::GET, "/dashboard").await).await;
    assert_eq!(body["loading"], false);
    assert!(body.get("activity").is_none());
}

#[tokio::test]
async fn test_dashboard_loading_during_store_outage() {
    let (app, store, _) = logged_in_app(common::UNREACHABLE_URL);
    // Warm the token cache so the gate does not need the store.
    send(&app, Method::GET, "/").await;
    store.fail_reads(true);

    let response = send(&app, Method::GET, "/dashboard").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["loading"], true);
    assert!(body["message"].is_string());
}

#[tokio::test]
async fn test_activities_listing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/athlete/activities"))
        .and(query_param("per_page", "5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            activity_json(11, "2025-06-02T07:00:00Z", 200.0),
            activity_json(12, "garbage", 200.0),
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let (app, _, _) = logged_in_app(&server.uri());
    let response = send(&app, Method::GET, "/api/v1/activities?per_page=5").await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["per_page"], 5);
    assert_eq!(body["activities"].as_array().unwrap().len(), 1);
    assert_eq!(body["activities"][0]["id"], 11);
}

#[tokio::test]
async fn test_activities_per_page_validation() {
    let (app, _, _) = logged_in_app(common::UNREACHABLE_URL);

    for uri in [
        "/api/v1/activities?per_page=0",
        "/api/v1/activities?per_page=201",
        "/api/v1/activities?per_page=lots",
    ] {
        let response = send(&app, Method::GET, uri).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{}", uri);
    }
}

#[tokio::test]
async fn test_activities_strava_outage() {
    let (app, _, _) = logged_in_app(common::UNREACHABLE_URL);

    let response = send(&app, Method::GET, "/api/v1/activities").await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body_json(response).await["error"], "upstream_unavailable");
}

#[tokio::test]
async fn test_activities_token_rejected_by_strava() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/athlete/activities"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "message": "Authorization Error"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (app, _, _) = logged_in_app(&server.uri());
    let response = send(&app, Method::GET, "/api/v1/activities").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["error"], "authentication_required");
}

#[tokio::test]
async fn test_forced_refresh() {
    let server = MockServer::start().await;
    let expires_at = (chrono::Utc::now() + chrono::Duration::hours(6)).timestamp();
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "forced",
            "refresh_token": "forced_r",
            "expires_at": expires_at
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (app, store, _) = logged_in_app(&server.uri());
    let response = send(&app, Method::POST, "/api/v1/auth/refresh").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["refreshed"], true);
    assert_eq!(store.stored_token().unwrap().access_token, "forced");
}

#[tokio::test]
async fn test_refresh_with_expiring_token() {
    let expires_at = (chrono::Utc::now() + chrono::Duration::hours(6)).timestamp();

    for uri in ["/api/v1/auth/refresh", "/auth/refresh"] {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "renewed",
                "refresh_token": "renewed_r",
                "expires_at": expires_at
            })))
            .expect(1)
            .mount(&server)
            .await;

        let store = Arc::new(MemoryStore::with_token(expiring_token()));
        let (app, _) = create_test_app_with(store.clone(), &server.uri());

        let response = send(&app, Method::POST, uri).await;
        assert_eq!(response.status(), StatusCode::OK, "{}", uri);
        let body = body_json(response).await;
        assert_eq!(body["refreshed"], true);
        assert!(body["expires_at"].is_string());

        let saved = store.stored_token().unwrap();
        assert_eq!(saved.access_token, "renewed");
        assert_eq!(saved.refresh_token, "renewed_r");
    }
}

#[tokio::test]
async fn test_refresh_without_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let (app, _) = create_test_app_with(Arc::new(MemoryStore::new()), &server.uri());
    for uri in ["/api/v1/auth/refresh", "/auth/refresh"] {
        let response = send(&app, Method::POST, uri).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{}", uri);
        assert_eq!(body_json(response).await["error"], "authentication_required");
    }
}

#[tokio::test]
async fn test_job_listing_and_trigger() {
    let (app, _, state) = logged_in_app(common::UNREACHABLE_URL);
    state
        .scheduler
        .register(
            "state_sweep",
            "0 */10 * * * *",
            Arc::new(strava_importer::scheduler::jobs::StateSweepTask {
                states: state.states.clone(),
            }),
        )
        .unwrap();

    let jobs = body_json(send(&app, Method::GET, "/api/v1/jobs").await).await;
    assert_eq!(jobs[0]["name"], "state_sweep");
    assert_eq!(jobs[0]["runs"], 0);

    let response = send(&app, Method::POST, "/api/v1/jobs/state_sweep/run").await;
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    assert_eq!(body_json(response).await["status"], "started");

    let response = send(&app, Method::POST, "/api/v1/jobs/nope/run").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_cors_preflight_localhost() {
    let (app, _) = create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method(Method::OPTIONS)
                .uri("/api/v1/activities")
                .header(header::ORIGIN, "http://localhost:5173")
                .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(
        response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .unwrap(),
        "http://localhost:5173"
    );
}
