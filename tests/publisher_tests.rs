// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! X publisher against a mock API.

use serde_json::json;
use strava_importer::config::Config;
use strava_importer::error::AppError;
use strava_importer::services::{Publisher, TwitterPublisher};
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

mod common;
use common::{parse_time, record};

fn publisher(server: &MockServer, token: Option<&str>) -> TwitterPublisher {
    let mut config = Config::test_default();
    config.twitter_access_token = token.map(str::to_string);
    TwitterPublisher::new(&config)
        .unwrap()
        .with_api_base(&server.uri())
}

#[tokio::test]
async fn test_posts_with_bearer_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/tweets"))
        .and(header("authorization", "Bearer x-token"))
        .and(body_string_contains("Ride 7"))
        .and(body_string_contains("TSS: 64"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "data": {"id": "1800000000000000000", "text": "..."}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let publisher = publisher(&server, Some("x-token"));
    assert!(publisher.is_enabled());

    let activity = record(7, parse_time("2025-06-09T07:00:00Z"), 64.2);
    publisher.post_activity(&activity).await.unwrap();
}

#[tokio::test]
async fn test_disabled_publisher_makes_no_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;

    let publisher = publisher(&server, None);
    assert!(!publisher.is_enabled());

    let activity = record(7, parse_time("2025-06-09T07:00:00Z"), 64.2);
    publisher.post_activity(&activity).await.unwrap();
}

#[tokio::test]
async fn test_rate_limited_post_is_transient() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/tweets"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;

    let activity = record(7, parse_time("2025-06-09T07:00:00Z"), 64.2);
    let err = publisher(&server, Some("x-token"))
        .post_activity(&activity)
        .await
        .unwrap_err();
    assert!(err.is_transient());
}

#[tokio::test]
async fn test_rejected_post() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/tweets"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({"detail": "duplicate"})))
        .mount(&server)
        .await;

    let activity = record(7, parse_time("2025-06-09T07:00:00Z"), 64.2);
    let err = publisher(&server, Some("x-token"))
        .post_activity(&activity)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Internal(_)));
}
