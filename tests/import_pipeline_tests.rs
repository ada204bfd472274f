// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Import runs against a mock Strava and the in-memory store.

use chrono::{Duration, NaiveDate, Utc};
use serde_json::json;
use std::sync::Arc;
use strava_importer::config::Config;
use strava_importer::db::MemoryStore;
use strava_importer::error::AppError;
use strava_importer::services::ftp::FtpRecord;
use strava_importer::services::{FtpService, ImportPipeline, ImportReport, Publisher};
use strava_importer::time_utils::format_utc_rfc3339;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

mod common;
use common::{activity_json, strava_service, valid_token, RecordingPublisher};

fn ftp_250() -> Arc<FtpService> {
    Arc::new(FtpService::from_records(vec![FtpRecord {
        date: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
        ftp: 250.0,
    }]))
}

fn pipeline(
    store: Arc<MemoryStore>,
    strava_url: &str,
    publisher: Arc<dyn Publisher>,
) -> ImportPipeline {
    ImportPipeline::new(
        &Config::test_default(),
        strava_service(store.clone(), strava_url),
        store,
        ftp_250(),
        publisher,
    )
}

/// Ten activities: 1-8 a day or more old, 9-10 from the last half hour,
/// with activity 5 carrying an unparseable date.
fn ten_activities() -> serde_json::Value {
    let now = Utc::now();
    let activities: Vec<_> = (1..=10u64)
        .map(|id| {
            let start = if id >= 9 {
                now - Duration::minutes(30)
            } else {
                now - Duration::hours(24 + id as i64)
            };
            let date = if id == 5 {
                "not a date".to_string()
            } else {
                format_utc_rfc3339(start)
            };
            activity_json(id, &date, 220.0)
        })
        .collect();
    json!(activities)
}

async fn mock_strava(body: serde_json::Value) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/athlete/activities"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(&server)
        .await;
    server
}

#[tokio::test]
async fn test_bad_date_skips_only_that_activity() {
    let server = mock_strava(ten_activities()).await;
    let store = Arc::new(MemoryStore::with_token(valid_token()));
    let publisher = Arc::new(RecordingPublisher::default());

    let report = pipeline(store.clone(), &server.uri(), publisher.clone())
        .run(Utc::now())
        .await
        .unwrap()
        .expect("token present, import ran");

    assert_eq!(
        report,
        ImportReport {
            fetched: 10,
            persisted: 9,
            skipped: 1,
            failed: 0,
            published: 2,
        }
    );

    let stored = store.activities();
    assert_eq!(stored.len(), 9);
    assert!(stored.iter().all(|a| a.id != 5));

    assert_eq!(publisher.wait_for(2).await, vec![9, 10]);
}

#[tokio::test]
async fn test_records_carry_training_load() {
    let server = mock_strava(ten_activities()).await;
    let store = Arc::new(MemoryStore::with_token(valid_token()));

    pipeline(store.clone(), &server.uri(), Arc::new(RecordingPublisher::default()))
        .run(Utc::now())
        .await
        .unwrap();

    let first = store
        .activities()
        .into_iter()
        .find(|a| a.id == 1)
        .unwrap();
    assert_eq!(first.ftp, 250.0);
    assert_eq!(first.normalized_power, 220.0);
    assert!((first.intensity_factor - 0.88).abs() < 1e-9);
    assert!((first.tss - 77.44).abs() < 1e-9);
}

#[tokio::test]
async fn test_write_failure_does_not_abort_batch() {
    let server = mock_strava(ten_activities()).await;
    let store = Arc::new(MemoryStore::with_token(valid_token()));
    store.fail_activity(3);

    let report = pipeline(store.clone(), &server.uri(), Arc::new(RecordingPublisher::default()))
        .run(Utc::now())
        .await
        .unwrap()
        .unwrap();

    assert_eq!(report.failed, 1);
    assert_eq!(report.persisted, 8);
    assert_eq!(store.activities().len(), 8);
}

#[tokio::test]
async fn test_publisher_failure_is_tolerated() {
    let server = mock_strava(ten_activities()).await;
    let store = Arc::new(MemoryStore::with_token(valid_token()));
    let publisher = Arc::new(RecordingPublisher::failing());

    let report = pipeline(store.clone(), &server.uri(), publisher.clone())
        .run(Utc::now())
        .await
        .unwrap()
        .unwrap();

    assert_eq!(report.persisted, 9);
    assert_eq!(publisher.wait_for(2).await.len(), 2);
}

#[tokio::test]
async fn test_rerun_overwrites_instead_of_duplicating() {
    let server = mock_strava(ten_activities()).await;
    let store = Arc::new(MemoryStore::with_token(valid_token()));
    let pipeline = pipeline(store.clone(), &server.uri(), Arc::new(RecordingPublisher::default()));

    pipeline.run(Utc::now()).await.unwrap();
    pipeline.run(Utc::now()).await.unwrap();

    assert_eq!(store.activities().len(), 9);
    assert_eq!(store.activity_writes(), 18);
}

#[tokio::test]
async fn test_no_token_skips_import() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/athlete/activities"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&server)
        .await;

    let store = Arc::new(MemoryStore::new());
    let result = pipeline(store, &server.uri(), Arc::new(RecordingPublisher::default()))
        .run(Utc::now())
        .await
        .unwrap();

    assert!(result.is_none());
}

#[tokio::test]
async fn test_upstream_outage_fails_run() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/athlete/activities"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;

    let store = Arc::new(MemoryStore::with_token(valid_token()));
    let err = pipeline(store.clone(), &server.uri(), Arc::new(RecordingPublisher::default()))
        .run(Utc::now())
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::UpstreamUnavailable(_)));
    assert!(store.activities().is_empty());
}

#[tokio::test]
async fn test_zero_ftp_gives_zero_load() {
    let server = mock_strava(ten_activities()).await;
    let store = Arc::new(MemoryStore::with_token(valid_token()));

    let pipeline = ImportPipeline::new(
        &Config::test_default(),
        strava_service(store.clone(), &server.uri()),
        store.clone(),
        Arc::new(FtpService::from_records(Vec::new())),
        Arc::new(RecordingPublisher::default()),
    );
    pipeline.run(Utc::now()).await.unwrap();

    assert!(store
        .activities()
        .iter()
        .all(|a| a.tss == 0.0 && a.intensity_factor == 0.0));
}
