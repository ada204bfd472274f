// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use strava_importer::config::Config;
use strava_importer::db::{FirestoreDb, MemoryStore};
use strava_importer::error::AppError;
use strava_importer::models::{ActivityRecord, Token};
use strava_importer::routes::create_router;
use strava_importer::scheduler::Scheduler;
use strava_importer::services::{
    FtpService, Publisher, StateStore, StravaClient, StravaService, TokenCache,
};
use strava_importer::AppState;

/// Nothing listens here; requests fail fast with a connection error.
#[allow(dead_code)]
pub const UNREACHABLE_URL: &str = "http://127.0.0.1:9";

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

#[allow(dead_code)]
pub fn parse_time(s: &str) -> DateTime<Utc> {
    strava_importer::time_utils::parse_rfc3339_utc(s).expect("valid test timestamp")
}

/// Token that expires in six hours.
#[allow(dead_code)]
pub fn valid_token() -> Token {
    Token {
        access_token: "valid_access".to_string(),
        refresh_token: "valid_refresh".to_string(),
        expires_at: Utc::now() + Duration::hours(6),
        token_type: "Bearer".to_string(),
        athlete_id: 4242,
    }
}

/// Token inside the five minute expiry buffer.
#[allow(dead_code)]
pub fn expiring_token() -> Token {
    Token {
        access_token: "stale_access".to_string(),
        refresh_token: "stale_refresh".to_string(),
        expires_at: Utc::now() + Duration::minutes(2),
        token_type: "Bearer".to_string(),
        athlete_id: 4242,
    }
}

/// Strava client pointed at `base_url` for both the API and OAuth.
#[allow(dead_code)]
pub fn strava_client(base_url: &str) -> StravaClient {
    StravaClient::new(&Config::test_default())
        .expect("client")
        .with_base_urls(base_url, &format!("{}/oauth", base_url))
}

#[allow(dead_code)]
pub fn strava_service(store: Arc<MemoryStore>, base_url: &str) -> StravaService {
    StravaService::new(strava_client(base_url), Arc::new(TokenCache::new(store)))
}

/// Summary activity as Strava would return it.
#[allow(dead_code)]
pub fn activity_json(id: u64, start_date: &str, weighted_watts: f64) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "name": format!("Ride {}", id),
        "sport_type": "Ride",
        "distance": 30000.0,
        "moving_time": 3600,
        "elapsed_time": 3900,
        "total_elevation_gain": 350.0,
        "start_date": start_date,
        "average_speed": 8.3,
        "max_speed": 15.2,
        "calories": 900.0,
        "average_heartrate": 142.0,
        "max_heartrate": 171.0,
        "average_watts": 200.0,
        "max_watts": 640.0,
        "weighted_average_watts": weighted_watts,
        "kilojoules": 720.0
    })
}

/// Stored record with only the fields summaries care about filled in.
#[allow(dead_code)]
pub fn record(id: u64, start_date: DateTime<Utc>, tss: f64) -> ActivityRecord {
    ActivityRecord {
        id,
        name: format!("Ride {}", id),
        sport_type: "Ride".to_string(),
        distance: 20_000.0,
        moving_time: 3600,
        elapsed_time: 3700,
        total_elevation_gain: 100.0,
        start_date,
        average_speed: 5.5,
        max_speed: 12.0,
        calories: 600.0,
        average_heartrate: 0.0,
        max_heartrate: 0.0,
        average_watts: 0.0,
        max_watts: 0.0,
        weighted_average_watts: 0.0,
        kilojoules: 0.0,
        ftp: 250.0,
        normalized_power: 0.0,
        intensity_factor: 0.0,
        tss,
    }
}

/// Publisher that remembers what it was asked to post.
#[derive(Default)]
pub struct RecordingPublisher {
    posted: Mutex<Vec<u64>>,
    fail: AtomicBool,
}

#[allow(dead_code)]
impl RecordingPublisher {
    pub fn failing() -> Self {
        let publisher = Self::default();
        publisher.fail.store(true, Ordering::SeqCst);
        publisher
    }

    pub fn posted(&self) -> Vec<u64> {
        let mut ids = self.posted.lock().unwrap().clone();
        ids.sort_unstable();
        ids
    }

    /// Wait until `count` posts were attempted (publishing is detached).
    pub async fn wait_for(&self, count: usize) -> Vec<u64> {
        for _ in 0..100 {
            if self.posted.lock().unwrap().len() >= count {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        self.posted()
    }
}

#[async_trait]
impl Publisher for RecordingPublisher {
    async fn post_activity(&self, activity: &ActivityRecord) -> Result<(), AppError> {
        self.posted.lock().unwrap().push(activity.id);
        if self.fail.load(Ordering::SeqCst) {
            return Err(AppError::UpstreamUnavailable("publisher down".to_string()));
        }
        Ok(())
    }
}

/// Test app over a memory store, with Strava at `strava_url`.
#[allow(dead_code)]
pub fn create_test_app_with(store: Arc<MemoryStore>, strava_url: &str) -> (axum::Router, Arc<AppState>) {
    let config = Config::test_default();
    let strava = strava_service(store.clone(), strava_url);

    let state = Arc::new(AppState {
        config: config.clone(),
        store,
        strava,
        states: Arc::new(StateStore::new()),
        ftp: Arc::new(FtpService::from_records(Vec::new())),
        scheduler: Arc::new(Scheduler::new(config.job_timeout)),
    });

    (create_router(state.clone()), state)
}

/// Test app with an empty memory store and no reachable Strava.
#[allow(dead_code)]
pub fn create_test_app() -> (axum::Router, Arc<AppState>) {
    create_test_app_with(Arc::new(MemoryStore::new()), UNREACHABLE_URL)
}
