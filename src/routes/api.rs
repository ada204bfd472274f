// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! JSON API routes, mounted under `/api/v1`.
//! The login gate is applied in routes/mod.rs for these routes.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::config::MAX_PAGE_SIZE;
use crate::error::{AppError, Result};
use crate::models::ActivityRecord;
use crate::scheduler::JobStatus;
use crate::services::metrics::convert_activity;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/activities", get(get_activities))
        .route("/jobs", get(list_jobs))
        .route("/jobs/{name}/run", post(run_job))
}

// ─── Activities ──────────────────────────────────────────────

#[derive(Debug, Deserialize, Validate)]
pub struct ActivitiesQuery {
    #[serde(default = "default_per_page")]
    #[validate(range(min = 1, max = 200))]
    per_page: u32,
}

fn default_per_page() -> u32 {
    30
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ActivitiesResponse {
    pub activities: Vec<ActivityRecord>,
    pub per_page: u32,
    /// FTP used for the load metrics
    pub ftp: f64,
}

/// Most recent Strava activities with load metrics at today's FTP.
async fn get_activities(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ActivitiesQuery>,
) -> Result<Json<ActivitiesResponse>> {
    params
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;
    let per_page = params.per_page.min(MAX_PAGE_SIZE);

    let raw = state.strava.list_activities(None, per_page).await?;
    let ftp = state.ftp.current_ftp();

    let activities = raw
        .iter()
        .filter_map(|a| match convert_activity(a, ftp) {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::warn!(activity_id = a.id, error = %e, "Dropping activity from listing");
                None
            }
        })
        .collect();

    Ok(Json(ActivitiesResponse {
        activities,
        per_page,
        ftp,
    }))
}

// ─── Jobs ────────────────────────────────────────────────────

async fn list_jobs(State(state): State<Arc<AppState>>) -> Json<Vec<JobStatus>> {
    Json(state.scheduler.statuses())
}

#[derive(Serialize)]
pub struct RunJobResponse {
    pub job: String,
    pub status: &'static str,
}

/// Start a job in the background.
async fn run_job(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<(StatusCode, Json<RunJobResponse>)> {
    state.scheduler.trigger(&name)?;

    Ok((
        StatusCode::ACCEPTED,
        Json(RunJobResponse {
            job: name,
            status: "started",
        }),
    ))
}
