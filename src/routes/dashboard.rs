// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Dashboard payload (latest imported activity).

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::models::ActivityRecord;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/dashboard", get(dashboard))
}

#[derive(Debug, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct DashboardResponse {
    /// True while the data can't be shown yet; the page should retry.
    pub loading: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub activity: Option<ActivityRecord>,
}

/// Latest activity. A store outage shows as loading, not as an error.
async fn dashboard(State(state): State<Arc<AppState>>) -> Json<DashboardResponse> {
    let response = match state.store.latest_activity().await {
        Ok(Some(activity)) => DashboardResponse {
            loading: false,
            message: None,
            activity: Some(activity),
        },
        Ok(None) => DashboardResponse {
            loading: false,
            message: Some("No activities imported yet".to_string()),
            activity: None,
        },
        Err(e) => {
            tracing::warn!(error = %e, "Latest activity unavailable");
            DashboardResponse {
                loading: true,
                message: Some("Data is loading, please retry shortly".to_string()),
                activity: None,
            }
        }
    };

    Json(response)
}
