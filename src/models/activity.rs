// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Enriched activity model for storage and API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::time_utils::rfc3339_secs;

/// Stored activity record with training-load metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ActivityRecord {
    /// Strava activity ID (also used as document ID)
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub id: u64,
    /// Activity name/title
    pub name: String,
    /// Sport type (Ride, Run, VirtualRide, etc.)
    pub sport_type: String,
    /// Distance in meters
    pub distance: f64,
    /// Moving time in seconds
    pub moving_time: u32,
    /// Elapsed time in seconds
    pub elapsed_time: u32,
    /// Elevation gain in meters
    pub total_elevation_gain: f64,
    /// Start date/time
    #[serde(with = "rfc3339_secs")]
    #[cfg_attr(feature = "binding-generation", ts(type = "string"))]
    pub start_date: DateTime<Utc>,
    /// Meters per second
    pub average_speed: f64,
    pub max_speed: f64,
    pub calories: f64,
    pub average_heartrate: f64,
    pub max_heartrate: f64,
    pub average_watts: f64,
    pub max_watts: f64,
    pub weighted_average_watts: f64,
    pub kilojoules: f64,

    // ─── Computed ────────────────────────────────────────────────
    /// FTP in effect when the activity was imported
    pub ftp: f64,
    /// Normalized power (weighted average watts as reported by Strava)
    pub normalized_power: f64,
    pub intensity_factor: f64,
    /// Training Stress Score
    pub tss: f64,
}
