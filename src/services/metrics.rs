// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Training-load math and conversion of Strava activities to stored records.

use crate::error::AppError;
use crate::models::ActivityRecord;
use crate::services::strava::StravaActivity;
use crate::time_utils::parse_rfc3339_utc;

/// Power-based load metrics for one activity.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TrainingLoad {
    pub normalized_power: f64,
    pub intensity_factor: f64,
    pub tss: f64,
}

/// Compute NP, IF and TSS.
///
/// Strava's weighted average watts stands in for normalized power. Without a
/// positive FTP and positive weighted power every metric is zero.
pub fn training_load(weighted_average_watts: f64, ftp: f64, moving_time_secs: u32) -> TrainingLoad {
    if ftp <= 0.0 || weighted_average_watts <= 0.0 {
        return TrainingLoad::default();
    }

    let np = weighted_average_watts;
    let intensity_factor = np / ftp;
    let tss = (f64::from(moving_time_secs) * np * intensity_factor) / (ftp * 3600.0) * 100.0;

    TrainingLoad {
        normalized_power: np,
        intensity_factor,
        tss,
    }
}

/// Build the stored record for `activity` using `ftp`.
pub fn convert_activity(activity: &StravaActivity, ftp: f64) -> Result<ActivityRecord, AppError> {
    let start_date = parse_rfc3339_utc(&activity.start_date).map_err(|e| {
        AppError::Conversion(format!(
            "activity {}: bad start_date '{}': {}",
            activity.id, activity.start_date, e
        ))
    })?;

    let load = training_load(activity.weighted_average_watts, ftp, activity.moving_time);

    Ok(ActivityRecord {
        id: activity.id,
        name: activity.name.clone(),
        sport_type: activity.sport_type.clone(),
        distance: activity.distance,
        moving_time: activity.moving_time,
        elapsed_time: activity.elapsed_time,
        total_elevation_gain: activity.total_elevation_gain,
        start_date,
        average_speed: activity.average_speed,
        max_speed: activity.max_speed,
        calories: activity.calories,
        average_heartrate: activity.average_heartrate,
        max_heartrate: activity.max_heartrate,
        average_watts: activity.average_watts,
        max_watts: activity.max_watts,
        weighted_average_watts: activity.weighted_average_watts,
        kilojoules: activity.kilojoules,
        ftp,
        normalized_power: load.normalized_power,
        intensity_factor: load.intensity_factor,
        tss: load.tss,
    })
}
