// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Weekly, monthly, and yearly training summaries.
//!
//! A summary is always recomputed from the stored activities of its period
//! and written as a whole, replacing any earlier version.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::models::ActivityRecord;
use crate::time_utils::{self, rfc3339_secs};

/// Calendar period a summary covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    Week,
    Month,
    Year,
}

impl Period {
    /// Start of the period containing `date`.
    pub fn start_of(self, date: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            Period::Week => time_utils::week_start(date),
            Period::Month => time_utils::month_start(date),
            Period::Year => time_utils::year_start(date),
        }
    }

    /// Exclusive end of the period starting at `start`.
    pub fn end_of(self, start: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            Period::Week => start + Duration::days(7),
            Period::Month => time_utils::next_month_start(start),
            Period::Year => time_utils::next_year_start(start),
        }
    }

    /// Start of the period immediately before the one starting at `start`.
    pub fn previous(self, start: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            Period::Week => start - Duration::days(7),
            Period::Month => time_utils::previous_month_start(start),
            Period::Year => time_utils::previous_year_start(start),
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Period::Week => "weekly",
            Period::Month => "monthly",
            Period::Year => "yearly",
        })
    }
}

/// Aggregated totals for one period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodSummary {
    pub period: Period,
    /// Inclusive start of the period (document ID is its date)
    #[serde(with = "rfc3339_secs")]
    pub period_start: DateTime<Utc>,
    pub total_tss: f64,
    /// Seconds
    pub total_moving_time: u64,
    /// Meters
    pub total_distance: f64,
    /// Meters
    pub total_elevation_gain: f64,
    pub activity_count: u32,
    #[serde(with = "rfc3339_secs")]
    pub computed_at: DateTime<Utc>,
}

impl PeriodSummary {
    /// Sum every activity that starts inside `[period_start, end)`.
    ///
    /// Activities outside the window are ignored, so callers may pass a
    /// superset.
    pub fn from_activities(
        period: Period,
        period_start: DateTime<Utc>,
        activities: &[ActivityRecord],
        computed_at: DateTime<Utc>,
    ) -> Self {
        let end = period.end_of(period_start);
        let mut summary = Self {
            period,
            period_start,
            total_tss: 0.0,
            total_moving_time: 0,
            total_distance: 0.0,
            total_elevation_gain: 0.0,
            activity_count: 0,
            computed_at,
        };

        for activity in activities
            .iter()
            .filter(|a| a.start_date >= period_start && a.start_date < end)
        {
            summary.total_tss += activity.tss;
            summary.total_moving_time += u64::from(activity.moving_time);
            summary.total_distance += activity.distance;
            summary.total_elevation_gain += activity.total_elevation_gain;
            summary.activity_count += 1;
        }

        summary
    }

    /// Document key, e.g. `2025-06-09`.
    pub fn key(&self) -> String {
        self.period_start.format("%Y-%m-%d").to_string()
    }
}
